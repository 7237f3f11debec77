use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::question::Difficulty;

/// User preferences; any field missing from the file takes its default
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub question_count: usize,
    pub practice_secs: u32,
    pub diagnostic_secs: u32,
    pub scheduled_minutes: u32,
    pub history_limit: usize,
    pub default_difficulty: Difficulty,
    /// Fill topics the bank has no questions for with generic ones
    pub allow_generic: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            question_count: 5,
            practice_secs: 300,
            diagnostic_secs: 1800,
            scheduled_minutes: 30,
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_difficulty: Difficulty::Intermediate,
            allow_generic: false,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("edututor_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        let cfg = store.load();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.question_count, 5);
        assert_eq!(cfg.practice_secs, 300);
        assert_eq!(cfg.diagnostic_secs, 1800);
        assert_eq!(cfg.scheduled_minutes, 30);
        assert_eq!(cfg.history_limit, 50);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            question_count: 3,
            practice_secs: 120,
            diagnostic_secs: 900,
            scheduled_minutes: 15,
            history_limit: 10,
            default_difficulty: Difficulty::Advanced,
            allow_generic: true,
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"question_count": 8, "default_difficulty": "basic"}"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.question_count, 8);
        assert_eq!(cfg.default_difficulty, Difficulty::Beginner);
        assert_eq!(cfg.practice_secs, 300);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }
}
