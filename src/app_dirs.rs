use directories::ProjectDirs;
use std::path::PathBuf;

/// Overrides every directory below; used by tests and portable installs
pub const HOME_ENV: &str = "EDUTUTOR_HOME";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("edututor.db"))
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Some(home) = Self::home_override() {
            return Some(home.join("config.json"));
        }
        ProjectDirs::from("", "", "edututor").map(|pd| pd.config_dir().join("config.json"))
    }

    pub fn log_dir() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("logs"))
    }

    fn data_dir() -> Option<PathBuf> {
        if let Some(home) = Self::home_override() {
            Some(home)
        } else if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("edututor"),
            )
        } else {
            ProjectDirs::from("", "", "edututor").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    fn home_override() -> Option<PathBuf> {
        std::env::var_os(HOME_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}
