use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app_dirs::AppDirs;

/// Filter directives, e.g. `EDUTUTOR_LOG=edututor=debug`
pub const LOG_ENV: &str = "EDUTUTOR_LOG";
const DEFAULT_FILTER: &str = "info";

/// Route tracing output to a daily log file; the terminal belongs to the UI.
///
/// Keep the returned guard alive for the life of the program so buffered
/// lines are flushed. `None` means there was no place to write logs.
pub fn init() -> Option<WorkerGuard> {
    let dir = AppDirs::log_dir()?;
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("edututor: logging disabled, cannot create {}: {e}", dir.display());
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&dir, "edututor.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // a second init in the same process keeps the first subscriber
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        return None;
    }
    Some(guard)
}
