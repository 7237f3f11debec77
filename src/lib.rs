// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod attempt;
pub mod bank;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod history;
pub mod logging;
pub mod ports;
pub mod question;
pub mod report;
pub mod runtime;
pub mod schedule;
pub mod scorer;
pub mod session;
pub mod store;
