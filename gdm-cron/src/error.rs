use thiserror::Error;

/// Errors that may occur when driving the cron runtime.
#[derive(Debug, Error, PartialEq)]
pub enum CronError {
    #[error("cron runtime is already running")]
    AlreadyRunning,
    #[error("cron interval must be greater than zero")]
    InvalidInterval,
}
