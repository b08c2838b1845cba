use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unrecognized log level {0:?}")]
    InvalidLevel(String),
    #[error("unrecognized log format {0:?} (expected: logfmt|json)")]
    InvalidFormat(String),
    #[error("Logger has been already initialized")]
    AlreadyInitialized,
    #[error("Failed to reconfigure logger: {0}")]
    ReloadFailed(String),
}
