//! The leveled logger used by the `expfmt` binary. The codec itself never logs.

mod config;
mod error;
mod format;
mod log;


pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::{LogFormat, LogLevel};
pub use log::{logger_init, Logger};
