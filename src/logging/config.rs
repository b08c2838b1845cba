use serde::Deserialize;

use super::format::{LogFormat, LogLevel};

/// No `level` means nothing is filtered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    pub color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Logfmt,
            color: true,
        }
    }
}
