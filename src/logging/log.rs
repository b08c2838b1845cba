use std::io;
use std::sync::{Mutex, PoisonError};

use tracing::Dispatch;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::{reload, Layer, Registry};

use super::config::LoggerConfig;
use super::error::LoggerError;
use super::format::{LogFormat, LogLevel};

type Filtered = Layered<reload::Layer<Targets, Registry>, Registry>;

// Level changes are announced under this target, which the level filter never applies to.
const LEVEL_TARGET: &str = "expfmt::level";

fn targets(level: Option<LogLevel>) -> Targets {
    Targets::new()
        .with_target(LEVEL_TARGET, LevelFilter::INFO)
        .with_default(LogLevel::filter(level))
}

/// A leveled logger whose minimum level can be changed while it is in use.
#[derive(Debug)]
pub struct Logger {
    filter: reload::Handle<Targets, Registry>,
    current: Mutex<Option<LogLevel>>,
}

impl Logger {
    /// Builds a logger that writes to `writer`. The returned dispatch still has to be installed, globally
    /// or for a scope.
    pub fn with_writer<W>(cfg: &LoggerConfig, writer: W) -> (Logger, Dispatch)
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let (filter, handle) = reload::Layer::new(targets(cfg.level));

        let output: Box<dyn Layer<Filtered> + Send + Sync> = match cfg.format {
            LogFormat::Json => Box::new(fmt::layer().json().with_writer(writer)),
            LogFormat::Logfmt => Box::new(fmt::layer().with_ansi(cfg.color).with_writer(writer)),
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(output);
        let logger = Logger {
            filter: handle,
            current: Mutex::new(cfg.level),
        };

        (logger, Dispatch::new(subscriber))
    }

    pub fn level(&self) -> Option<LogLevel> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Changes the minimum level. `None` turns filtering off. A change between two levels is always logged,
    /// whatever either level is.
    pub fn set_level(&self, level: Option<LogLevel>) -> Result<(), LoggerError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        self.filter
            .reload(targets(level))
            .map_err(|e| LoggerError::ReloadFailed(e.to_string()))?;
        let prev = std::mem::replace(&mut *current, level);

        if let (Some(prev), Some(next)) = (prev, level) {
            if prev != next {
                tracing::info!(
                    target: LEVEL_TARGET,
                    prev = %prev,
                    current = %next,
                    "Log level changed"
                );
            }
        }

        Ok(())
    }
}

/// Installs a logger writing to stderr as the global default.
pub fn logger_init(cfg: &LoggerConfig) -> Result<Logger, LoggerError> {
    let (logger, dispatch) = Logger::with_writer(cfg, io::stderr);
    tracing::dispatcher::set_global_default(dispatch).map_err(|_| LoggerError::AlreadyInitialized)?;
    Ok(logger)
}
