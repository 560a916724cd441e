//! Logging bootstrap shared by the rule store tools
//!
//! Console output always uses the bracketed format `timestamp [LEVEL] message`.
//! An optional daily-rolling file layer can be added through [`LogConfig::log_dir`].

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path:?}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2026-10-18T00:50:44.809Z [INFO] Rule inserted`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Keeps the non-blocking file writer alive for the life of the process
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service or tool name, used as the file prefix and debug target
    pub service_name: String,
    /// Default level when `RUST_LOG` is not set
    pub level: Level,
    /// Write a daily-rolling file into this directory as well as the console
    pub log_dir: Option<PathBuf>,
    /// JSON lines in the log file instead of the bracketed format
    pub enable_json: bool,
    /// ANSI colors on the console
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "rulectl".to_string(),
            level: Level::INFO,
            log_dir: None,
            enable_json: false,
            ansi: true,
        }
    }
}

/// Build the env filter: `RUST_LOG` wins, otherwise `{level},{service}=debug` when
/// the level is below debug so the tool's own targets stay visible.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(env_str) = std::env::var("RUST_LOG") {
        return EnvFilter::try_new(&env_str).map_err(|_| LoggingError::InvalidFilter(env_str));
    }

    let level = config.level.as_str().to_lowercase();
    let target = config.service_name.replace('-', "_");
    let filter_str = if config.level < Level::DEBUG {
        format!("{},{}=debug", level, target)
    } else {
        level
    };

    EnvFilter::try_new(&filter_str).map_err(|_| LoggingError::InvalidFilter(filter_str))
}

/// Initialize logging system with configuration
pub fn init_with_config(config: LogConfig) -> Result<(), LoggingError> {
    let env_filter = build_filter(&config)?;

    let console_layer = fmt::layer()
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .event_format(BracketedLevelFormat)
        .boxed();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|source| LoggingError::LogDir {
                path: dir.clone(),
                source,
            })?;

            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
            match guards.lock() {
                Ok(mut guards) => guards.push(guard),
                Err(poisoned) => {
                    eprintln!("Warning: GUARDS lock was poisoned, recovering...");
                    poisoned.into_inner().push(guard);
                },
            }

            let layer = if config.enable_json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_level(true)
                    .with_target(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .boxed()
            };
            Some(layer)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!("Logging: {} @ {:?}", config.service_name, config.log_dir);
    Ok(())
}

/// Console-only init at the given level (`"info"`, `"debug"`, ...)
pub fn init(level: &str) -> Result<(), LoggingError> {
    let config = LogConfig {
        level: level.parse().unwrap_or(Level::INFO),
        ..Default::default()
    };
    init_with_config(config)
}
