use std::io;

use anyhow::Result;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use super::config::{LogConfig, LogFormat, RotationPolicy};

const LOG_FILE_NAME: &str = "remedy.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logger implementation using tracing
///
/// Keep the value alive for the life of the process; dropping it flushes and
/// stops the file writer.
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber.
    ///
    /// Stderr always receives logs in the configured format so stdout stays
    /// free for command output. When `log_dir` is set, a rolling JSON file is
    /// written as well.
    ///
    /// # Errors
    /// Returns an error for an unknown level or if a global subscriber is
    /// already installed.
    pub fn init(config: &LogConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let filter = || {
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy()
        };

        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
        layers.push(match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_target(true)
                .with_filter(filter())
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(filter())
                .boxed(),
        });

        let guard = config.log_dir.as_ref().map(|log_dir| {
            let appender = match config.rotation {
                RotationPolicy::Daily => rolling::daily(log_dir, LOG_FILE_NAME),
                RotationPolicy::Hourly => rolling::hourly(log_dir, LOG_FILE_NAME),
                RotationPolicy::Never => rolling::never(log_dir, LOG_FILE_NAME),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);

            // File output is always JSON for structured post-processing.
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(filter())
                    .boxed(),
            );
            guard
        });

        tracing_subscriber::registry().with(layers).try_init()?;

        tracing::debug!(
            level = %config.level,
            format = ?config.format,
            file_output = config.log_dir.is_some(),
            "logger initialized"
        );

        Ok(Self { _guard: guard })
    }
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));
        assert!(matches!(parse_log_level("WARN"), Ok(Level::WARN)));
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_logger_init_with_file_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LogConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
            log_dir: Some(dir.path().to_path_buf()),
            rotation: RotationPolicy::Never,
        };

        // Only one global subscriber per process; this is the only test that
        // installs one.
        let logger = LoggerImpl::init(&config).unwrap();
        tracing::info!("hello from the logger test");
        drop(logger);

        assert!(dir.path().join(LOG_FILE_NAME).exists());
    }
}
