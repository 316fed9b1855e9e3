//! Shared building blocks for the user benchmark: the user record model and
//! generator, backend clients, the chunked bulk loader and the paginated scans.

use log::{LevelFilter, SetLoggerError};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::{pattern::PatternEncoder, Encode},
    filter::threshold::ThresholdFilter,
};
use std::{backtrace, env};
use thiserror::Error;

pub mod backends;
pub mod config;
pub mod constants;
pub mod generate;
pub mod loader;
pub mod scan;
pub mod types;

/// Pattern encoder that appends a backtrace to error records when
/// `RUST_BACKTRACE` is set to anything but `0`.
#[derive(Debug)]
struct ErrorBacktraceEncoder {
    inner: PatternEncoder,
    with_backtrace: bool,
}

impl ErrorBacktraceEncoder {
    fn new(pattern: &str) -> Self {
        Self {
            inner: PatternEncoder::new(pattern),
            with_backtrace: env::var_os("RUST_BACKTRACE").is_some_and(|value| value != "0"),
        }
    }
}

impl Encode for ErrorBacktraceEncoder {
    fn encode(
        &self,
        w: &mut dyn log4rs::encode::Write,
        record: &log::Record<'_>,
    ) -> anyhow::Result<()> {
        if record.level() != log::Level::Error || !self.with_backtrace {
            return self.inner.encode(w, record);
        }

        let trace = backtrace::Backtrace::force_capture();
        self.inner.encode(
            w,
            &log::Record::builder()
                .args(format_args!("{}\n{}", record.args(), trace))
                .level(record.level())
                .target(record.target())
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .build(),
        )
    }
}

/// Errors raised while installing the global logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to open log file: {0}")]
    File(#[source] std::io::Error),
    #[error("invalid logger configuration: {0}")]
    Config(String),
    #[error("failed to install logger: {0}")]
    Install(#[from] SetLoggerError),
}

/// Installs the process-wide log4rs logger.
///
/// Records at `log_level` and above go to stderr. When `file_path` is given,
/// the same records are also appended to that file.
pub fn initialize_logger(
    log_level: LevelFilter,
    file_path: Option<&str>,
) -> Result<(), LoggerError> {
    const LOGGING_PATTERN: &str = "{d} {l} {f}:{L} - {m}\n";

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(ErrorBacktraceEncoder::new(LOGGING_PATTERN)))
        .build();

    let mut config_builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(log_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root_builder = Root::builder().appender("stderr");

    if let Some(path) = file_path {
        // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
        let logfile = FileAppender::builder()
            .encoder(Box::new(ErrorBacktraceEncoder::new(LOGGING_PATTERN)))
            .build(path)
            .map_err(LoggerError::File)?;

        config_builder =
            config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root_builder = root_builder.appender("logfile");
    }

    let config = config_builder
        .build(root_builder.build(log_level))
        .map_err(|err| LoggerError::Config(err.to_string()))?;

    let _handle = log4rs::init_config(config)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::LoggerError;
    use std::error::Error;
    use std::io;

    #[test]
    fn logger_errors_describe_the_failed_step() {
        let err = LoggerError::Config("appender \"logfile\" is undefined".to_string());
        assert_eq!(
            err.to_string(),
            "invalid logger configuration: appender \"logfile\" is undefined"
        );

        let err = LoggerError::File(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(err.to_string(), "failed to open log file: denied");
        assert!(err.source().is_some());
    }
}
