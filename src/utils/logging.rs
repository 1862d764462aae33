use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Directory receiving the rotating log files
pub const LOG_DIRECTORY: &str = "logs";

const LOG_FILE_PREFIX: &str = "agentdeck.log";

/// Initialize the logging system with the specified log level.
///
/// Console logs go to stderr so they never interleave with a task's streamed
/// output on stdout.
///
/// # Arguments
///
/// * `log_level` - An `EnvFilter` directive such as "info" or "agentdeck=debug"
/// * `with_file` - Whether to also log to a daily rotating file under `logs/`
pub fn init_logging(log_level: &str, with_file: bool) {
    let filter = match EnvFilter::try_new(log_level) {
        Ok(f) => f,
        Err(_) => {
            eprintln!("Invalid log level '{}', defaulting to 'warn'", log_level);
            EnvFilter::new("warn")
        }
    };

    let console_layer = fmt::layer()
        .with_line_number(true)
        .with_target(with_file)
        .with_writer(std::io::stderr);

    if with_file {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, LOG_DIRECTORY, LOG_FILE_PREFIX);

        let file_layer = fmt::layer()
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .init();
    }
}
