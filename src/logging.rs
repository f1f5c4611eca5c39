//! `log4rs` wiring, adapted from the teacher's `utils::logging::setup`.
//!
//! Differences from the teacher: the original aiotunnel program configured
//! itself from three env vars (`LOGPATH`, `LOG_FORMAT`, `LOGLEVEL`) rather
//! than a config struct, and `--verbose` forces debug regardless of what's
//! in the environment, so that behavior is kept instead of the teacher's
//! config-driven level.

use crate::env::{self, LOGLEVEL, LOGPATH, LOG_FORMAT};
use crate::error::StartupError;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Initializes the global logger. Call once, before anything else logs.
pub fn setup(verbose: bool) -> Result<(), StartupError> {
    let pattern = env::str_env(LOG_FORMAT);
    let log_dir = env::str_env(LOGPATH);
    let level = if verbose {
        LevelFilter::Debug
    } else {
        env::from_env(LOGLEVEL)
    };

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(&pattern)))
        .build();

    let log_path = format!("{log_dir}/httunnel.log");
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(&pattern)))
        .build(&log_path)
        .map_err(|err| StartupError::Logging(err.to_string()))?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("file", Box::new(file)))
        .logger(
            Logger::builder()
                .appenders(["stdout", "file"])
                .additive(false)
                .build("httunnel", level),
        )
        .build(
            Root::builder()
                .appenders(["stdout", "file"])
                .build(LevelFilter::Warn),
        )
        .map_err(|err| StartupError::Logging(err.to_string()))?;

    log4rs::init_config(config).map_err(|err| StartupError::Logging(err.to_string()))?;
    Ok(())
}
