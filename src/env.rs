//! Environment variable overrides for logging configuration.
//!
//! Mirrors the `(key, default)` tuple convention the rest of this family of
//! tools uses for env-driven defaults, narrowed down to the three variables
//! the tunnel CLI actually documents: `LOGPATH`, `LOG_FORMAT`, `LOGLEVEL`.

use log::LevelFilter;
use std::str::FromStr;

/// Directory the log file is written under.
pub const LOGPATH: (&str, &str) = ("LOGPATH", ".");
/// `log4rs` pattern-encoder format string.
pub const LOG_FORMAT: (&str, &str) = ("LOG_FORMAT", "[{d} {h({l})} {M}] {m}{n}");
/// Default log level, overridden to `debug` by `--verbose` regardless of
/// what's in the environment.
pub const LOGLEVEL: (&str, LevelFilter) = ("LOGLEVEL", LevelFilter::Info);

#[inline]
pub fn str_env(pair: (&str, &str)) -> String {
    std::env::var(pair.0).unwrap_or_else(|_| pair.1.to_string())
}

#[inline]
pub fn from_env<F: FromStr>(pair: (&str, F)) -> F {
    std::env::var(pair.0)
        .ok()
        .and_then(|value| F::from_str(&value).ok())
        .unwrap_or(pair.1)
}
