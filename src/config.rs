//! Optional JSON config file, merged with CLI flags the same way the
//! teacher's `load_config` merges `PR_CONFIG_JSON`/`config.json` with
//! `Default`: read-if-present, `#[serde(default)]` for missing fields, and
//! CLI values always win over what's on disk.

use crate::error::StartupError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_path: Option<String>,
    pub backoff_ms: Option<u64>,
    pub ca: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
}

/// Reads and parses the config file at `path`, if given. A missing
/// `--file`/`-f` flag is not an error; an unreadable or malformed file is.
pub fn load(path: Option<&Path>) -> Result<FileConfig, StartupError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let contents = std::fs::read_to_string(path).map_err(|err| {
        StartupError::Config(format!("reading {}: {err}", path.display()))
    })?;
    serde_json::from_str(&contents)
        .map_err(|err| StartupError::Config(format!("parsing {}: {err}", path.display())))
}

/// Picks the CLI value when given, otherwise falls back to the file value.
pub fn merge<T>(cli: Option<T>, file: Option<T>, default: T) -> T {
    cli.or(file).unwrap_or(default)
}
