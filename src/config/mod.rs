use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::Result;
use crate::error::Error;
use crate::types::RecordErrorPolicy;

mod defaults;
mod env;
mod raw;
mod serde;

use self::serde::TimeoutDuration;

/// Upper bound for `app.concurrency` and `--concurrency`.
pub const MAX_CONCURRENCY: usize = 64;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceSettings,
    pub sink: SinkSettings,
    pub on_record_error: RecordErrorPolicy,
    pub concurrency: usize,
}

/// Where incidents are read from.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub base_url: Url,
    pub jurisdiction: String,
    pub last_days: u32,
    /// Total request timeout. `None` waits as long as the server does.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

/// Where events are delivered.
#[derive(Debug, Clone)]
pub struct SinkSettings {
    pub base_url: Url,
    pub datasource: String,
    pub token: SecretString,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Config {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration file cannot be parsed, when
    /// environment overrides are invalid, when `TINYBIRD_TOKEN` is missing or
    /// blank, or when the resulting values fail validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path).map_err(Error::from)?;
        raw
            .apply_env_overrides(&|key: &str| std::env::var(key))
            .map_err(Error::from)?;
        raw.validate_and_build()
    }

    /// Build a configuration from TOML text alone, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Same validation as [`Config::from_env_and_file`].
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        raw::parse_str(toml).map_err(Error::from)?.validate_and_build()
    }
}
