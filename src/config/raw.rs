use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use url::Url;

use crate::Result;
use crate::error::ConfigError;
use crate::types::RecordErrorPolicy;

use super::defaults::{
    default_concurrency, default_datasource, default_jurisdiction, default_last_days,
    default_on_record_error, default_sink_base_url, default_sink_timeout, default_source_base_url,
};
use super::env::{Lookup, env_duration, env_parse, env_string};
use super::{
    Config, DEFAULT_CONNECT_TIMEOUT, MAX_CONCURRENCY, SinkSettings, SourceSettings,
    TimeoutDuration,
};

const ENV_PREFIX: &str = "INCIDENCES";

pub(super) fn load(path: impl AsRef<Path>) -> std::result::Result<RawConfig, ConfigError> {
    let mut builder = ::config::Config::builder();
    let path = path.as_ref();
    builder = builder.add_source(::config::File::from(path).required(false));
    builder = builder.add_source(
        ::config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

pub(super) fn parse_str(toml: &str) -> std::result::Result<RawConfig, ConfigError> {
    ::config::Config::builder()
        .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub(super) source: RawSource,
    #[serde(default)]
    pub(super) sink: RawSink,
    #[serde(default)]
    pub(super) app: RawApp,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawSource {
    #[serde(default = "default_source_base_url")]
    pub(super) base_url: String,
    #[serde(default = "default_jurisdiction")]
    pub(super) jurisdiction: String,
    #[serde(default = "default_last_days")]
    pub(super) last_days: u32,
    #[serde(default)]
    #[serde_as(as = "Option<TimeoutDuration>")]
    pub(super) timeout: Option<Duration>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawSink {
    #[serde(default = "default_sink_base_url")]
    pub(super) base_url: String,
    #[serde(default = "default_datasource")]
    pub(super) datasource: String,
    pub(super) token: Option<String>,
    #[serde(default = "default_sink_timeout")]
    #[serde_as(as = "TimeoutDuration")]
    pub(super) timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawApp {
    #[serde(default = "default_on_record_error")]
    pub(super) on_record_error: String,
    #[serde(default = "default_concurrency")]
    pub(super) concurrency: usize,
}

impl RawConfig {
    pub(super) fn apply_env_overrides(
        &mut self,
        env: &impl Lookup,
    ) -> std::result::Result<(), ConfigError> {
        if let Some(token) = env_string(env, "TINYBIRD_TOKEN")? {
            self.sink.token = Some(token);
        }
        if let Some(url) = env_string(env, "TINYBIRD_BASE_URL")? {
            self.sink.base_url = url;
        }
        if let Some(datasource) = env_string(env, "TINYBIRD_DATASOURCE")? {
            self.sink.datasource = datasource;
        }
        if let Some(timeout) = env_duration(env, "TINYBIRD_TIMEOUT")? {
            self.sink.timeout = timeout;
        }
        if let Some(url) = env_string(env, "SEVILLA_BASE_URL")? {
            self.source.base_url = url;
        }
        if let Some(jurisdiction) = env_string(env, "SEVILLA_JURISDICTION")? {
            self.source.jurisdiction = jurisdiction;
        }
        if let Some(last_days) = env_parse::<u32>(env, "SEVILLA_LAST_DAYS")? {
            self.source.last_days = last_days;
        }
        if let Some(timeout) = env_duration(env, "SEVILLA_TIMEOUT")? {
            self.source.timeout = Some(timeout);
        }
        if let Some(policy) = env_string(env, "ON_RECORD_ERROR")? {
            self.app.on_record_error = policy;
        }
        if let Some(concurrency) = env_parse::<usize>(env, "CONCURRENCY")? {
            self.app.concurrency = concurrency;
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Config> {
        let token = self.sink.token.ok_or(ConfigError::MissingField {
            field: "sink.token",
        })?;
        if token.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "sink.token",
                message: "token cannot be empty".to_string(),
            }
            .into());
        }

        let source_url = parse_url("source.base_url", &self.source.base_url)?;
        let sink_url = parse_url("sink.base_url", &self.sink.base_url)?;

        if self.source.jurisdiction.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "source.jurisdiction",
                message: "jurisdiction cannot be empty".to_string(),
            }
            .into());
        }
        if self.source.last_days == 0 {
            return Err(ConfigError::InvalidField {
                field: "source.last_days",
                message: "lookback window must be at least one day".to_string(),
            }
            .into());
        }
        if self.sink.datasource.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "sink.datasource",
                message: "datasource name cannot be empty".to_string(),
            }
            .into());
        }
        if self.source.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::InvalidField {
                field: "source.timeout",
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }
        if self.sink.timeout.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "sink.timeout",
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.app.concurrency) {
            return Err(ConfigError::InvalidField {
                field: "app.concurrency",
                message: format!(
                    "expected between 1 and {MAX_CONCURRENCY}, got {}",
                    self.app.concurrency
                ),
            }
            .into());
        }

        let on_record_error = RecordErrorPolicy::from_str(&self.app.on_record_error).map_err(
            |message| ConfigError::InvalidField {
                field: "app.on_record_error",
                message,
            },
        )?;

        Ok(Config {
            source: SourceSettings {
                base_url: source_url,
                jurisdiction: self.source.jurisdiction,
                last_days: self.source.last_days,
                timeout: self.source.timeout,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            },
            sink: SinkSettings {
                base_url: sink_url,
                datasource: self.sink.datasource,
                token: token.into(),
                timeout: self.sink.timeout,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            },
            on_record_error,
            concurrency: self.app.concurrency,
        })
    }
}

fn parse_url(field: &'static str, raw: &str) -> std::result::Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|err| ConfigError::InvalidField {
        field,
        message: err.to_string(),
    })
}

impl Default for RawSource {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            jurisdiction: default_jurisdiction(),
            last_days: default_last_days(),
            timeout: None,
        }
    }
}

impl Default for RawSink {
    fn default() -> Self {
        Self {
            base_url: default_sink_base_url(),
            datasource: default_datasource(),
            token: None,
            timeout: default_sink_timeout(),
        }
    }
}

impl Default for RawApp {
    fn default() -> Self {
        Self {
            on_record_error: default_on_record_error(),
            concurrency: default_concurrency(),
        }
    }
}
