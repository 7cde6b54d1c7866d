use std::env::VarError;
use std::time::Duration;

use humantime::parse_duration;

use crate::error::ConfigError;

/// Looks up one override by name. Production passes `std::env::var`,
/// tests pass a fixed map.
pub(super) trait Lookup: Fn(&str) -> std::result::Result<String, VarError> {}

impl<F> Lookup for F where F: Fn(&str) -> std::result::Result<String, VarError> {}

/// Present-but-empty is returned as `Some("")`; the token check relies on it.
pub(super) fn env_string(
    env: &impl Lookup,
    key: &'static str,
) -> std::result::Result<Option<String>, ConfigError> {
    match env(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(ConfigError::InvalidField {
            field: key,
            message: err.to_string(),
        }),
    }
}

fn env_trimmed(
    env: &impl Lookup,
    key: &'static str,
) -> std::result::Result<Option<String>, ConfigError> {
    Ok(env_string(env, key)?
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

pub(super) fn env_parse<T>(
    env: &impl Lookup,
    key: &'static str,
) -> std::result::Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_trimmed(env, key)?
        .map(|value| value.parse::<T>())
        .transpose()
        .map_err(|err| ConfigError::InvalidField {
            field: key,
            message: err.to_string(),
        })
}

pub(super) fn env_duration(
    env: &impl Lookup,
    key: &'static str,
) -> std::result::Result<Option<Duration>, ConfigError> {
    env_trimmed(env, key)?
        .map(|value| parse_duration(&value))
        .transpose()
        .map_err(|err| ConfigError::InvalidField {
            field: key,
            message: err.to_string(),
        })
}
