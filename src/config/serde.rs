use std::time::Duration;

use humantime::parse_duration;
use serde::Deserialize;
use serde_with::DeserializeAs;

/// Reads timeouts written as humantime strings (`"10s"`, `"1m 30s"`).
/// A zero timeout is rejected.
pub(super) struct TimeoutDuration;

impl<'de> DeserializeAs<'de, Duration> for TimeoutDuration {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<Duration, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let duration = parse_duration(raw.trim()).map_err(serde::de::Error::custom)?;
        if duration.is_zero() {
            return Err(serde::de::Error::custom("timeout must be greater than zero"));
        }
        Ok(duration)
    }
}
