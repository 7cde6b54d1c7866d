use std::time::Duration;

pub(super) fn default_source_base_url() -> String {
    "https://api-pgics.sevilla.org".to_string()
}

pub(super) fn default_jurisdiction() -> String {
    "org.sevilla".to_string()
}

pub(super) const fn default_last_days() -> u32 {
    1
}

pub(super) fn default_sink_base_url() -> String {
    "https://api.eu-central-1.aws.tinybird.co".to_string()
}

pub(super) fn default_datasource() -> String {
    "incidences".to_string()
}

pub(super) const fn default_sink_timeout() -> Duration {
    Duration::from_secs(10)
}

pub(super) fn default_on_record_error() -> String {
    "abort".to_string()
}

pub(super) const fn default_concurrency() -> usize {
    1
}
