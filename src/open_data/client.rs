use std::time::Instant;

use bytes::Bytes;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::Result;
use crate::config::SourceSettings;
use crate::error::{ConfigError, Error, SourceError};
use crate::http::{CORRELATION_HEADER, client_builder};

#[derive(Clone)]
pub struct OpenDataClient {
    http: reqwest::Client,
    base: Url,
    pub(super) jurisdiction: String,
    pub(super) last_days: u32,
}

impl OpenDataClient {
    /// Build a client for the open-data API described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTPS is required but the URL uses HTTP, or if the
    /// underlying HTTP client fails to build.
    pub fn new(settings: &SourceSettings, insecure_http: bool) -> Result<Self> {
        if settings.base_url.scheme() != "https" && !insecure_http {
            return Err(Error::Config(ConfigError::InvalidField {
                field: "source.base_url",
                message: "only https URLs are accepted without --insecure".to_string(),
            }));
        }

        let http = client_builder(settings.timeout, settings.connect_timeout, insecure_http)
            .build()
            .map_err(|err| SourceError::Client { source: err })?;

        Ok(Self {
            http,
            base: settings.base_url.clone(),
            jurisdiction: settings.jurisdiction.clone(),
            last_days: settings.last_days,
        })
    }

    pub(super) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ConfigError::InvalidField {
                field: "source.base_url",
                message: "URL cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue a GET and return the raw body of a successful response.
    pub(super) async fn get(&self, url: Url) -> Result<Bytes> {
        let correlation_id = Uuid::now_v7().to_string();
        let started = Instant::now();
        let path = url.path().to_string();

        let response = self
            .http
            .get(url)
            .header(CORRELATION_HEADER, &correlation_id)
            .send()
            .await
            .map_err(SourceError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus { status }.into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| SourceError::Body { source })?;
        debug!(
            path = %path,
            %correlation_id,
            %status,
            bytes = body.len(),
            latency_ms = started.elapsed().as_millis(),
            "open-data call succeeded"
        );
        Ok(body)
    }
}
