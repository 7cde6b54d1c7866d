use std::time::Instant;

use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::Result;
use crate::config::SinkSettings;
use crate::error::{ConfigError, Error, SinkError};
use crate::http::{CORRELATION_HEADER, client_builder};

use super::models::{Delivery, IncidenceEvent};

#[derive(Clone)]
pub struct TinybirdClient {
    http: reqwest::Client,
    events_url: Url,
    token: SecretString,
}

impl TinybirdClient {
    /// Build a client that posts to `{base_url}/v0/events?name={datasource}`.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTPS is required but the URL uses HTTP, if the
    /// base URL cannot carry a path, or if the HTTP client fails to build.
    pub fn new(settings: &SinkSettings, insecure_http: bool) -> Result<Self> {
        if settings.base_url.scheme() != "https" && !insecure_http {
            return Err(Error::Config(ConfigError::InvalidField {
                field: "sink.base_url",
                message: "only https URLs are accepted without --insecure".to_string(),
            }));
        }

        let mut events_url = settings.base_url.clone();
        events_url
            .path_segments_mut()
            .map_err(|()| ConfigError::InvalidField {
                field: "sink.base_url",
                message: "URL cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["v0", "events"]);
        events_url
            .query_pairs_mut()
            .append_pair("name", &settings.datasource);

        let http = client_builder(
            Some(settings.timeout),
            settings.connect_timeout,
            insecure_http,
        )
        .build()
        .map_err(|err| SinkError::Client { source: err })?;

        Ok(Self {
            http,
            events_url,
            token: settings.token.clone(),
        })
    }

    #[must_use]
    pub const fn events_url(&self) -> &Url {
        &self.events_url
    }

    /// POST one event. Any HTTP answer counts as delivered; only encoding and
    /// transport failures are errors.
    pub async fn send_event(&self, event: &IncidenceEvent) -> Result<Delivery> {
        let payload = serde_json::to_vec(event).map_err(SinkError::from)?;
        let correlation_id = Uuid::now_v7().to_string();
        let started = Instant::now();

        let response = self
            .http
            .post(self.events_url.clone())
            .bearer_auth(self.token.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .header(CORRELATION_HEADER, &correlation_id)
            .body(payload)
            .send()
            .await
            .map_err(SinkError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(SinkError::from)?;
        let delivery = Delivery { status, body };

        debug!(
            event_id = %event.id,
            %correlation_id,
            latency_ms = started.elapsed().as_millis(),
            "tinybird call finished"
        );
        if delivery.accepted() {
            info!(event_id = %event.id, %status, body = %delivery.body, "event delivered");
        } else {
            warn!(event_id = %event.id, %status, body = %delivery.body, "ingestion endpoint rejected event");
        }
        Ok(delivery)
    }
}
