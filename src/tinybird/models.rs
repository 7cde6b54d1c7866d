use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;

use crate::open_data::IncidentRecord;

/// Row sent to the `incidences` datasource. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidenceEvent {
    /// Unix seconds at the moment the event was built.
    pub timestamp: i64,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(rename = "requestedDate")]
    pub requested_date: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl IncidenceEvent {
    #[must_use]
    pub fn from_record(record: IncidentRecord, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now.timestamp(),
            id: record.id,
            kind: record.kind,
            description: record.description,
            requested_date: record.requested_at,
            address: record.address,
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}

/// What the ingestion endpoint answered.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub status: StatusCode,
    pub body: String,
}

impl Delivery {
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.status.is_success()
    }
}
