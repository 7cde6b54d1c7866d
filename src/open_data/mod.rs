//! Client for the Sevilla open311-style open-data API.

pub(crate) mod client;
pub(crate) mod models;
pub(crate) mod ops;

pub use client::OpenDataClient;
pub use models::{DecodedRecord, IncidentCount, IncidentRecord};
