//! Delivery of incidence events to the Tinybird events API.

pub(crate) mod client;
pub(crate) mod models;

pub use client::TinybirdClient;
pub use models::{Delivery, IncidenceEvent};
