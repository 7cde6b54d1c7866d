#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
mod http;
pub mod open_data;
pub mod telemetry;
pub mod tinybird;
pub mod types;

pub type Result<T> = std::result::Result<T, error::Error>;
