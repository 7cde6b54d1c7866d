use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("missing required configuration field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

/// Failures talking to the open-data API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to build HTTP client")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read response body: {source}")]
    Body {
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: reqwest::StatusCode },
    #[error("invalid JSON payload: {message}")]
    Json { message: String },
    #[error("missing field in API response: {field}")]
    MissingField { field: &'static str },
}

/// A list element that does not have the expected incident shape.
#[derive(Debug, Error)]
#[error("incident #{index} is malformed: {message}")]
pub struct ShapeError {
    pub index: usize,
    pub message: String,
}

/// Failures delivering an event to the ingestion endpoint.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to build HTTP client")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("forwarding task failed: {source}")]
    Task {
        #[source]
        source: tokio::task::JoinError,
    },
}

impl From<reqwest::Error> for SourceError {
    fn from(source: reqwest::Error) -> Self {
        if source.is_status() {
            if let Some(status) = source.status() {
                return Self::HttpStatus { status };
            }
        }
        Self::Request { source }
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(source: reqwest::Error) -> Self {
        Self::Request { source }
    }
}

impl Error {
    /// Process exit status for a run that ended with this error.
    ///
    /// Configuration problems and GETs that never get a response exit with 1,
    /// like a clean refusal to start. Anything that breaks after a response
    /// arrived (body read, decode, shape, delivery) exits with 2.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_)
            | Self::Telemetry(_)
            | Self::Source(SourceError::Client { .. } | SourceError::Request { .. }) => 1,
            Self::Source(_) | Self::Shape(_) | Self::Sink(_) => 2,
        }
    }
}
