use std::fmt::{self, Display};

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::{ShapeError, SourceError};
use crate::http::body_preview;

/// The `count` field of the count endpoint, kept as text so it can be echoed
/// back as the list `limit` without a numeric round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentCount(String);

impl IncidentCount {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_body(body: &[u8]) -> std::result::Result<Self, SourceError> {
        #[derive(Deserialize)]
        struct CountEnvelope<'a> {
            #[serde(borrow, default)]
            count: Option<&'a RawValue>,
        }

        let envelope: CountEnvelope<'_> =
            serde_json::from_slice(body).map_err(|err| json_error(&err, body))?;
        let raw = envelope
            .count
            .ok_or(SourceError::MissingField { field: "count" })?;

        Ok(Self(count_text(raw.get().trim())))
    }
}

/// Strings are unquoted. Integer literals keep their exact digits; any other
/// number (`5.0`, `1e2`) is rendered as its shortest plain decimal, so `5.0`
/// becomes `5`. Anything else is passed through verbatim.
fn count_text(raw: &str) -> String {
    if let Ok(unquoted) = serde_json::from_str::<String>(raw) {
        return unquoted;
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return raw.to_string();
    }
    match raw.parse::<f64>() {
        Ok(number) if number.is_finite() => number.to_string(),
        _ => raw.to_string(),
    }
}

impl Display for IncidentCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One service request from the list endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncidentRecord {
    #[serde(rename = "service_id")]
    pub id: String,
    #[serde(rename = "service_name")]
    pub kind: String,
    pub description: String,
    /// Opaque timestamp text; never parsed.
    #[serde(rename = "requested_datetime")]
    pub requested_at: String,
    pub address: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "long")]
    pub longitude: f64,
}

pub type DecodedRecord = std::result::Result<IncidentRecord, ShapeError>;

/// Decode the list body. The body as a whole must be an array of objects;
/// each object is then checked on its own so one bad record does not hide
/// the position of the others.
pub(crate) fn decode_records(body: &[u8]) -> std::result::Result<Vec<DecodedRecord>, SourceError> {
    let objects: Vec<Map<String, Value>> =
        serde_json::from_slice(body).map_err(|err| json_error(&err, body))?;

    Ok(objects
        .into_iter()
        .enumerate()
        .map(|(index, object)| {
            serde_json::from_value(Value::Object(object)).map_err(|err| ShapeError {
                index,
                message: err.to_string(),
            })
        })
        .collect())
}

fn json_error(err: &serde_json::Error, body: &[u8]) -> SourceError {
    SourceError::Json {
        message: format!(
            "error decoding response body: {err}; body preview: {}",
            body_preview(body)
        ),
    }
}
