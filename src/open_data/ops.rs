use tracing::info;

use crate::Result;

use super::OpenDataClient;
use super::models::{DecodedRecord, IncidentCount, decode_records};

impl OpenDataClient {
    /// Number of incidents reported in the configured lookback window.
    pub async fn count_last_days(&self) -> Result<IncidentCount> {
        let mut url = self.endpoint(&["request", "count_last_days"])?;
        url.query_pairs_mut()
            .append_pair("last_days", &self.last_days.to_string())
            .append_pair("jurisdiction_ids", &self.jurisdiction);

        let body = self.get(url).await?;
        let count = IncidentCount::from_body(&body)?;
        info!(count = %count, jurisdiction = %self.jurisdiction, "incidents reported");
        Ok(count)
    }

    /// Up to `limit` incidents, in the order the API returns them.
    ///
    /// The outer error covers transport and whole-body decoding; each element
    /// carries its own shape check.
    pub async fn requests(&self, limit: &IncidentCount) -> Result<Vec<DecodedRecord>> {
        let mut url = self.endpoint(&["requests"])?;
        url.query_pairs_mut()
            .append_pair("jurisdiction_ids", &self.jurisdiction)
            .append_pair("limit", limit.as_str());

        let body = self.get(url).await?;
        Ok(decode_records(&body)?)
    }
}
