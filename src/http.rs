use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

const BODY_PREVIEW_LIMIT: usize = 256;

pub(crate) const CORRELATION_HEADER: &str = "x-correlation-id";

/// Builder shared by both upstream clients.
pub(crate) fn client_builder(
    timeout: Option<Duration>,
    connect_timeout: Duration,
    insecure_http: bool,
) -> reqwest::ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(connect_timeout)
        .user_agent(concat!("incidences/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(30));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if !insecure_http {
        builder = builder.https_only(true);
    }
    builder
}

pub(crate) fn body_preview(body: &[u8]) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    let end = body.len().min(BODY_PREVIEW_LIMIT);
    let mut preview = String::from_utf8_lossy(&body[..end]).to_string();
    if body.len() > BODY_PREVIEW_LIMIT {
        preview.push_str("...");
    }
    preview.replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::body_preview;

    #[test]
    fn body_preview_truncates_and_escapes() {
        assert_eq!(body_preview(b""), "<empty>");
        assert_eq!(body_preview(b"{\"a\":\n1}"), "{\"a\":\\n1}");

        let long = vec![b'x'; 300];
        let preview = body_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), 259);
    }
}
