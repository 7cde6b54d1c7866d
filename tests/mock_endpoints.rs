#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use incidences::config::Config;
use incidences::error::{ConfigError, Error as IncidencesError, SourceError};
use incidences::open_data::{IncidentRecord, OpenDataClient};
use incidences::tinybird::{IncidenceEvent, TinybirdClient};
use serde_json::{Value, json};
use tokio::time::timeout;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(base: &MockServer) -> Config {
    Config::from_toml_str(&format!(
        r#"
        [source]
        base_url = "{uri}"
        timeout = "2s"

        [sink]
        base_url = "{uri}"
        token = "p.test-token"
        timeout = "2s"
        "#,
        uri = base.uri()
    ))
    .expect("config")
}

fn record() -> IncidentRecord {
    IncidentRecord {
        id: "A1".to_string(),
        kind: "pothole".to_string(),
        description: "big hole".to_string(),
        requested_at: "2024-01-01T00:00:00Z".to_string(),
        address: "Calle Sierpes 1".to_string(),
        latitude: 37.3886,
        longitude: -5.9953,
    }
}

#[tokio::test]
async fn count_uses_fixed_jurisdiction_and_window() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/request/count_last_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 12 })))
        .mount(&server)
        .await;

    let client = OpenDataClient::new(&config(&server).source, true).expect("client");
    let count = client.count_last_days().await.expect("count");
    assert_eq!(count.as_str(), "12");

    let requests = server.received_requests().await.expect("requests");
    assert_eq!(
        requests[0].url.query(),
        Some("last_days=1&jurisdiction_ids=org.sevilla")
    );
}

#[tokio::test]
async fn requests_echo_count_text_as_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/requests"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "service_id": "A1",
                "service_name": "pothole",
                "description": "big hole",
                "requested_datetime": "2024-01-01T00:00:00Z",
                "address": "Main St",
                "lat": 37.0,
                "long": -5.0
            },
            {
                "service_id": "A2",
                "service_name": "streetlight",
                "description": "dark corner",
                "requested_datetime": "2024-01-01T02:00:00Z",
                "address": "Calle Feria",
                "lat": 37.4,
                "long": -5.99
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/request/count_last_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 2 })))
        .mount(&server)
        .await;

    let client = OpenDataClient::new(&config(&server).source, true).expect("client");
    let count = client.count_last_days().await.expect("count");
    let records = client.requests(&count).await.expect("records");

    assert_eq!(records.len(), 2);
    let ids: Vec<_> = records
        .iter()
        .map(|r| r.as_ref().map(|r| r.id.as_str()).expect("valid record"))
        .collect();
    assert_eq!(ids, vec!["A1", "A2"]);

    let requests = server.received_requests().await.expect("requests");
    let list = requests
        .iter()
        .find(|req| req.url.path() == "/requests")
        .expect("list request");
    assert_eq!(
        list.url.query(),
        Some("jurisdiction_ids=org.sevilla&limit=2")
    );
}

#[tokio::test]
async fn server_error_on_count_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = OpenDataClient::new(&config(&server).source, true).expect("client");
    let err = client.count_last_days().await.expect_err("should fail");
    match err {
        IncidencesError::Source(SourceError::HttpStatus { status }) => {
            assert_eq!(status.as_u16(), 503);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Answers one connection with a body shorter than its `Content-Length`.
fn truncated_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = stream.read(&mut buf).expect("read request");
            if read == 0 {
                return;
            }
            request.extend_from_slice(&buf[..read]);
        }
        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"count\":",
            )
            .expect("write response");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn truncated_count_body_is_a_batch_failure() {
    let base = truncated_body_server();
    let config = Config::from_toml_str(&format!(
        "[source]\nbase_url = \"{base}\"\ntimeout = \"2s\"\n[sink]\ntoken = \"p.test-token\"\n"
    ))
    .expect("config");

    let client = OpenDataClient::new(&config.source, true).expect("client");
    let err = client.count_last_days().await.expect_err("should fail");
    assert!(
        matches!(err, IncidencesError::Source(SourceError::Body { .. })),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn non_array_list_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "bad limit" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/request/count_last_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 1 })))
        .mount(&server)
        .await;

    let client = OpenDataClient::new(&config(&server).source, true).expect("client");
    let count = client.count_last_days().await.expect("count");
    let err = client.requests(&count).await.expect_err("should fail");
    assert!(matches!(err, IncidencesError::Source(SourceError::Json { .. })));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn send_event_posts_bearer_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v0/events"))
        .and(query_param("name", "incidences"))
        .and(header("authorization", "Bearer p.test-token"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(json!({"successful_rows": 1, "quarantined_rows": 0})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = TinybirdClient::new(&config(&server).sink, true).expect("client");
    let before = Utc::now().timestamp();
    let event = IncidenceEvent::from_record(record(), Utc::now());
    let delivery = client.send_event(&event).await.expect("delivery");
    assert!(delivery.accepted());
    assert!(delivery.body.contains("successful_rows"));

    let requests = server.received_requests().await.expect("requests");
    let mut body: Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let stamped = body["timestamp"].as_i64().expect("integer timestamp");
    assert!(stamped >= before && stamped <= Utc::now().timestamp());
    body["timestamp"] = json!("[timestamp]");
    insta::assert_json_snapshot!(body, @r#"
    {
      "address": "Calle Sierpes 1",
      "description": "big hole",
      "id": "A1",
      "latitude": 37.3886,
      "longitude": -5.9953,
      "requestedDate": "2024-01-01T00:00:00Z",
      "timestamp": "[timestamp]",
      "type": "pothole"
    }
    "#);
}

#[tokio::test]
async fn rejected_event_is_reported_not_raised() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let client = TinybirdClient::new(&config(&server).sink, true).expect("client");
    let event = IncidenceEvent::from_record(record(), Utc::now());
    let delivery = client.send_event(&event).await.expect("delivery");
    assert!(!delivery.accepted());
    assert_eq!(delivery.body, "invalid token");
}

#[tokio::test]
async fn sink_timeouts_surface_as_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_millis(1500)))
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.sink.timeout = Duration::from_millis(300);
    let client = TinybirdClient::new(&config.sink, true).expect("client");
    let event = IncidenceEvent::from_record(record(), Utc::now());

    let res = timeout(Duration::from_secs(5), client.send_event(&event)).await;
    let err = res.expect("timeout future").expect_err("should fail");
    assert!(matches!(
        err,
        IncidencesError::Sink(incidences::error::SinkError::Request { .. })
    ));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn plain_http_requires_insecure() {
    let server = MockServer::start().await;
    let config = config(&server);

    let err = OpenDataClient::new(&config.source, false)
        .err()
        .expect("http rejected");
    assert!(matches!(
        err,
        IncidencesError::Config(ConfigError::InvalidField {
            field: "source.base_url",
            ..
        })
    ));
    assert!(TinybirdClient::new(&config.sink, false).is_err());
}

#[tokio::test]
async fn missing_token_is_a_startup_error() {
    let server = MockServer::start().await;

    let err = Config::from_toml_str(&format!(
        "[source]\nbase_url = \"{uri}\"\n[sink]\nbase_url = \"{uri}\"\n",
        uri = server.uri()
    ))
    .expect_err("token is required");
    assert!(matches!(
        err,
        IncidencesError::Config(ConfigError::MissingField {
            field: "sink.token"
        })
    ));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn events_url_carries_datasource() {
    let server = MockServer::start().await;
    let mut config = config(&server);
    config.sink.datasource = "incidences_staging".to_string();

    let client = TinybirdClient::new(&config.sink, true).expect("client");
    assert_eq!(client.events_url().path(), "/v0/events");
    assert_eq!(client.events_url().query(), Some("name=incidences_staging"));
}
