//! Facade behavior on the wire, against scripted `wiremock` responses.

use std::sync::Arc;
use std::time::Duration;

use clinic_client::{
    ApiClient, BusySurface, ClientError, DecodeError, Payload, TelemetrySink, TransportError,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    name: String,
}

#[derive(Default)]
struct Recorder {
    busy: Mutex<Vec<bool>>,
    reports: Mutex<Vec<String>>,
}

struct BusyProbe(Arc<Recorder>);

impl BusySurface for BusyProbe {
    fn set_busy(&self, busy: bool) {
        self.0.busy.lock().push(busy);
    }
}

struct SinkProbe(Arc<Recorder>);

impl TelemetrySink for SinkProbe {
    fn report(&self, _error: &ClientError, origin: &str) {
        self.0.reports.lock().push(origin.to_string());
    }
}

fn client(server: &MockServer, timeout: Duration) -> (ApiClient, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let client = ApiClient::builder()
        .base_url(server.uri())
        .timeout(timeout)
        .busy_surface(Arc::new(BusyProbe(recorder.clone())))
        .telemetry(Arc::new(SinkProbe(recorder.clone())))
        .build();
    (client, recorder)
}

fn header<'a>(request: &'a wiremock::Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn post_echo_returns_server_assigned_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/patients"))
        .and(body_json(json!({"name": "Jane"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42, "name": "Jane"})))
        .expect(1)
        .mount(&server)
        .await;
    let (client, recorder) = client(&server, Duration::from_secs(5));

    let jane = Patient {
        id: None,
        name: "Jane".to_string(),
    };
    let created: Patient = client.post_json("/patients", &jane).await.unwrap();

    assert_eq!(
        created,
        Patient {
            id: Some(42),
            name: "Jane".to_string()
        }
    );
    assert_eq!(*recorder.busy.lock(), vec![true, false]);
    assert!(recorder.reports.lock().is_empty());
}

#[tokio::test]
async fn empty_list_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    let (client, _) = client(&server, Duration::from_secs(5));

    let patients: Vec<Patient> = client.get_json("/patients").await.unwrap();

    assert!(patients.is_empty());
}

#[tokio::test]
async fn timeout_is_transport_error_reported_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let (client, recorder) = client(&server, Duration::from_millis(200));

    let err = client.get_json::<Vec<Patient>>("/patients").await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(TransportError::Timeout)));
    assert_eq!(*recorder.reports.lock(), ["get_json"]);
    assert_eq!(*recorder.busy.lock(), vec![true, false]);
}

#[tokio::test]
async fn empty_and_malformed_bodies_are_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(path("/malformed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\": 1,"))
        .mount(&server)
        .await;
    Mock::given(path("/null"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;
    let (client, recorder) = client(&server, Duration::from_secs(5));

    let err = client.get_json::<Patient>("/empty").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(DecodeError::EmptyBody)));

    let err = client.get_json::<Patient>("/malformed").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(DecodeError::Malformed(_))));

    let err = client.get_json::<Patient>("/null").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(DecodeError::Malformed(_))));

    assert_eq!(*recorder.reports.lock(), ["get_json", "get_json", "get_json"]);
    assert_eq!(
        *recorder.busy.lock(),
        vec![true, false, true, false, true, false]
    );
}

#[tokio::test]
async fn server_error_surfaces_as_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/patients/7"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
        .mount(&server)
        .await;
    let (client, recorder) = client(&server, Duration::from_secs(5));

    let err = client.delete_json::<Patient>("/patients/7").await.unwrap_err();
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "database offline");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let raw = client.delete_raw("/patients/7").await.unwrap();
    assert_eq!(raw.status, 500);
    assert_eq!(*recorder.reports.lock(), ["delete_json"]);
}

#[tokio::test]
async fn default_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    let (client, _) = client(&server, Duration::from_secs(5));

    client.get_raw("/patients").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(header(&requests[0], "accept"), Some("application/json"));
    let encoding = header(&requests[0], "accept-encoding").unwrap_or_default();
    assert!(encoding.contains("gzip"), "accept-encoding was {encoding:?}");
    assert!(encoding.contains("deflate"), "accept-encoding was {encoding:?}");
    assert!(header(&requests[0], "user-agent")
        .unwrap_or_default()
        .starts_with("clinic-client/"));
}

#[tokio::test]
async fn body_encoding_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let (client, _) = client(&server, Duration::from_secs(5));

    client.post_raw("/empty", Payload::empty()).await.unwrap();
    client
        .post_raw("/binary", Payload::binary(vec![0xcau8, 0xfe]))
        .await
        .unwrap();
    client
        .post_raw("/json", Payload::json(&json!({})))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);

    assert!(requests[0].body.is_empty());
    assert_eq!(header(&requests[0], "content-type"), None);

    assert_eq!(requests[1].body, vec![0xcau8, 0xfe]);
    assert_eq!(
        header(&requests[1], "content-type"),
        Some("application/octet-stream")
    );

    assert_eq!(requests[2].body, b"{}".to_vec());
    assert_eq!(
        header(&requests[2], "content-type"),
        Some("application/json; charset=utf-8")
    );
}

#[tokio::test]
async fn overlapping_calls_share_one_busy_period() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    let (client, recorder) = client(&server, Duration::from_secs(5));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let client = client.clone();
        tasks.spawn(async move { client.get_json::<Vec<Patient>>("/patients").await });
    }
    while let Some(result) = tasks.join_next().await {
        assert!(result.unwrap().unwrap().is_empty());
    }

    assert_eq!(*recorder.busy.lock(), vec![true, false]);
    assert!(recorder.reports.lock().is_empty());
}

#[tokio::test]
async fn mixed_outcomes_keep_busy_balanced() {
    let server = MockServer::start().await;
    Mock::given(path("/ok"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(path("/bad"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oops")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    let (client, recorder) = client(&server, Duration::from_secs(5));

    let (ok, bad) = tokio::join!(
        client.get_json::<Vec<Patient>>("/ok"),
        client.get_json::<Vec<Patient>>("/bad"),
    );

    assert!(ok.is_ok());
    assert!(bad.is_err());
    let busy = recorder.busy.lock();
    let on = busy.iter().filter(|b| **b).count();
    assert_eq!(on, busy.len() - on);
    assert_eq!(busy.last(), Some(&false));
    assert_eq!(*recorder.reports.lock(), ["get_json"]);
}
