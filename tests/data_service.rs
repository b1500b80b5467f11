//! End-to-end tests of the data service against a mock GENESIS server.
//!
//! The client is blocking, so every client interaction runs inside
//! `spawn_blocking` while wiremock serves from the async test runtime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use genesisonline::{
    Client, ClientConfig, Content, Envelope, FileStore, MemoryStore, StatusCode,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULT_ID: &str = "51000-0013_809152783";

fn config_for(url: &str) -> ClientConfig {
    ClientConfig {
        url: url.to_string(),
        username: "GEST1234".to_string(),
        password: "secret".to_string(),
        language: "en".to_string(),
    }
}

fn raw_response(endpoint: &str, code: i64, status_content: &str, object: Value) -> Value {
    json!({
        "Ident": {"Service": "data", "Method": endpoint},
        "Status": {"Code": code, "Content": status_content, "Type": "Information"},
        "Parameter": {
            "username": "GEST1234",
            "name": "51000-0013",
            "area": "all",
            "language": "en",
            "job": "true"
        },
        "Object": object,
        "Copyright": "© Statistisches Bundesamt (Destatis), 2024"
    })
}

fn background_running_response() -> Value {
    raw_response(
        "table",
        99,
        &format!(
            "Your table request would create a very large result. \
             A batch job has been created: {RESULT_ID}"
        ),
        Value::Null,
    )
}

async fn mount_result_sequence(server: &MockServer) {
    // First poll: still running. Afterwards: completed.
    Mock::given(method("GET"))
        .and(path("/data/result"))
        .and(query_param("name", RESULT_ID))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(raw_response("result", 99, "Result not yet available", Value::Null))
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/result"))
        .and(query_param("name", RESULT_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(raw_response(
            "result",
            0,
            "erfolgreich",
            json!({"Content": {"rows": [[1, 2], [3, 4]]}}),
        )))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn small_table_returns_immediately_without_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/table"))
        .and(query_param("name", "51000-0012"))
        .respond_with(ResponseTemplate::new(200).set_body_json(raw_response(
            "table",
            0,
            "erfolgreich",
            json!({"Content": "tablefile;51000-0012"}),
        )))
        .mount(&server)
        .await;

    let url = server.uri();
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().to_path_buf();
    let envelope: Envelope = tokio::task::spawn_blocking(move || {
        let client = Client::with_config(config_for(&url))
            .unwrap()
            .with_store(FileStore::new(&store_dir));
        client.data().table("51000-0012", true, &[("area", "all")]).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(envelope.status.code, StatusCode::Match);
    assert_eq!(envelope.content.as_json(), Some(&json!("tablefile;51000-0012")));
    assert_eq!(envelope.copyright, "© Statistisches Bundesamt (Destatis), 2024");
    // No batch job, so nothing was persisted.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unmatched_table_returns_no_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/table"))
        .respond_with(ResponseTemplate::new(200).set_body_json(raw_response(
            "table",
            104,
            "Es gibt kein Objekt zum Namen 51000-ABCD",
            Value::Null,
        )))
        .mount(&server)
        .await;

    let url = server.uri();
    let envelope: Envelope = tokio::task::spawn_blocking(move || {
        let client =
            Client::with_config(config_for(&url)).unwrap().with_store(MemoryStore::new());
        client.data().table("51000-ABCD", true, &[]).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(envelope.status.code, StatusCode::NoMatch);
    assert_eq!(envelope.content, Content::Json(Value::Null));
}

#[tokio::test(flavor = "multi_thread")]
async fn partly_matched_table_returns_immediately_without_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/table"))
        .and(query_param("name", "51000-0013"))
        .respond_with(ResponseTemplate::new(200).set_body_json(raw_response(
            "table",
            22,
            "erfolgreich (Einige Klassifikationen wurden ignoriert)",
            json!({"Content": "tablefile;51000-0013"}),
        )))
        .mount(&server)
        .await;

    let url = server.uri();
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().to_path_buf();
    let envelope: Envelope = tokio::task::spawn_blocking(move || {
        let client = Client::with_config(config_for(&url))
            .unwrap()
            .with_store(FileStore::new(&store_dir));
        client.data().table("51000-0013", true, &[("area", "all")]).unwrap()
    })
    .await
    .unwrap();

    // A partial match is still an inline answer: the server's status and
    // content pass through untouched and no batch job is involved.
    assert_eq!(envelope.status.code, StatusCode::PartlyMatch);
    assert_eq!(
        envelope.status.content,
        "erfolgreich (Einige Klassifikationen wurden ignoriert)"
    );
    assert_eq!(envelope.content.as_json(), Some(&json!("tablefile;51000-0013")));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn large_table_synchronous_blocks_until_completed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/table"))
        .respond_with(ResponseTemplate::new(200).set_body_json(background_running_response()))
        .mount(&server)
        .await;
    mount_result_sequence(&server).await;

    let url = server.uri();
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().to_path_buf();
    let envelope: Envelope = tokio::task::spawn_blocking(move || {
        let client = Client::with_config(config_for(&url))
            .unwrap()
            .with_store(FileStore::new(&store_dir))
            .with_poll_interval(Duration::from_millis(50));
        client.data().table("51000-0013", true, &[("area", "all")]).unwrap()
    })
    .await
    .unwrap();

    // The completed envelope, not the bare identifier.
    assert_eq!(envelope.status.code, StatusCode::Match);
    assert_eq!(envelope.status.content, "successfull");
    assert_eq!(envelope.status.kind, "information");
    assert_eq!(envelope.content.as_json(), Some(&json!({"rows": [[1, 2], [3, 4]]})));
    // Identity still names the original submission.
    assert_eq!(envelope.ident.method, "table");
    assert!(dir.path().join(format!("{RESULT_ID}.json")).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn large_table_asynchronous_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/table"))
        .respond_with(ResponseTemplate::new(200).set_body_json(background_running_response()))
        .mount(&server)
        .await;
    mount_result_sequence(&server).await;

    let url = server.uri();
    tokio::task::spawn_blocking(move || {
        let store = Arc::new(MemoryStore::new());
        let client = Client::with_config(config_for(&url))
            .unwrap()
            .with_store(Arc::clone(&store))
            .with_poll_interval(Duration::from_millis(50));

        let pending = client.data().table("51000-0013", false, &[]).unwrap();

        // The provisional envelope carries the bare identifier as content.
        assert_eq!(pending.status.code, StatusCode::BackgroundRunning);
        assert_eq!(pending.content.as_text(), Some(RESULT_ID));

        // The placeholder is already persisted and reads are stable while
        // the job runs (the first poll response is delayed).
        let stored = client.data().load(RESULT_ID).unwrap();
        assert_eq!(stored, pending);
        assert_eq!(client.data().load(RESULT_ID).unwrap(), pending);

        let deadline = Instant::now() + Duration::from_secs(5);
        let completed = loop {
            let current = client.data().load(RESULT_ID).unwrap();
            if current.status.code == StatusCode::Match {
                break current;
            }
            assert!(Instant::now() < deadline, "batch job never completed");
            std::thread::sleep(Duration::from_millis(20));
        };

        assert_eq!(completed.status.content, "successfull");
        assert_eq!(completed.status.kind, "information");
        assert_eq!(completed.content.as_json(), Some(&json!({"rows": [[1, 2], [3, 4]]})));
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn chart_payload_is_spliced_into_probed_container() {
    let png: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/chart2table"))
        .and(query_param("name", "12411-0001"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png)
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;
    // The empty-name probe yields the server's standard JSON container.
    Mock::given(method("GET"))
        .and(path("/data/chart2table"))
        .and(query_param("name", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Ident": {"Service": "data", "Method": "chart2table"},
            "Status": {"Code": 104, "Content": "Es gibt kein Objekt zum Namen", "Type": "Information"},
            "Parameter": {"username": "GEST1234", "name": "", "language": "en"},
            "Object": null,
            "Copyright": "© Statistisches Bundesamt (Destatis), 2024"
        })))
        .mount(&server)
        .await;

    let url = server.uri();
    let envelope: Envelope = tokio::task::spawn_blocking(move || {
        let client =
            Client::with_config(config_for(&url)).unwrap().with_store(MemoryStore::new());
        client.data().chart2table("12411-0001", &[]).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(envelope.content.as_bytes(), Some(png));
    // The rest of the envelope comes from the probed container, with the
    // status rewritten to a plain success and the name restored.
    assert_eq!(envelope.status.code, StatusCode::Match);
    assert_eq!(envelope.status.content, "successfull");
    assert_eq!(envelope.parameter.get("name"), Some(&json!("12411-0001")));
    assert_eq!(envelope.copyright, "© Statistisches Bundesamt (Destatis), 2024");
}

#[tokio::test(flavor = "multi_thread")]
async fn csv_payload_is_spliced_into_probed_container() {
    let csv = "time;value\n2023;83166711\n2024;83456045\n";

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/result"))
        .and(query_param("name", "12411-0001"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(csv.as_bytes(), "text/csv"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/result"))
        .and(query_param("name", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Ident": {"Service": "data", "Method": "result"},
            "Status": {"Code": 104, "Content": "Es gibt kein Objekt zum Namen", "Type": "Information"},
            "Parameter": {"username": "GEST1234", "name": "", "language": "en"},
            "Object": null,
            "Copyright": "© Statistisches Bundesamt (Destatis), 2024"
        })))
        .mount(&server)
        .await;

    let url = server.uri();
    let envelope: Envelope = tokio::task::spawn_blocking(move || {
        let client =
            Client::with_config(config_for(&url)).unwrap().with_store(MemoryStore::new());
        client.data().result("12411-0001", &[]).unwrap()
    })
    .await
    .unwrap();

    // The CSV text lands as-is in the content of the probed container.
    assert_eq!(envelope.content.as_text(), Some(csv));
    assert_eq!(envelope.status.code, StatusCode::Match);
    assert_eq!(envelope.status.content, "successfull");
    assert_eq!(envelope.parameter.get("name"), Some(&json!("12411-0001")));
    assert_eq!(envelope.copyright, "© Statistisches Bundesamt (Destatis), 2024");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_parameter_still_yields_a_valid_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/timeseries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(raw_response(
            "timeseries",
            0,
            "erfolgreich",
            json!({"Content": "ts;11111KJ001"}),
        )))
        .mount(&server)
        .await;

    let url = server.uri();
    let envelope: Envelope = tokio::task::spawn_blocking(move || {
        let client =
            Client::with_config(config_for(&url)).unwrap().with_store(MemoryStore::new());
        // "selectionXYZ" is not among the parameters the server declares;
        // the mismatch is logged as a warning, never an error.
        client.data().timeseries("11111KJ001", &[("selectionXYZ", "all")]).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(envelope.status.code, StatusCode::Match);
    assert_eq!(envelope.content.as_json(), Some(&json!("ts;11111KJ001")));
}

#[tokio::test(flavor = "multi_thread")]
async fn http_failure_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/cube"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let url = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        let client =
            Client::with_config(config_for(&url)).unwrap().with_store(MemoryStore::new());
        client.data().cube("11111BJ001", &[]).unwrap_err()
    })
    .await
    .unwrap();

    assert!(matches!(err, genesisonline::Error::Http { status, .. }
        if status == reqwest::StatusCode::UNAUTHORIZED));
}

#[tokio::test(flavor = "multi_thread")]
async fn unexpected_content_type_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/map2table"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>".as_bytes(), "text/html"))
        .mount(&server)
        .await;

    let url = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        let client =
            Client::with_config(config_for(&url)).unwrap().with_store(MemoryStore::new());
        client.data().map2table("11111-0001", &[]).unwrap_err()
    })
    .await
    .unwrap();

    assert!(
        matches!(err, genesisonline::Error::UnexpectedContent { ref content_type }
        if content_type.contains("text/html"))
    );
}
