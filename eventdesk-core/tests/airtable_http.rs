use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eventdesk_core::EventDeskError;
use eventdesk_core::config::EventDeskConfig;
use eventdesk_core::store::airtable::AirtableStore;
use eventdesk_core::store::{Fields, Filter, TableStore};
use mockito::{Matcher, Server};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const FORM_PATH: &str = "/v0/appBase/registration_form";

fn config(api_url: String) -> EventDeskConfig {
    EventDeskConfig {
        api_url,
        base_id: Some("appBase".into()),
        api_key: Some("patKey".into()),
        ..EventDeskConfig::default()
    }
}

fn store(server: &Server) -> AirtableStore {
    AirtableStore::new(&config(format!("{}/v0", server.url()))).expect("store")
}

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().expect("object literal")
}

#[tokio::test]
async fn query_follows_offset_pages_with_bearer_auth() {
    let mut server = Server::new_async().await;

    let first = server
        .mock("GET", FORM_PATH)
        .match_header("authorization", "Bearer patKey")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageSize".into(), "100".into()),
            Matcher::UrlEncoded("filterByFormula".into(), "{event_id} = 42".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "records": [{ "id": "rec1", "fields": { "event_id": 42, "rank": 0 } }],
                "offset": "itr1"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let second = server
        .mock("GET", FORM_PATH)
        .match_header("authorization", "Bearer patKey")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("offset".into(), "itr1".into()),
            Matcher::UrlEncoded("filterByFormula".into(), "{event_id} = 42".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "records": [{ "id": "rec2", "fields": { "event_id": 42, "rank": 1 } }] })
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let records = store(&server)
        .query_all("registration_form", &Filter::eq("event_id", 42))
        .await
        .unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["rec1", "rec2"]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn read_succeeds_after_two_server_errors() {
    let mut server = Server::new_async().await;

    let failing = server
        .mock("GET", FORM_PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("upstream busy")
        .expect(2)
        .create_async()
        .await;
    let ok = server
        .mock("GET", FORM_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "records": [] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let records = store(&server)
        .query_all("registration_form", &Filter::All)
        .await
        .unwrap();

    assert!(records.is_empty());
    failing.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn read_gives_up_after_max_retries() {
    let mut server = Server::new_async().await;

    let failing = server
        .mock("GET", FORM_PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body(json!({ "error": "SERVICE_UNAVAILABLE" }).to_string())
        .expect(3)
        .create_async()
        .await;

    let err = store(&server)
        .query_all("registration_form", &Filter::All)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, EventDeskError::RemoteUnavailable(message) if message.contains("SERVICE_UNAVAILABLE")),
        "{err}"
    );
    failing.assert_async().await;
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let mut server = Server::new_async().await;

    let rejected = server
        .mock("POST", FORM_PATH)
        .with_status(422)
        .with_body(
            json!({ "error": { "type": "INVALID_VALUE_FOR_COLUMN", "message": "Bad rank" } })
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let err = store(&server)
        .create("registration_form", fields(json!({ "rank": "x" })))
        .await
        .unwrap_err();

    assert!(
        matches!(&err, EventDeskError::Remote { status: 422, message } if message == "Bad rank"),
        "{err}"
    );
    rejected.assert_async().await;
}

#[tokio::test]
async fn create_is_not_repeated_after_server_error() {
    let mut server = Server::new_async().await;

    let failing = server
        .mock("POST", FORM_PATH)
        .with_status(502)
        .with_body("bad gateway")
        .expect(1)
        .create_async()
        .await;

    let err = store(&server)
        .create("registration_form", fields(json!({ "name": "Age" })))
        .await
        .unwrap_err();

    assert!(matches!(err, EventDeskError::RemoteUnavailable(_)), "{err}");
    failing.assert_async().await;
}

#[tokio::test]
async fn create_is_retried_after_rate_limit() {
    let mut server = Server::new_async().await;

    let limited = server
        .mock("POST", FORM_PATH)
        .with_status(429)
        .with_body(json!({ "error": { "type": "RATE_LIMIT_REACHED" } }).to_string())
        .expect(1)
        .create_async()
        .await;
    let created = server
        .mock("POST", FORM_PATH)
        .match_body(Matcher::PartialJson(json!({ "fields": { "name": "Age" } })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "rec9", "fields": { "name": "Age" } }).to_string())
        .expect(1)
        .create_async()
        .await;

    let record = store(&server)
        .create("registration_form", fields(json!({ "name": "Age" })))
        .await
        .unwrap();

    assert_eq!(record.id, "rec9");
    limited.assert_async().await;
    created.assert_async().await;
}

/// Accepts connections, counts them, and answers every request with a
/// created record after `stall`.
async fn stalling_server(stall: Duration) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(stall).await;

                let body = json!({ "id": "rec1", "fields": { "name": "Age" } }).to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    (format!("http://{addr}/v0"), connections)
}

#[tokio::test]
async fn timed_out_create_is_sent_once() {
    let (api_url, connections) = stalling_server(Duration::from_secs(3)).await;
    let store = AirtableStore::new(&EventDeskConfig {
        timeout_secs: 1,
        ..config(api_url)
    })
    .unwrap();

    let result = store
        .create("registration_form", fields(json!({ "name": "Age" })))
        .await;

    assert!(matches!(result, Err(EventDeskError::RemoteUnavailable(_))));
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn batch_delete_sends_record_ids_as_query() {
    let mut server = Server::new_async().await;

    let deleted = server
        .mock("DELETE", FORM_PATH)
        .match_header("authorization", "Bearer patKey")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("records[]".into(), "rec1".into()),
            Matcher::UrlEncoded("records[]".into(), "rec2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "records": [{ "id": "rec1", "deleted": true }, { "id": "rec2", "deleted": true }] })
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    store(&server)
        .batch_delete("registration_form", &["rec1".to_string(), "rec2".to_string()])
        .await
        .unwrap();

    deleted.assert_async().await;
}
