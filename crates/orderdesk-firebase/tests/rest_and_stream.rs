//! Realtime database client against a mock HTTP server

use mockito::{Matcher, Server};
use orderdesk_firebase::{FirebaseConfig, FirebaseRemoteStore};
use orderdesk_storage::{RemoteError, RemotePath, RemoteStore, SnapshotListener};
use orderdesk_test_utils::{wait_until, WAIT_TIMEOUT};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

fn store(server: &Server) -> FirebaseRemoteStore {
    FirebaseRemoteStore::new(
        FirebaseConfig::new(server.url())
            .with_auth("token")
            .with_reconnect_delay(Duration::from_secs(60)),
    )
    .unwrap()
}

fn path(p: &str) -> RemotePath {
    RemotePath::parse(p).unwrap()
}

fn auth() -> Matcher {
    Matcher::UrlEncoded("auth".into(), "token".into())
}

#[tokio::test]
async fn read_existing_and_missing_nodes() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/gbox-admin/screenOptions.json")
        .match_query(auth())
        .with_status(200)
        .with_body(r#"{"itemsPerPage":50}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/gbox-admin/missing.json")
        .match_query(auth())
        .with_status(200)
        .with_body("null")
        .create_async()
        .await;

    let db = store(&server);
    assert_eq!(
        db.read(&path("gbox-admin/screenOptions")).await.unwrap(),
        Some(json!({"itemsPerPage": 50}))
    );
    assert_eq!(db.read(&path("gbox-admin/missing")).await.unwrap(), None);
}

#[tokio::test]
async fn write_puts_value_and_none_deletes() {
    let mut server = Server::new_async().await;
    let put = server
        .mock("PUT", "/syncedStorage/app-settings.json")
        .match_query(auth())
        .match_body(Matcher::Json(json!("a")))
        .with_status(200)
        .with_body(r#""a""#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/syncedStorage/app-settings.json")
        .match_query(auth())
        .with_status(200)
        .with_body("null")
        .expect(2)
        .create_async()
        .await;

    let db = store(&server);
    let target = path("syncedStorage/app-settings");
    db.write(&target, Some(json!("a"))).await.unwrap();
    db.write(&target, None).await.unwrap();
    db.write(&target, Some(Value::Null)).await.unwrap();

    put.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn update_patches_children() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", "/syncedStorage.json")
        .match_query(auth())
        .match_body(Matcher::Json(json!({"app-a": "1", "app-b": null})))
        .with_status(200)
        .with_body(r#"{"app-a":"1"}"#)
        .create_async()
        .await;

    let mut children = Map::new();
    children.insert("app-a".into(), json!("1"));
    children.insert("app-b".into(), Value::Null);
    store(&server)
        .update(&path("syncedStorage"), children)
        .await
        .unwrap();
    patch.assert_async().await;
}

#[tokio::test]
async fn error_status_carries_database_message() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/locked.json")
        .match_query(auth())
        .with_status(401)
        .with_body(r#"{"error":"Permission denied"}"#)
        .create_async()
        .await;

    let err = store(&server)
        .write(&path("locked"), Some(json!(1)))
        .await
        .unwrap_err();
    match err {
        RemoteError::Rejected { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Permission denied");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

fn recording() -> (Arc<Mutex<Vec<Option<Value>>>>, SnapshotListener) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Arc::new(move |value: Option<Value>| sink.lock().push(value)))
}

#[tokio::test]
async fn stream_delivers_full_node_for_put_and_patch() {
    let mut server = Server::new_async().await;
    let body = concat!(
        "event: put\r\n",
        "data: {\"path\":\"/\",\"data\":{\"app-a\":\"1\"}}\r\n\r\n",
        "event: keep-alive\r\n",
        "data: null\r\n\r\n",
        "event: put\n",
        "data: {\"path\":\"/app-b\",\"data\":\"2\"}\n\n",
        "event: patch\n",
        "data: {\"path\":\"/\",\"data\":{\"app-a\":null}}\n\n",
    );
    server
        .mock("GET", "/syncedStorage.json")
        .match_query(auth())
        .match_header("accept", "text/event-stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let (seen, listener) = recording();
    let _subscription = store(&server)
        .subscribe(&path("syncedStorage"), listener)
        .unwrap();

    let probe = seen.clone();
    assert!(wait_until(WAIT_TIMEOUT, || probe.lock().len() >= 3).await);
    assert_eq!(
        *seen.lock(),
        vec![
            Some(json!({"app-a": "1"})),
            Some(json!({"app-a": "1", "app-b": "2"})),
            Some(json!({"app-b": "2"})),
        ]
    );
}

#[tokio::test]
async fn cancel_ends_stream_without_reconnect() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/private.json")
        .match_query(auth())
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("event: put\ndata: {\"path\":\"/\",\"data\":null}\n\nevent: cancel\ndata: null\n\n")
        .expect(1)
        .create_async()
        .await;

    let db = FirebaseRemoteStore::new(
        FirebaseConfig::new(server.url())
            .with_auth("token")
            .with_reconnect_delay(Duration::from_millis(10)),
    )
    .unwrap();
    let (seen, listener) = recording();
    let _subscription = db.subscribe(&path("private"), listener).unwrap();

    let probe = seen.clone();
    assert!(wait_until(WAIT_TIMEOUT, || !probe.lock().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    mock.assert_async().await;
    assert_eq!(*seen.lock(), vec![None]);
}
