//! Command handlers end to end, over in-memory stores and mock store back ends

use chrono::Utc;
use mockito::{Matcher, Server};
use orderdesk_cli::cli::command;
use orderdesk_cli::{App, AppConfig};
use orderdesk_orders::{NewStore, OrderStatus, OrdersError, Store};
use orderdesk_storage::{MemoryLocalStore, MemoryRemoteStore, RemotePath};
use orderdesk_test_utils::{order_json, sample_order};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn app() -> App {
    App::new(AppConfig::default(), Arc::new(MemoryLocalStore::new()))
}

async fn run(app: &App, args: &[&str]) -> anyhow::Result<String> {
    let argv = std::iter::once("orderdesk").chain(args.iter().copied());
    let matches = command().try_get_matches_from(argv)?;
    let mut out = Vec::new();
    app.run(&matches, &mut out).await?;
    Ok(String::from_utf8(out)?)
}

fn register(app: &App, url: &str) -> Store {
    app.registry()
        .add(NewStore::new("Lisbon", url, "ck_1", "cs_1"))
        .unwrap()
}

#[tokio::test]
async fn store_lifecycle_without_network() {
    let app = app();
    let added = run(
        &app,
        &[
            "store", "add", "--name", "Lisbon", "--url", "https://lx.example", "--key", "ck",
            "--secret", "cs", "--no-test",
        ],
    )
    .await
    .unwrap();
    assert!(added.starts_with("Added store Lisbon"));

    let id = app.registry().list().unwrap()[0].id.clone();
    let listed = run(&app, &["store", "list"]).await.unwrap();
    assert!(listed.contains(&id));
    assert!(listed.contains("connected"));
    assert!(listed.contains("never"));

    run(&app, &["store", "edit", &id, "--name", "Porto"]).await.unwrap();
    assert_eq!(app.registry().require(&id).unwrap().name, "Porto");

    let removed = run(&app, &["store", "remove", &id]).await.unwrap();
    assert_eq!(removed, "Removed store Porto\n");

    let err = run(&app, &["store", "remove", &id]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OrdersError>(),
        Some(OrdersError::StoreNotFound(_))
    ));
    assert_eq!(run(&app, &["store", "list"]).await.unwrap(), "No stores registered\n");
}

#[tokio::test]
async fn store_add_checks_connection_first() {
    let mut server = Server::new_async().await;
    let denied = server
        .mock("GET", "/wp-json/wc/v3/system_status")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"Consumer key is invalid."}"#)
        .create_async()
        .await;

    let app = app();
    let url = server.url();
    let args = [
        "store",
        "add",
        "--name",
        "Lisbon",
        "--url",
        url.as_str(),
        "--key",
        "ck",
        "--secret",
        "cs",
    ];
    let err = run(&app, &args).await.unwrap_err();
    assert!(format!("{err:#}").contains("Consumer key is invalid."));
    assert!(app.registry().list().unwrap().is_empty());
    denied.remove_async().await;

    server
        .mock("GET", "/wp-json/wc/v3/system_status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"environment":{"version":"8.9.1"}}"#)
        .create_async()
        .await;
    run(&app, &args).await.unwrap();
    assert_eq!(app.registry().list().unwrap().len(), 1);
}

#[tokio::test]
async fn sync_list_and_export() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/wp-json/wc/v3/orders")
        .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([order_json(1, "processing"), order_json(2, "on-hold")]).to_string())
        .create_async()
        .await;

    let app = app();
    let store = register(&app, &server.url());

    let synced = run(&app, &["sync"]).await.unwrap();
    assert!(synced.contains("Lisbon: 2 orders"));
    assert!(synced.contains("Synced 1 of 1 stores, 2 orders"));
    assert!(app.registry().require(&store.id).unwrap().last_sync.is_some());

    let listed = run(&app, &["orders", "list"]).await.unwrap();
    assert!(listed.contains(&format!("{}-1 | Lisbon", store.id)));
    assert!(listed.contains("(repeat phone)"));
    assert!(listed.contains("Showing 1-2 of 2 (page 1/1)"));
    assert!(listed.contains("Revenue 39.98 EUR"));

    let on_hold = run(&app, &["orders", "list", "--status", "on-hold"]).await.unwrap();
    assert!(on_hold.contains("Showing 1-1 of 1"));
    assert!(!on_hold.contains(&format!("{}-1 |", store.id)));

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("orders.csv");
    let key = format!("{}-2", store.id);
    let exported = run(&app, &["export", "-o", file.to_str().unwrap(), &key])
        .await
        .unwrap();
    assert!(exported.starts_with("Exported 1 orders"));

    let csv = std::fs::read_to_string(&file).unwrap();
    assert!(csv.starts_with('\u{feff}'));
    assert_eq!(csv.lines().count(), 2);
}

#[tokio::test]
async fn set_status_updates_the_book() {
    let mut server = Server::new_async().await;
    let batch = server
        .mock("POST", "/wp-json/wc/v3/orders/batch")
        .match_body(Matcher::Json(json!({"update": [{"id": 5, "status": "completed"}]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"update": [order_json(5, "completed")]}).to_string())
        .create_async()
        .await;

    let app = app();
    let store = register(&app, &server.url());
    app.book()
        .replace_for_store(&store, vec![sample_order(5, "processing", Utc::now())])
        .unwrap();

    let key = format!("{}-5", store.id);
    let output = run(&app, &["orders", "set-status", "--status", "completed", &key])
        .await
        .unwrap();
    batch.assert_async().await;
    assert_eq!(output, "Updated 1 orders to completed, 0 failed\n");
    assert_eq!(
        app.book().load().unwrap()[0].status_kind(),
        Some(OrderStatus::Completed)
    );
}

#[tokio::test]
async fn edit_rejects_unknown_billing_field() {
    let err = run(
        &app(),
        &["orders", "edit", "--store", "1", "--order", "5", "--field", "nickname", "--value", "x"],
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("unknown billing field"));
}

#[tokio::test]
async fn export_without_orders_fails() {
    let err = run(&app(), &["export", "-o", "unused.csv"]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OrdersError>(),
        Some(OrdersError::NothingToExport)
    ));
}

#[tokio::test]
async fn screen_options_are_shared_through_the_remote() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let mut config = AppConfig::default();
    config.remote.root = Some("gbox-admin".into());
    let app = App::new(config, Arc::new(MemoryLocalStore::new())).with_remote(remote.clone());

    let shown = run(&app, &["options", "set-per-page", "1"]).await.unwrap();
    assert!(shown.starts_with("Items per page: 1\n"));
    let stored = remote
        .value(&RemotePath::parse("gbox-admin/screenOptions").unwrap())
        .unwrap();
    assert_eq!(stored["itemsPerPage"], json!(1));

    let hidden = run(&app, &["options", "set-columns", "--hide", "billing,total"])
        .await
        .unwrap();
    assert!(hidden.contains("Hidden columns: billing, total"));
    assert!(run(&app, &["options", "set-per-page", "0"]).await.is_err());
    assert!(run(&app, &["options", "set-columns", "--show", "nope"]).await.is_err());

    let store = register(&app, "https://lx.example");
    app.book()
        .replace_for_store(
            &store,
            vec![
                sample_order(1, "processing", Utc::now()),
                sample_order(2, "completed", Utc::now()),
            ],
        )
        .unwrap();
    let listed = run(&app, &["orders", "list"]).await.unwrap();
    assert!(listed.contains("Showing 1-1 of 2 (page 1/2)"));
    assert!(!listed.contains("BILLING"));
}
