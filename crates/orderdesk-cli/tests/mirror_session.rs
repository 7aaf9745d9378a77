//! Mirror session over a data file shared with other processes

use orderdesk_cli::session::run_until;
use orderdesk_cli::AppConfig;
use orderdesk_storage::{FileLocalStore, LocalStore, MemoryRemoteStore, RemotePath, RemoteStore};
use orderdesk_test_utils::{wait_until, WAIT_TIMEOUT};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;

fn config(data_file: &Path) -> AppConfig {
    AppConfig {
        data_file: data_file.to_path_buf(),
        poll_interval_ms: 20,
        ..AppConfig::default()
    }
}

fn entry(key: &str) -> RemotePath {
    RemotePath::parse(&format!("syncedStorage/app-{key}")).unwrap()
}

#[tokio::test]
async fn admin_session_pushes_file_changes_and_pulls_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.json");
    let config = config(&path);

    let remote = Arc::new(MemoryRemoteStore::new());
    remote
        .write(&entry("theme"), Some(json!("dark")))
        .await
        .unwrap();
    let local = Arc::new(FileLocalStore::open(&path).unwrap());
    let (stop, stopped) = oneshot::channel::<()>();

    let driver = async {
        let pulled = wait_until(WAIT_TIMEOUT, || {
            FileLocalStore::open(&path)
                .map(|file| file.get("theme").as_deref() == Some("dark"))
                .unwrap_or(false)
        })
        .await;

        // Another process writes the same file.
        let other = FileLocalStore::open(&path).unwrap();
        other.set("woocommerce_stores", "[]").unwrap();
        let probe = remote.clone();
        let pushed = wait_until(WAIT_TIMEOUT, || {
            probe.value(&entry("woocommerce_stores")) == Some(json!("[]"))
        })
        .await;

        let _ = stop.send(());
        (pulled, pushed)
    };

    let mut out = Vec::new();
    let remote_store: Arc<dyn RemoteStore> = remote.clone();
    let shutdown = async {
        let _ = stopped.await;
    };
    let (stats, (pulled, pushed)) = tokio::join!(
        run_until(&config, None, local, remote_store, shutdown, &mut out),
        driver
    );

    assert!(pulled);
    assert!(pushed);
    let stats = stats.unwrap();
    assert_eq!(stats.pulled_writes, 1);
    assert!(stats.pushed >= 1);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("(admin)"));
    assert!(printed.contains("Stopped:"));
}

#[tokio::test]
async fn viewer_session_never_pushes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.json");
    let config = config(&path);

    let remote = Arc::new(MemoryRemoteStore::new());
    let local = Arc::new(FileLocalStore::open(&path).unwrap());
    local.set("theme", "light").unwrap();

    let shutdown = tokio::time::sleep(std::time::Duration::from_millis(100));
    let mut out = Vec::new();
    let stats = run_until(
        &config,
        Some("https://shop.example"),
        local,
        remote.clone(),
        shutdown,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(stats.pushed, 0);
    assert_eq!(remote.value(&entry("theme")), None);
    assert!(String::from_utf8(out).unwrap().contains("(viewer)"));
}
