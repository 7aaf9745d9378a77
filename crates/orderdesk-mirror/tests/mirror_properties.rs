//! Behavioral properties of the storage mirror against in-memory stores

use orderdesk_mirror::{MirrorConfig, MirrorHandle, MirrorRole, StorageMirror};
use orderdesk_storage::{LocalStore, MemoryLocalStore};
use orderdesk_test_utils::{wait_until, RecordedCall, RecordingRemoteStore, WAIT_TIMEOUT};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

async fn start(
    local: &Arc<MemoryLocalStore>,
    remote: &Arc<RecordingRemoteStore>,
    role: MirrorRole,
) -> MirrorHandle {
    StorageMirror::new(local.clone(), remote.clone(), MirrorConfig::default())
        .with_role(role)
        .start()
        .await
        .unwrap()
}

/// Drain queued events, including those produced while draining
async fn settle(handle: &MirrorHandle) {
    for _ in 0..4 {
        handle.flush().await.unwrap();
    }
}

fn writes_to(remote: &RecordingRemoteStore, key: &str) -> Vec<Option<Value>> {
    remote
        .calls_to(&format!("syncedStorage/app-{key}"))
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::Write { value, .. } => Some(value),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn end_to_end_seed_then_remote_push() {
    let local = Arc::new(MemoryLocalStore::with_entries([("settings", "a")]));
    let remote = Arc::new(RecordingRemoteStore::new());

    let handle = start(&local, &remote, MirrorRole::Admin).await;
    settle(&handle).await;

    assert_eq!(
        remote.calls(),
        vec![RecordedCall::Write {
            path: "syncedStorage/app-settings".to_string(),
            value: Some(json!("a")),
        }]
    );

    remote
        .remote_write("syncedStorage/app-settings", Some(json!("b")))
        .await;
    settle(&handle).await;

    assert_eq!(local.get("settings").as_deref(), Some("b"));
    assert_eq!(writes_to(&remote, "settings"), vec![Some(json!("a"))]);
    handle.stop().await;
}

#[tokio::test]
async fn convergence_admin_local_write_reaches_remote() {
    let local = Arc::new(MemoryLocalStore::new());
    let remote = Arc::new(RecordingRemoteStore::new());
    let handle = start(&local, &remote, MirrorRole::Admin).await;

    local.set("theme", "dark").unwrap();

    let remote_probe = remote.clone();
    assert!(
        wait_until(WAIT_TIMEOUT, || {
            remote_probe.value("syncedStorage/app-theme") == Some(json!("dark"))
        })
        .await
    );
    handle.stop().await;
}

#[tokio::test]
async fn pull_propagation_updates_differing_local_value() {
    let local = Arc::new(MemoryLocalStore::with_entries([("theme", "light")]));
    let remote = Arc::new(RecordingRemoteStore::new());
    let handle = start(&local, &remote, MirrorRole::Viewer).await;

    remote
        .remote_write("syncedStorage/app-theme", Some(json!("dark")))
        .await;
    settle(&handle).await;

    assert_eq!(local.get("theme").as_deref(), Some("dark"));
    handle.stop().await;
}

#[tokio::test]
async fn no_echo_for_remote_originated_change() {
    let local = Arc::new(MemoryLocalStore::new());
    let remote = Arc::new(RecordingRemoteStore::new());
    let handle = start(&local, &remote, MirrorRole::Admin).await;
    settle(&handle).await;

    remote
        .remote_write("syncedStorage/app-orders", Some(json!("[1,2]")))
        .await;
    settle(&handle).await;

    assert_eq!(local.get("orders").as_deref(), Some("[1,2]"));
    assert!(remote.calls().is_empty(), "unexpected writes: {:?}", remote.calls());
    assert_eq!(handle.stats().suppressed, 1);
    handle.stop().await;
}

#[tokio::test]
async fn delete_propagation_without_tombstone_write() {
    let local = Arc::new(MemoryLocalStore::new());
    let remote = Arc::new(RecordingRemoteStore::with_value(json!({
        "syncedStorage": {"app-draft": "x", "app-keep": "y"}
    })));
    let handle = start(&local, &remote, MirrorRole::Admin).await;
    settle(&handle).await;
    assert_eq!(local.get("draft").as_deref(), Some("x"));

    remote.remote_write("syncedStorage/app-draft", None).await;
    settle(&handle).await;

    assert_eq!(local.get("draft"), None);
    assert_eq!(local.get("keep").as_deref(), Some("y"));
    assert!(writes_to(&remote, "draft").is_empty());
    assert_eq!(handle.stats().pulled_deletes, 1);
    handle.stop().await;
}

#[tokio::test]
async fn whole_container_removal_clears_known_keys_only() {
    let local = Arc::new(MemoryLocalStore::with_entries([("local-only", "1")]));
    let remote = Arc::new(RecordingRemoteStore::with_value(json!({
        "syncedStorage": {"app-shared": "s"}
    })));
    let handle = start(&local, &remote, MirrorRole::Viewer).await;
    settle(&handle).await;

    remote.remote_write("syncedStorage", None).await;
    settle(&handle).await;

    assert_eq!(local.get("shared"), None);
    assert_eq!(local.get("local-only").as_deref(), Some("1"));
    handle.stop().await;
}

#[tokio::test]
async fn reserved_prefix_keys_excluded_both_ways() {
    let local = Arc::new(MemoryLocalStore::with_entries([
        ("firebase:host:db", "token"),
        ("settings", "a"),
    ]));
    let remote = Arc::new(RecordingRemoteStore::with_value(json!({
        "syncedStorage": {"app-firebase:session": "remote-secret"}
    })));
    let handle = start(&local, &remote, MirrorRole::Admin).await;
    settle(&handle).await;

    local.set("firebase:host:db", "rotated").unwrap();
    settle(&handle).await;

    assert!(remote
        .calls()
        .iter()
        .all(|call| !call.path().contains("firebase:")));
    assert_eq!(local.get("firebase:session"), None);
    assert_eq!(local.get("firebase:host:db").as_deref(), Some("rotated"));
    handle.stop().await;
}

#[tokio::test]
async fn viewer_never_pushes_but_still_pulls() {
    let local = Arc::new(MemoryLocalStore::with_entries([("a", "1")]));
    let remote = Arc::new(RecordingRemoteStore::new());
    let handle = start(&local, &remote, MirrorRole::Viewer).await;

    for i in 0..10 {
        local.set("a", &i.to_string()).unwrap();
        local.set(&format!("k{i}"), "v").unwrap();
    }
    local.remove("a").unwrap();
    settle(&handle).await;
    assert!(remote.calls().is_empty());

    remote
        .remote_write("syncedStorage/app-pulled", Some(json!("yes")))
        .await;
    settle(&handle).await;
    assert_eq!(local.get("pulled").as_deref(), Some("yes"));

    let stats = handle.stop().await;
    assert_eq!(stats.pushed, 0);
    assert_eq!(stats.seeded, 0);
}

#[tokio::test]
async fn admin_start_seeds_every_local_key() {
    let local = Arc::new(MemoryLocalStore::with_entries([
        ("woocommerce_stores", "[]"),
        ("woocommerce_orders", "[]"),
        ("theme", "dark"),
        ("firebase:internal", "skip"),
    ]));
    let remote = Arc::new(RecordingRemoteStore::new());
    let handle = start(&local, &remote, MirrorRole::Admin).await;
    settle(&handle).await;

    assert_eq!(
        remote.value("syncedStorage"),
        Some(json!({
            "app-woocommerce_stores": "[]",
            "app-woocommerce_orders": "[]",
            "app-theme": "dark",
        }))
    );
    assert_eq!(handle.stats().seeded, 3);
    handle.stop().await;
}

#[tokio::test]
async fn admin_seed_wins_over_stale_remote_value() {
    let local = Arc::new(MemoryLocalStore::with_entries([("theme", "dark")]));
    let remote = Arc::new(RecordingRemoteStore::with_value(json!({
        "syncedStorage": {"app-theme": "light", "app-extra": "e"}
    })));
    let handle = start(&local, &remote, MirrorRole::Admin).await;
    settle(&handle).await;

    assert_eq!(local.get("theme").as_deref(), Some("dark"));
    assert_eq!(local.get("extra").as_deref(), Some("e"));
    assert_eq!(remote.value("syncedStorage/app-theme"), Some(json!("dark")));
    handle.stop().await;
}

#[tokio::test]
async fn local_removal_pushes_null() {
    let local = Arc::new(MemoryLocalStore::with_entries([("draft", "x")]));
    let remote = Arc::new(RecordingRemoteStore::new());
    let handle = start(&local, &remote, MirrorRole::Admin).await;
    settle(&handle).await;

    local.remove("draft").unwrap();
    settle(&handle).await;

    assert_eq!(writes_to(&remote, "draft"), vec![Some(json!("x")), None]);
    assert_eq!(remote.value("syncedStorage/app-draft"), None);
    handle.stop().await;
}

#[tokio::test]
async fn custom_container_and_prefix() {
    let local = Arc::new(MemoryLocalStore::with_entries([("k", "v")]));
    let remote = Arc::new(RecordingRemoteStore::new());
    let config = MirrorConfig::default()
        .with_container("gbox-admin/mirror")
        .with_prefix("m_");

    let handle = StorageMirror::new(local, remote.clone(), config)
        .for_host("localhost:5173")
        .start()
        .await
        .unwrap();
    settle(&handle).await;

    assert_eq!(handle.role(), MirrorRole::Admin);
    assert_eq!(remote.value("gbox-admin/mirror/m_k"), Some(json!("v")));
    handle.stop().await;
}

#[tokio::test]
async fn two_admin_sessions_converge() {
    let remote = Arc::new(RecordingRemoteStore::new());
    let first_local = Arc::new(MemoryLocalStore::with_entries([("a", "1")]));
    let second_local = Arc::new(MemoryLocalStore::new());

    let first = start(&first_local, &remote, MirrorRole::Admin).await;
    let second = start(&second_local, &remote, MirrorRole::Admin).await;
    settle(&first).await;
    settle(&second).await;
    assert_eq!(second_local.get("a").as_deref(), Some("1"));

    second_local.set("b", "2").unwrap();
    settle(&second).await;
    settle(&first).await;

    assert_eq!(first_local.get("b").as_deref(), Some("2"));
    assert_eq!(writes_to(&remote, "b").len(), 1);
    first.stop().await;
    second.stop().await;
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn seeded_container_matches_local_store(
        entries in proptest::collection::btree_map("[a-z][a-z0-9_]{0,8}", "[ -~]{0,16}", 0..8)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let container = runtime.block_on(async {
            let local = Arc::new(MemoryLocalStore::with_entries(entries.clone()));
            let remote = Arc::new(RecordingRemoteStore::new());
            let handle = start(&local, &remote, MirrorRole::Admin).await;
            settle(&handle).await;
            handle.stop().await;
            remote.value("syncedStorage")
        });

        let expected: BTreeMap<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (format!("app-{k}"), Value::String(v)))
            .collect();
        let actual: BTreeMap<String, Value> = container
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        prop_assert_eq!(actual, expected);
    }
}
