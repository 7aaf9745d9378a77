//! Long-running storage mirror session
//!
//! The data file is the session's local store. Other processes (the other
//! commands of this binary) change it on disk, so the session re-reads it on
//! a fixed interval and lets the mirror push whatever changed.

use crate::config::AppConfig;
use anyhow::Context;
use orderdesk_firebase::FirebaseRemoteStore;
use orderdesk_mirror::{MirrorStats, StorageMirror};
use orderdesk_storage::{FileLocalStore, RemoteStore};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

/// Mirror the configured data file with the configured database until Ctrl-C
///
/// # Errors
/// Returns error if the data file, the database settings or the mirror
/// configuration are unusable
pub async fn run(config: &AppConfig, host: Option<&str>, out: &mut dyn Write) -> anyhow::Result<()> {
    let local = Arc::new(FileLocalStore::open(&config.data_file).with_context(|| {
        format!("failed to open data file {}", config.data_file.display())
    })?);
    let remote = FirebaseRemoteStore::new(config.firebase_config()?)
        .context("failed to set up remote database client")?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C, stopping");
        }
    };
    run_until(config, host, local, Arc::new(remote), shutdown, out).await?;
    Ok(())
}

/// Mirror `local` with `remote` until `shutdown` completes
///
/// # Errors
/// Returns error if the mirror cannot start
pub async fn run_until(
    config: &AppConfig,
    host: Option<&str>,
    local: Arc<FileLocalStore>,
    remote: Arc<dyn RemoteStore>,
    shutdown: impl Future<Output = ()>,
    out: &mut dyn Write,
) -> anyhow::Result<MirrorStats> {
    let host = host.unwrap_or(&config.session_host);
    let handle = StorageMirror::new(local.clone(), remote, config.mirror.clone())
        .for_host(host)
        .start()
        .await
        .context("failed to start storage mirror")?;
    writeln!(
        out,
        "Mirroring {} as {} ({}), press Ctrl-C to stop",
        local.path().display(),
        host,
        handle.role()
    )?;

    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Err(e) = local.reload() {
                    tracing::warn!(error = %e, "failed to re-read data file");
                }
            }
        }
    }

    let stats = handle.stop().await;
    tracing::info!(?stats, "storage mirror stopped");
    writeln!(
        out,
        "Stopped: {} pulled, {} removed, {} pushed",
        stats.pulled_writes, stats.pulled_deletes, stats.pushed
    )?;
    Ok(stats)
}
