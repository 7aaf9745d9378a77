//! Storage mirror
//!
//! Keeps the non-reserved keys of a [`LocalStore`] in agreement with one
//! container node of a [`RemoteStore`]:
//! - every session pulls: container snapshots are applied to local keys
//! - admin sessions push: each local change is written to its single entry
//! - admin sessions seed every local key when they start
//!
//! All decisions are made on one task draining a FIFO event queue; the
//! store callbacks only enqueue. Every local write made while applying a
//! snapshot is remembered as an expected echo `(key, value)`; only a change
//! event matching one is dropped. Expectations of a snapshot are forgotten
//! by an event queued behind the notifications its writes produced. A
//! snapshot never overwrites a key whose own local change is still queued:
//! that change is pushed instead and the container follows it.
//!
//! Outbound writes are handed in order to a separate writer task. Remote
//! failures are logged and dropped.

use crate::config::MirrorConfig;
use crate::entry;
use crate::error::MirrorError;
use crate::role::MirrorRole;
use orderdesk_storage::{LocalStore, RemotePath, RemoteStore, StorageChange, Subscription};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Mirror activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    /// Local keys written from remote entries
    pub pulled_writes: usize,
    /// Local keys removed because their entry disappeared or became null
    pub pulled_deletes: usize,
    /// Local changes written to the container
    pub pushed: usize,
    /// Local changes ignored because the mirror itself made them
    pub suppressed: usize,
    /// Remote entries not applied because a newer local change was queued
    pub deferred: usize,
    /// Keys written by the start-up seed
    pub seeded: usize,
    /// Keys that cannot be named in the container
    pub skipped_keys: usize,
    /// Outbound writes the remote store rejected
    pub failed_writes: usize,
}

#[derive(Debug)]
enum MirrorEvent {
    RemoteSnapshot(Option<Value>),
    LocalChange(StorageChange),
    /// Every change event of this snapshot batch has been queued before it
    ForgetEchoes(u64),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

#[derive(Debug)]
enum WriterCommand {
    Write {
        path: RemotePath,
        value: Option<Value>,
    },
    Flush(oneshot::Sender<()>),
}

/// Mirror between a local store and a remote container, ready to start
pub struct StorageMirror {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    config: MirrorConfig,
    role: MirrorRole,
}

impl std::fmt::Debug for StorageMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageMirror")
            .field("config", &self.config)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl StorageMirror {
    /// Create new mirror with the viewer role
    #[must_use]
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        config: MirrorConfig,
    ) -> Self {
        Self {
            local,
            remote,
            config,
            role: MirrorRole::Viewer,
        }
    }

    /// Use a fixed role
    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: MirrorRole) -> Self {
        self.role = role;
        self
    }

    /// Derive the role from the session address
    #[must_use]
    pub fn for_host(self, address: &str) -> Self {
        let role = MirrorRole::from_host(address, &self.config);
        self.with_role(role)
    }

    /// Role this mirror will run with
    #[inline]
    #[must_use]
    pub fn role(&self) -> MirrorRole {
        self.role
    }

    /// Start mirroring
    ///
    /// Admin sessions subscribe to local changes and seed the container
    /// first. Every session then applies one full read of the container and
    /// subscribes to it. Remote failures during start are logged; the mirror
    /// still runs with whatever succeeded.
    ///
    /// # Errors
    /// Returns error if the configuration cannot address the container
    pub async fn start(self) -> Result<MirrorHandle, MirrorError> {
        self.config.validate()?;
        let container = self.config.container_path()?;
        let reserved = self
            .config
            .reserved_prefix
            .clone()
            .unwrap_or_else(|| self.remote.reserved_prefix().to_string());

        let stats = Arc::new(Mutex::new(MirrorStats::default()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(self.remote.clone(), writer_rx, stats.clone()));

        let outbound = Outbound {
            container: container.clone(),
            prefix: self.config.prefix.clone(),
            reserved,
            writer: writer_tx,
            stats: stats.clone(),
        };

        let queued = QueuedChanges::default();
        let local_sub = if self.role.is_admin() {
            let tx = events_tx.clone();
            let counts = queued.clone();
            let sub = self.local.subscribe(Arc::new(move |change: &StorageChange| {
                counts.enqueue(&change.key);
                if tx.send(MirrorEvent::LocalChange(change.clone())).is_err() {
                    counts.dequeue(&change.key);
                }
            }));
            let seeded = outbound.seed(self.local.as_ref());
            if seeded > 0 {
                outbound.settle().await;
            }
            Some(sub)
        } else {
            None
        };

        match self.remote.read(&container).await {
            Ok(snapshot) => {
                let _ = events_tx.send(MirrorEvent::RemoteSnapshot(snapshot));
            }
            Err(e) => {
                tracing::warn!(container = %container, error = %e, "initial container read failed");
            }
        }

        let tx = events_tx.clone();
        let remote_sub = match self.remote.subscribe(
            &container,
            Arc::new(move |snapshot| {
                let _ = tx.send(MirrorEvent::RemoteSnapshot(snapshot));
            }),
        ) {
            Ok(sub) => Some(sub),
            Err(e) => {
                tracing::warn!(container = %container, error = %e, "container subscription failed");
                None
            }
        };

        let state = MirrorLoop {
            local: self.local,
            outbound,
            queued,
            echoes: Vec::new(),
            batch: 0,
            known_entries: BTreeSet::new(),
            events: events_tx.downgrade(),
        };
        let task = tokio::spawn(state.run(events_rx));

        tracing::info!(role = %self.role, container = %container, "storage mirror started");

        Ok(MirrorHandle {
            role: self.role,
            events: events_tx,
            local_sub,
            remote_sub,
            task,
            stats,
        })
    }
}

/// Running mirror
///
/// Dropping the handle unsubscribes both sides and lets the event loop
/// finish; [`MirrorHandle::stop`] does the same and waits for it.
#[derive(Debug)]
pub struct MirrorHandle {
    role: MirrorRole,
    events: mpsc::UnboundedSender<MirrorEvent>,
    local_sub: Option<Subscription>,
    remote_sub: Option<Subscription>,
    task: JoinHandle<()>,
    stats: Arc<Mutex<MirrorStats>>,
}

impl MirrorHandle {
    /// Role the mirror runs with
    #[inline]
    #[must_use]
    pub fn role(&self) -> MirrorRole {
        self.role
    }

    /// Check if the local side is subscribed
    #[inline]
    #[must_use]
    pub fn is_pushing(&self) -> bool {
        self.local_sub.is_some()
    }

    /// Check if the remote side is subscribed
    #[inline]
    #[must_use]
    pub fn is_pulling(&self) -> bool {
        self.remote_sub.is_some()
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> MirrorStats {
        *self.stats.lock()
    }

    /// Wait until every event queued so far is handled and every remote
    /// write it caused has completed
    ///
    /// # Errors
    /// Returns error if the mirror has stopped
    pub async fn flush(&self) -> Result<(), MirrorError> {
        let (ack, done) = oneshot::channel();
        self.events
            .send(MirrorEvent::Flush(ack))
            .map_err(|_| MirrorError::Stopped)?;
        done.await.map_err(|_| MirrorError::Stopped)
    }

    /// Unsubscribe both sides and wait for the event loop to finish
    ///
    /// Writes already handed to the writer are not aborted.
    pub async fn stop(self) -> MirrorStats {
        let Self {
            role,
            events,
            local_sub,
            remote_sub,
            task,
            stats,
        } = self;

        if let Some(sub) = local_sub {
            sub.cancel();
        }
        if let Some(sub) = remote_sub {
            sub.cancel();
        }
        let _ = events.send(MirrorEvent::Shutdown);
        drop(events);

        if let Err(e) = task.await {
            tracing::warn!(error = %e, "mirror event loop ended abnormally");
        }

        let stats = *stats.lock();
        tracing::info!(role = %role, ?stats, "storage mirror stopped");
        stats
    }
}

/// Path rules and the outbound writer queue
struct Outbound {
    container: RemotePath,
    prefix: String,
    reserved: String,
    writer: mpsc::UnboundedSender<WriterCommand>,
    stats: Arc<Mutex<MirrorStats>>,
}

impl Outbound {
    fn is_reserved(&self, key: &str) -> bool {
        key.starts_with(self.reserved.as_str())
    }

    /// Entry path for a local key, `None` when the key is not mirrored
    fn path_for(&self, key: &str) -> Option<RemotePath> {
        if self.is_reserved(key) {
            tracing::trace!(key, "reserved key not mirrored");
            return None;
        }
        if key.is_empty() {
            self.stats.lock().skipped_keys += 1;
            tracing::warn!("empty local key cannot be mirrored");
            return None;
        }
        match self.container.child(&entry::entry_name(&self.prefix, key)) {
            Ok(path) => Some(path),
            Err(e) => {
                self.stats.lock().skipped_keys += 1;
                tracing::warn!(key, error = %e, "local key cannot be mirrored, skipping");
                None
            }
        }
    }

    fn write(&self, path: RemotePath, value: Option<Value>) {
        if self.writer.send(WriterCommand::Write { path, value }).is_err() {
            tracing::warn!("remote writer stopped, dropping write");
        }
    }

    fn flush(&self, ack: oneshot::Sender<()>) {
        let _ = self.writer.send(WriterCommand::Flush(ack));
    }

    async fn settle(&self) {
        let (ack, done) = oneshot::channel();
        self.flush(ack);
        let _ = done.await;
    }

    /// Write every mirrored local key to its entry
    fn seed(&self, local: &dyn LocalStore) -> usize {
        let mut seeded = 0;
        for key in local.keys() {
            let Some(path) = self.path_for(&key) else {
                continue;
            };
            let Some(value) = local.get(&key) else {
                continue;
            };
            self.write(path, entry::encode(Some(&value)));
            seeded += 1;
        }
        self.stats.lock().seeded += seeded;
        tracing::debug!(seeded, "seeded remote container from local store");
        seeded
    }
}

/// Local change events sent to the loop and not yet handled, per key
#[derive(Clone, Default)]
struct QueuedChanges(Arc<Mutex<HashMap<String, usize>>>);

impl QueuedChanges {
    fn enqueue(&self, key: &str) {
        *self.0.lock().entry(key.to_string()).or_insert(0) += 1;
    }

    fn dequeue(&self, key: &str) {
        let mut counts = self.0.lock();
        if let Some(count) = counts.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                counts.remove(key);
            }
        }
    }

    fn count(&self, key: &str) -> usize {
        self.0.lock().get(key).copied().unwrap_or(0)
    }
}

/// Local write made by the mirror whose change event has not been seen yet
struct Echo {
    batch: u64,
    key: String,
    value: Option<String>,
}

/// State owned by the event loop task
struct MirrorLoop {
    local: Arc<dyn LocalStore>,
    outbound: Outbound,
    queued: QueuedChanges,
    /// Expected echoes, oldest first
    echoes: Vec<Echo>,
    /// Number of the snapshot batch being applied
    batch: u64,
    /// Mirrored entry names present in the last snapshot
    known_entries: BTreeSet<String>,
    events: mpsc::WeakUnboundedSender<MirrorEvent>,
}

impl MirrorLoop {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<MirrorEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                MirrorEvent::RemoteSnapshot(snapshot) => self.apply_snapshot(snapshot),
                MirrorEvent::LocalChange(change) => {
                    self.queued.dequeue(&change.key);
                    self.push_change(&change);
                }
                MirrorEvent::ForgetEchoes(batch) => self.echoes.retain(|echo| echo.batch > batch),
                MirrorEvent::Flush(ack) => self.outbound.flush(ack),
                MirrorEvent::Shutdown => break,
            }
        }
        tracing::debug!("mirror event loop finished");
    }

    fn apply_snapshot(&mut self, snapshot: Option<Value>) {
        let entries = match snapshot {
            None => Map::new(),
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                tracing::warn!(
                    container = %self.outbound.container,
                    "mirrored container is not an object, treating it as empty"
                );
                Map::new()
            }
        };

        self.batch += 1;
        let mut present = BTreeSet::new();
        let mut applied = 0;

        for (name, value) in entries {
            let Some(key) = entry::local_key(&self.outbound.prefix, &name) else {
                continue;
            };
            if self.outbound.is_reserved(key) {
                continue;
            }
            let remote = entry::decode(&name, value);
            if remote.is_some() {
                present.insert(name.clone());
            }
            if self.apply_entry(key, remote) {
                applied += 1;
            }
        }

        let vanished: Vec<String> = self.known_entries.difference(&present).cloned().collect();
        for name in vanished {
            if let Some(key) = entry::local_key(&self.outbound.prefix, &name) {
                if self.apply_entry(key, None) {
                    applied += 1;
                }
            }
        }
        self.known_entries = present;

        if applied > 0 {
            match self.events.upgrade() {
                Some(events) => {
                    let _ = events.send(MirrorEvent::ForgetEchoes(self.batch));
                }
                None => tracing::trace!("mirror closing, echoes left pending"),
            }
        }
    }

    /// Local changes for `key` still queued that the mirror did not make
    fn pending_user_changes(&self, key: &str) -> usize {
        let echoes = self.echoes.iter().filter(|echo| echo.key == key).count();
        self.queued.count(key).saturating_sub(echoes)
    }

    /// Bring one local key in line with its remote value
    fn apply_entry(&mut self, key: &str, remote: Option<String>) -> bool {
        let local = self.local.get(key);
        match (&remote, &local) {
            (None, None) => return false,
            (Some(remote), Some(local)) if remote == local => return false,
            _ => {}
        }
        if self.pending_user_changes(key) > 0 {
            self.outbound.stats.lock().deferred += 1;
            tracing::debug!(key, "local change queued, not applying remote value");
            return false;
        }

        self.echoes.push(Echo {
            batch: self.batch,
            key: key.to_string(),
            value: remote.clone(),
        });
        let result = match remote {
            None => self.local.remove(key).map(|()| {
                self.outbound.stats.lock().pulled_deletes += 1;
                tracing::debug!(key, "removed local key deleted remotely");
            }),
            Some(remote) => self.local.set(key, &remote).map(|()| {
                self.outbound.stats.lock().pulled_writes += 1;
                tracing::debug!(key, "applied remote value to local key");
            }),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                self.echoes.pop();
                tracing::warn!(key, error = %e, "failed to apply remote entry locally");
                false
            }
        }
    }

    /// Take the oldest expected echo for this change, if it is one
    fn take_echo(&mut self, change: &StorageChange) -> bool {
        let Some(index) = self.echoes.iter().position(|echo| echo.key == change.key) else {
            return false;
        };
        if self.echoes[index].value != change.new_value {
            return false;
        }
        self.echoes.remove(index);
        true
    }

    fn push_change(&mut self, change: &StorageChange) {
        if self.take_echo(change) {
            self.outbound.stats.lock().suppressed += 1;
            tracing::trace!(key = %change.key, "ignoring change made by the mirror");
            return;
        }
        let Some(path) = self.outbound.path_for(&change.key) else {
            return;
        };

        tracing::debug!(key = %change.key, removal = change.is_removal(), "pushing local change");
        self.outbound
            .write(path, entry::encode(change.new_value.as_deref()));
        self.outbound.stats.lock().pushed += 1;
    }
}

async fn run_writer(
    remote: Arc<dyn RemoteStore>,
    mut commands: mpsc::UnboundedReceiver<WriterCommand>,
    stats: Arc<Mutex<MirrorStats>>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            WriterCommand::Write { path, value } => {
                if let Err(e) = remote.write(&path, value).await {
                    stats.lock().failed_writes += 1;
                    tracing::warn!(path = %path, error = %e, "remote write failed");
                }
            }
            WriterCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
