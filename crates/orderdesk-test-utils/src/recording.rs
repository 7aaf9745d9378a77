use async_trait::async_trait;
use orderdesk_storage::{
    MemoryRemoteStore, RemoteError, RemotePath, RemoteStore, SnapshotListener, Subscription,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One outbound call seen by [`RecordingRemoteStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Write { path: String, value: Option<Value> },
    Update { path: String, children: Map<String, Value> },
    Delete { path: String },
}

impl RecordedCall {
    pub fn path(&self) -> &str {
        match self {
            Self::Write { path, .. } | Self::Update { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Memory remote store that records every mutating call made through it
///
/// Changes made directly on [`RecordingRemoteStore::inner`] are not
/// recorded, which is how tests play another session writing remotely.
#[derive(Debug, Default)]
pub struct RecordingRemoteStore {
    inner: Arc<MemoryRemoteStore>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(root: Value) -> Self {
        Self {
            inner: Arc::new(MemoryRemoteStore::with_value(root)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &Arc<MemoryRemoteStore> {
        &self.inner
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Recorded calls addressing exactly `path`
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.path() == path)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Play a write by another session
    pub async fn remote_write(&self, path: &str, value: Option<Value>) {
        let path = RemotePath::parse(path).unwrap();
        self.inner.write(&path, value).await.unwrap();
    }

    /// Current value at `path`
    pub fn value(&self, path: &str) -> Option<Value> {
        self.inner.value(&RemotePath::parse(path).unwrap())
    }
}

#[async_trait]
impl RemoteStore for RecordingRemoteStore {
    async fn read(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &RemotePath, value: Option<Value>) -> Result<(), RemoteError> {
        self.calls.lock().push(RecordedCall::Write {
            path: path.to_string(),
            value: value.clone(),
        });
        self.inner.write(path, value).await
    }

    async fn update(
        &self,
        path: &RemotePath,
        children: Map<String, Value>,
    ) -> Result<(), RemoteError> {
        self.calls.lock().push(RecordedCall::Update {
            path: path.to_string(),
            children: children.clone(),
        });
        self.inner.update(path, children).await
    }

    async fn delete(&self, path: &RemotePath) -> Result<(), RemoteError> {
        self.calls.lock().push(RecordedCall::Delete {
            path: path.to_string(),
        });
        self.inner.delete(path).await
    }

    fn subscribe(
        &self,
        path: &RemotePath,
        listener: SnapshotListener,
    ) -> Result<Subscription, RemoteError> {
        self.inner.subscribe(path, listener)
    }

    fn reserved_prefix(&self) -> &str {
        self.inner.reserved_prefix()
    }
}
