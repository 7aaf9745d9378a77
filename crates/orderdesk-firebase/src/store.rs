//! Realtime database remote store
//!
//! Plain operations map onto the REST API:
//! - `read` is `GET {db}/{path}.json`
//! - `write` is `PUT`, or `DELETE` for `None`
//! - `update` is `PATCH`
//!
//! Subscriptions open an event stream (`Accept: text/event-stream`) on a
//! task of the current tokio runtime. The task keeps a [`NodeCache`] of the
//! node and hands listeners the full value. Dropped connections reconnect
//! after the configured delay; `cancel` and `auth_revoked` end the stream.

use crate::config::FirebaseConfig;
use crate::error::FirebaseError;
use crate::sse::SseDecoder;
use crate::stream::{NodeCache, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use orderdesk_storage::{RemoteError, RemotePath, RemoteStore, SnapshotListener, Subscription};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Method, Url};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::runtime::Handle;

/// Remote store backed by a realtime database
#[derive(Debug, Clone)]
pub struct FirebaseRemoteStore {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    base: Url,
    config: FirebaseConfig,
}

impl FirebaseRemoteStore {
    /// Create new store
    ///
    /// # Errors
    /// Returns error if the config is invalid or the HTTP client cannot be built
    pub fn new(config: FirebaseConfig) -> Result<Self, FirebaseError> {
        let base = config.base_url()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let stream_http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            stream_http,
            base,
            config,
        })
    }

    /// Connection settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FirebaseConfig {
        &self.config
    }

    /// REST URL of a node: the path segments, `.json`, and the credential
    #[must_use]
    pub fn node_url(&self, path: &RemotePath) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            match path.segments().split_last() {
                None => {
                    segments.push(".json");
                }
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{last}.json"));
                }
            }
        }
        url.set_query(None);
        if let Some(auth) = &self.config.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        url
    }

    async fn request(
        &self,
        method: Method,
        path: &RemotePath,
        body: Option<&Value>,
    ) -> Result<Value, FirebaseError> {
        tracing::debug!(%method, %path, "database request");
        let mut request = self.http.request(method, self.node_url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("error")?.as_str().map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(FirebaseError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RemoteStore for FirebaseRemoteStore {
    async fn read(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(Some(value).filter(|v| !v.is_null()))
    }

    async fn write(&self, path: &RemotePath, value: Option<Value>) -> Result<(), RemoteError> {
        match value.filter(|v| !v.is_null()) {
            Some(value) => self.request(Method::PUT, path, Some(&value)).await?,
            None => self.request(Method::DELETE, path, None).await?,
        };
        Ok(())
    }

    async fn update(
        &self,
        path: &RemotePath,
        children: Map<String, Value>,
    ) -> Result<(), RemoteError> {
        if children.is_empty() {
            return Ok(());
        }
        for key in children.keys() {
            RemotePath::parse(key)?;
        }
        self.request(Method::PATCH, path, Some(&Value::Object(children)))
            .await?;
        Ok(())
    }

    fn subscribe(
        &self,
        path: &RemotePath,
        listener: SnapshotListener,
    ) -> Result<Subscription, RemoteError> {
        let runtime = Handle::try_current().map_err(|_| FirebaseError::NoRuntime)?;
        let watcher = Watcher {
            http: self.stream_http.clone(),
            url: self.node_url(path),
            path: path.clone(),
            reconnect_delay: self.config.reconnect_delay(),
            listener,
        };
        let task = runtime.spawn(watcher.run());
        Ok(Subscription::new(move || task.abort()))
    }

    fn reserved_prefix(&self) -> &str {
        &self.config.reserved_prefix
    }
}

/// Event stream reader for one subscription
struct Watcher {
    http: reqwest::Client,
    url: Url,
    path: RemotePath,
    reconnect_delay: Duration,
    listener: SnapshotListener,
}

impl Watcher {
    async fn run(self) {
        tracing::info!(path = %self.path, "change stream started");
        let mut cache = NodeCache::new();
        loop {
            match self.stream(&mut cache).await {
                Ok(()) => {
                    tracing::info!(path = %self.path, "change stream ended by server");
                    return;
                }
                Err(e)
                    if e.is_retryable()
                        || matches!(e, FirebaseError::Decode(_) | FirebaseError::StreamClosed(_)) =>
                {
                    tracing::warn!(path = %self.path, error = %e, "change stream dropped, reconnecting");
                }
                Err(e) => {
                    tracing::warn!(path = %self.path, error = %e, "change stream failed");
                    return;
                }
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Read one connection; `Ok` when the server ends the stream for good
    async fn stream(&self, cache: &mut NodeCache) -> Result<(), FirebaseError> {
        let response = self
            .http
            .get(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FirebaseError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("error").to_string(),
            });
        }

        // The server replays the full node on every connection.
        cache.reset();
        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for sse in decoder.push(&chunk) {
                let event = StreamEvent::from_sse(&sse)?;
                match event {
                    StreamEvent::Cancel(reason) => {
                        tracing::warn!(path = %self.path, %reason, "read access cancelled");
                        return Ok(());
                    }
                    StreamEvent::AuthRevoked(reason) => {
                        tracing::warn!(path = %self.path, %reason, "credential revoked");
                        return Ok(());
                    }
                    StreamEvent::Other(name) => {
                        tracing::debug!(path = %self.path, event = %name, "ignored stream event");
                    }
                    event => {
                        if let Some(value) = cache.apply(event) {
                            (self.listener)(value);
                        }
                    }
                }
            }
        }
        Err(FirebaseError::StreamClosed("connection closed".to_string()))
    }
}
