//! Order source client
//!
//! [`OrderSource`] is the seam to the store back ends; [`WooClient`] talks
//! to the WooCommerce REST API (`wp-json/wc/v3`), optionally through a
//! forwarding proxy that takes the target URL as its `url` query parameter.

use crate::error::OrdersError;
use crate::model::{Order, OrderStatus, Store};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

const API_PREFIX: &str = "wp-json/wc/v3";

/// Default page size for order listing
pub const DEFAULT_PER_PAGE: u32 = 100;

/// One entry of a batch status update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Order id within the store
    pub id: u64,
    /// New status
    pub status: OrderStatus,
}

/// Per-order outcome reported by a batch update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Orders the store reported as failed, with the store's message
    pub rejected: Vec<(u64, String)>,
}

impl BatchOutcome {
    /// Parse the `update` array of a batch response
    #[must_use]
    pub fn from_response(response: &Value) -> Self {
        let rejected = response
            .get("update")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|item| {
                let error = item.get("error")?;
                let id = item.get("id").and_then(Value::as_u64)?;
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("rejected")
                    .to_string();
                Some((id, message))
            })
            .collect();
        Self { rejected }
    }

    /// Check if the store rejected an order
    #[must_use]
    pub fn is_rejected(&self, id: u64) -> bool {
        self.rejected.iter().any(|(rejected, _)| *rejected == id)
    }
}

/// Partial order body for `PUT orders/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderPatch(pub Map<String, Value>);

impl OrderPatch {
    /// Patch changing one billing field: `{"billing": {name: value}}`
    #[must_use]
    pub fn billing_field(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut billing = Map::new();
        billing.insert(name.into(), Value::String(value.into()));
        let mut body = Map::new();
        body.insert("billing".to_string(), Value::Object(billing));
        Self(body)
    }

    /// Patch changing the status
    #[must_use]
    pub fn status(status: OrderStatus) -> Self {
        let mut body = Map::new();
        body.insert(
            "status".to_string(),
            Value::String(status.as_str().to_string()),
        );
        Self(body)
    }

    /// Check if the patch changes nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Store back end operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Probe credentials and reachability; returns the system status report
    async fn test_connection(&self, store: &Store) -> Result<Value, OrdersError>;

    /// Most recent orders of a store
    async fn fetch_orders(&self, store: &Store) -> Result<Vec<Order>, OrdersError>;

    /// Set the status of several orders in one request
    async fn batch_update_status(
        &self,
        store: &Store,
        updates: &[StatusUpdate],
    ) -> Result<BatchOutcome, OrdersError>;

    /// Change fields of one order; returns the updated order
    async fn update_order(
        &self,
        store: &Store,
        order_id: u64,
        patch: &OrderPatch,
    ) -> Result<Order, OrdersError>;
}

/// HTTP settings for [`WooClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Forwarding proxy; the target URL is passed as its `url` parameter
    pub proxy_url: Option<String>,
    /// Orders fetched per sync
    pub per_page: u32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            per_page: DEFAULT_PER_PAGE,
            timeout: Duration::from_secs(30),
        }
    }
}

/// WooCommerce REST client
#[derive(Debug, Clone)]
pub struct WooClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl WooClient {
    /// Create new client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self, OrdersError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Client settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full request URL for an API path of a store
    ///
    /// # Errors
    /// Returns error if the store URL or proxy URL is malformed
    pub fn endpoint(&self, store: &Store, path: &str) -> Result<Url, OrdersError> {
        let base = store.url.strip_suffix('/').unwrap_or(&store.url);
        let target = format!("{base}/{API_PREFIX}/{path}");

        let invalid = |url: &str, e: &dyn std::fmt::Display| OrdersError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let target_url = Url::parse(&target).map_err(|e| invalid(&store.url, &e))?;
        match &self.config.proxy_url {
            None => Ok(target_url),
            Some(proxy) => Url::parse_with_params(proxy, &[("url", target_url.as_str())])
                .map_err(|e| invalid(proxy, &e)),
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        store: &Store,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, OrdersError> {
        let url = self.endpoint(store, path)?;
        tracing::debug!(store = %store.name, %method, path, "store request");

        let mut request = self
            .http
            .request(method, url)
            .basic_auth(&store.consumer_key, Some(&store.consumer_secret));
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
                .and_then(|body| body.get("message")?.as_str().map(str::to_string))
                .filter(|m| !m.is_empty());
            return Err(OrdersError::http(status.as_u16(), message));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl OrderSource for WooClient {
    async fn test_connection(&self, store: &Store) -> Result<Value, OrdersError> {
        self.send(store, Method::GET, "system_status", None).await
    }

    async fn fetch_orders(&self, store: &Store) -> Result<Vec<Order>, OrdersError> {
        let path = format!("orders?per_page={}", self.config.per_page);
        self.send(store, Method::GET, &path, None).await
    }

    async fn batch_update_status(
        &self,
        store: &Store,
        updates: &[StatusUpdate],
    ) -> Result<BatchOutcome, OrdersError> {
        let body = serde_json::json!({ "update": updates });
        let response: Value = self
            .send(store, Method::POST, "orders/batch", Some(&body))
            .await?;
        Ok(BatchOutcome::from_response(&response))
    }

    async fn update_order(
        &self,
        store: &Store,
        order_id: u64,
        patch: &OrderPatch,
    ) -> Result<Order, OrdersError> {
        let body = serde_json::to_value(patch)?;
        self.send(store, Method::PUT, &format!("orders/{order_id}"), Some(&body))
            .await
    }
}
