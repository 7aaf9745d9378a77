//! Store and order data model
//!
//! Orders keep the WooCommerce field names. Fields this crate does not use
//! are preserved in `extra` so a load/save cycle never drops data.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Store back end connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    /// Unique id; creation time in milliseconds
    pub id: String,
    /// Display name
    pub name: String,
    /// Site base URL
    pub url: String,
    /// REST API consumer key
    pub consumer_key: String,
    /// REST API consumer secret
    pub consumer_secret: String,
    /// Result of the last sync
    #[serde(default)]
    pub connected: bool,
    /// Time of the last successful sync
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

/// Fields required to register a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    /// Display name
    pub name: String,
    /// Site base URL
    pub url: String,
    /// REST API consumer key
    pub consumer_key: String,
    /// REST API consumer secret
    pub consumer_secret: String,
}

impl NewStore {
    /// Create new store definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    /// Name of the first required field that is blank
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("url", &self.url),
            ("consumer key", &self.consumer_key),
            ("consumer secret", &self.consumer_secret),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// Partial store change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreUpdate {
    /// New display name
    pub name: Option<String>,
    /// New base URL
    pub url: Option<String>,
    /// New consumer key
    pub consumer_key: Option<String>,
    /// New consumer secret
    pub consumer_secret: Option<String>,
    /// New connection flag
    pub connected: Option<bool>,
    /// New last sync time
    pub last_sync: Option<Option<DateTime<Utc>>>,
}

impl StoreUpdate {
    /// Update recording a successful sync
    #[must_use]
    pub fn synced(at: DateTime<Utc>) -> Self {
        Self {
            connected: Some(true),
            last_sync: Some(Some(at)),
            ..Self::default()
        }
    }

    /// Update recording a failed sync
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            connected: Some(false),
            ..Self::default()
        }
    }

    /// Update replacing the editable definition fields
    #[must_use]
    pub fn definition(store: NewStore) -> Self {
        Self {
            name: Some(store.name),
            url: Some(store.url),
            consumer_key: Some(store.consumer_key),
            consumer_secret: Some(store.consumer_secret),
            ..Self::default()
        }
    }

    /// Apply to a store
    pub fn apply(self, store: &mut Store) {
        if let Some(name) = self.name {
            store.name = name;
        }
        if let Some(url) = self.url {
            store.url = url;
        }
        if let Some(key) = self.consumer_key {
            store.consumer_key = key;
        }
        if let Some(secret) = self.consumer_secret {
            store.consumer_secret = secret;
        }
        if let Some(connected) = self.connected {
            store.connected = connected;
        }
        if let Some(last_sync) = self.last_sync {
            store.last_sync = last_sync;
        }
    }
}

/// WooCommerce order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Awaiting payment
    Pending,
    /// Paid, being fulfilled
    Processing,
    /// Awaiting action
    OnHold,
    /// Fulfilled
    Completed,
    /// Cancelled by admin or customer
    Cancelled,
    /// Refunded
    Refunded,
    /// Payment failed
    Failed,
}

impl OrderStatus {
    /// Every status in display order
    pub const ALL: [OrderStatus; 7] = [
        Self::Pending,
        Self::Processing,
        Self::OnHold,
        Self::Completed,
        Self::Cancelled,
        Self::Refunded,
        Self::Failed,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
        }
    }

    /// Check if the order ended without revenue
    #[inline]
    #[must_use]
    pub fn is_unsuccessful(self) -> bool {
        matches!(self, Self::Cancelled | Self::Failed | Self::Refunded)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status {s:?}"))
    }
}

/// Order identity across stores: `<store_id>-<order_id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderKey {
    /// Owning store
    pub store_id: String,
    /// Order id within the store
    pub order_id: u64,
}

impl OrderKey {
    /// Create new key
    #[inline]
    #[must_use]
    pub fn new(store_id: impl Into<String>, order_id: u64) -> Self {
        Self {
            store_id: store_id.into(),
            order_id,
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.store_id, self.order_id)
    }
}

impl FromStr for OrderKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (store_id, order_id) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("order key {s:?} is not <store>-<order>"))?;
        if store_id.is_empty() {
            return Err(format!("order key {s:?} has no store id"));
        }
        let order_id = order_id
            .parse()
            .map_err(|_| format!("order key {s:?} has no numeric order id"))?;
        Ok(Self::new(store_id, order_id))
    }
}

/// Billing or shipping address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Address {
    #[serde(default, deserialize_with = "nullable")]
    pub first_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub last_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub company: String,
    #[serde(default, deserialize_with = "nullable")]
    pub address_1: String,
    #[serde(default, deserialize_with = "nullable")]
    pub address_2: String,
    #[serde(default, deserialize_with = "nullable")]
    pub city: String,
    #[serde(default, deserialize_with = "nullable")]
    pub state: String,
    #[serde(default, deserialize_with = "nullable")]
    pub postcode: String,
    #[serde(default, deserialize_with = "nullable")]
    pub country: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: String,
    /// Fields not modelled here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Address {
    /// Editable field names, as accepted by the REST API
    pub const FIELDS: [&'static str; 11] = [
        "first_name",
        "last_name",
        "company",
        "address_1",
        "address_2",
        "city",
        "state",
        "postcode",
        "country",
        "email",
        "phone",
    ];

    /// First and last name separated by a space
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Phone number reduced to its digits
    #[must_use]
    pub fn phone_digits(&self) -> String {
        digits(&self.phone)
    }
}

/// Order line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct LineItem {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub total: String,
    /// Fields not modelled here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Order meta entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct MetaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

/// WooCommerce order tagged with its store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order id within its store
    pub id: u64,
    /// Status as sent by the store; custom statuses are kept
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    /// Creation time as sent by the store
    #[serde(default, deserialize_with = "nullable")]
    pub date_created: String,
    /// Order total, decimal text
    #[serde(default, deserialize_with = "nullable")]
    pub total: String,
    /// ISO currency code
    #[serde(default, deserialize_with = "nullable")]
    pub currency: String,
    /// Billing address
    #[serde(default, deserialize_with = "nullable")]
    pub billing: Address,
    /// Shipping address
    #[serde(default, deserialize_with = "nullable")]
    pub shipping: Address,
    /// Payment method id
    #[serde(default, deserialize_with = "nullable")]
    pub payment_method: String,
    /// Payment method display name
    #[serde(default, deserialize_with = "nullable")]
    pub payment_method_title: String,
    /// Note left by the customer
    #[serde(default, deserialize_with = "nullable")]
    pub customer_note: String,
    /// Ordered products
    #[serde(default, deserialize_with = "nullable")]
    pub line_items: Vec<LineItem>,
    /// Store-specific meta entries
    #[serde(default, deserialize_with = "nullable")]
    pub meta_data: Vec<MetaData>,
    /// Owning store name
    #[serde(default, deserialize_with = "nullable")]
    pub store_name: String,
    /// Owning store id
    #[serde(default, deserialize_with = "nullable")]
    pub store_id: String,
    /// Owning store URL
    #[serde(default, deserialize_with = "nullable")]
    pub store_url: String,
    /// Fields not modelled here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// Identity across stores
    #[must_use]
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.store_id.clone(), self.id)
    }

    /// Stamp the owning store onto the order
    #[must_use]
    pub fn tagged(mut self, store: &Store) -> Self {
        self.store_name.clone_from(&store.name);
        self.store_id.clone_from(&store.id);
        self.store_url.clone_from(&store.url);
        self
    }

    /// Known status, `None` for custom statuses
    #[must_use]
    pub fn status_kind(&self) -> Option<OrderStatus> {
        self.status.parse().ok()
    }

    /// Creation time; timestamps without offset are taken as UTC
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date_created)
    }

    /// Order total as a number, zero when unparseable
    #[must_use]
    pub fn total_amount(&self) -> f64 {
        self.total.trim().parse().unwrap_or(0.0)
    }

    /// Value of a meta entry rendered as text
    #[must_use]
    pub fn meta_text(&self, key: &str) -> Option<String> {
        let value = &self.meta_data.iter().find(|m| m.key == key)?.value;
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Parse an RFC 3339 timestamp or a naive `YYYY-MM-DDTHH:MM:SS` one
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Keep only ASCII digits
#[must_use]
pub fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Deserialize `null` as the type's default
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
