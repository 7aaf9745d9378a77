use chrono::{DateTime, Utc};
use orderdesk_orders::{Address, LineItem, MetaData, Order, Store};
use serde_json::{json, Value};

/// Store with predictable fields derived from `id`
pub fn sample_store(id: &str) -> Store {
    Store {
        id: id.to_string(),
        name: format!("Store {id}"),
        url: format!("https://store-{id}.example"),
        consumer_key: format!("ck_{id}"),
        consumer_secret: format!("cs_{id}"),
        connected: true,
        last_sync: None,
    }
}

/// Store pointing at a mock server
pub fn store_at(id: &str, url: &str) -> Store {
    Store {
        url: url.to_string(),
        ..sample_store(id)
    }
}

/// Untagged order as a store would return it
pub fn sample_order(id: u64, status: &str, created: DateTime<Utc>) -> Order {
    Order {
        id,
        status: status.to_string(),
        date_created: created.format("%Y-%m-%dT%H:%M:%S").to_string(),
        total: "25.00".to_string(),
        currency: "EUR".to_string(),
        billing: Address {
            first_name: "Ana".to_string(),
            last_name: format!("Customer{id}"),
            email: format!("customer{id}@example.com"),
            phone: format!("+351 910 000 {id:03}"),
            ..Address::default()
        },
        payment_method: "cod".to_string(),
        payment_method_title: "Cash on delivery".to_string(),
        line_items: vec![LineItem {
            id: id * 10,
            name: "Green Tea".to_string(),
            quantity: 1,
            total: "25.00".to_string(),
            ..LineItem::default()
        }],
        meta_data: vec![MetaData {
            id: None,
            key: "billing_area".to_string(),
            value: json!("Downtown"),
        }],
        ..Order::default()
    }
}

/// Order JSON in the REST API's shape, with fields the model does not cover
pub fn order_json(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "number": id.to_string(),
        "status": status,
        "date_created": "2024-05-01T10:30:00",
        "total": "19.99",
        "currency": "EUR",
        "billing": {
            "first_name": "Ana",
            "last_name": "Lima",
            "company": "",
            "email": "ana@example.com",
            "phone": "+351 910 000 001"
        },
        "shipping": {"first_name": "Ana", "last_name": "Lima", "phone": ""},
        "payment_method": "cod",
        "payment_method_title": "Cash on delivery",
        "customer_note": null,
        "line_items": [{"id": 1, "name": "Green Tea", "quantity": 2, "total": "19.99", "sku": "GT-1"}],
        "meta_data": [],
        "_links": {"self": [{"href": "https://example/orders/1"}]}
    })
}
