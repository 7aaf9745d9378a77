//! CSV export of orders
//!
//! Output is UTF-8 with a byte order mark so spreadsheet tools pick the
//! right encoding. Column groups follow the visible table columns; `Ref` is
//! always present.

use crate::error::OrdersError;
use crate::model::{Address, Order};
use crate::screen::VisibleColumns;
use chrono::{NaiveDate, SecondsFormat};
use std::io::Write;

const BOM: &[u8] = "\u{feff}".as_bytes();

/// Meta entry used when an address has no company
const AREA_META_KEY: &str = "billing_area";

const BILLING_HEADERS: [&str; 11] = [
    "Billing First Name",
    "Billing Last Name",
    "Billing Company",
    "Billing Address 1",
    "Billing Address 2",
    "Billing City",
    "Billing Postcode",
    "Billing State",
    "Billing Country",
    "Billing Email",
    "Billing Phone",
];

const SHIPPING_HEADERS: [&str; 9] = [
    "Shipping First Name",
    "Shipping Last Name",
    "Shipping Company",
    "Shipping Address 1",
    "Shipping Address 2",
    "Shipping City",
    "Shipping Postcode",
    "Shipping State",
    "Shipping Country",
];

/// Suggested export file name for a day
#[must_use]
pub fn export_file_name(day: NaiveDate) -> String {
    format!("woocommerce-orders-{}.csv", day.format("%Y-%m-%d"))
}

/// Write `orders` as CSV; returns the number of rows written
///
/// # Errors
/// Returns [`OrdersError::NothingToExport`] for an empty order set, or error
/// if writing fails
pub fn export_csv<'a, W: Write>(
    orders: impl IntoIterator<Item = &'a Order>,
    columns: &VisibleColumns,
    mut writer: W,
) -> Result<usize, OrdersError> {
    let orders: Vec<&Order> = orders.into_iter().collect();
    if orders.is_empty() {
        return Err(OrdersError::NothingToExport);
    }

    writer.write_all(BOM)?;
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    csv.write_record(headers(columns))?;
    for order in &orders {
        csv.write_record(row(order, columns))?;
    }
    csv.flush()?;

    tracing::info!(rows = orders.len(), "orders exported");
    Ok(orders.len())
}

fn headers(columns: &VisibleColumns) -> Vec<&'static str> {
    let mut headers = vec!["Ref"];
    if columns.order {
        headers.extend(["Order ID", "Store"]);
    }
    if columns.date {
        headers.push("Date");
    }
    if columns.status {
        headers.push("Status");
    }
    if columns.billing {
        headers.extend(BILLING_HEADERS);
    }
    if columns.shipping {
        headers.extend(SHIPPING_HEADERS);
    }
    if columns.total {
        headers.extend(["Total", "Currency"]);
    }
    if columns.payment {
        headers.push("Payment Method");
    }
    if columns.items {
        headers.extend(["Customer Note", "Items Count", "Items"]);
    }
    headers
}

fn row(order: &Order, columns: &VisibleColumns) -> Vec<String> {
    let area = order
        .meta_text(AREA_META_KEY)
        .unwrap_or_else(|| "N/A".to_string());
    let company = |address: &Address| {
        if address.company.is_empty() {
            area.clone()
        } else {
            address.company.clone()
        }
    };

    let mut row = vec![reference(order)];
    if columns.order {
        row.extend([order.id.to_string(), order.store_name.clone()]);
    }
    if columns.date {
        row.push(
            order
                .created_at()
                .map_or_else(
                    || order.date_created.clone(),
                    |at| at.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
        );
    }
    if columns.status {
        row.push(order.status.clone());
    }
    if columns.billing {
        let b = &order.billing;
        row.extend([
            b.first_name.clone(),
            b.last_name.clone(),
            company(b),
            b.address_1.clone(),
            b.address_2.clone(),
            b.city.clone(),
            b.postcode.clone(),
            b.state.clone(),
            b.country.clone(),
            b.email.clone(),
            b.phone.clone(),
        ]);
    }
    if columns.shipping {
        let s = &order.shipping;
        row.extend([
            s.first_name.clone(),
            s.last_name.clone(),
            company(s),
            s.address_1.clone(),
            s.address_2.clone(),
            s.city.clone(),
            s.postcode.clone(),
            s.state.clone(),
            s.country.clone(),
        ]);
    }
    if columns.total {
        row.extend([order.total.clone(), order.currency.clone()]);
    }
    if columns.payment {
        let method = if order.payment_method_title.is_empty() {
            &order.payment_method
        } else {
            &order.payment_method_title
        };
        row.push(method.clone());
    }
    if columns.items {
        let items: Vec<String> = order
            .line_items
            .iter()
            .map(|item| format!("(Qty: {})-{}", item.quantity, item.name))
            .collect();
        row.extend([
            order.customer_note.clone(),
            order.line_items.len().to_string(),
            items.join("\n"),
        ]);
    }
    row
}

/// Short reference: first three letters of the store name, then the id
fn reference(order: &Order) -> String {
    let prefix: String = order.store_name.to_uppercase().chars().take(3).collect();
    format!("{prefix}{}", order.id)
}
