//! Order search and filtering

use crate::model::{digits, Order};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use std::str::FromStr;

/// Creation-date window, relative to the current time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    /// No restriction
    #[default]
    All,
    /// Since local midnight
    Today,
    /// The last seven days
    Last7Days,
    /// The last thirty days
    Last30Days,
}

impl DateRange {
    /// Earliest creation time inside the window
    #[must_use]
    pub fn start(self, now: DateTime<Local>) -> Option<DateTime<Utc>> {
        match self {
            Self::All => None,
            Self::Today => {
                let midnight = now.date_naive().and_hms_opt(0, 0, 0)?;
                let local = Local
                    .from_local_datetime(&midnight)
                    .earliest()
                    .unwrap_or(now);
                Some(local.with_timezone(&Utc))
            }
            Self::Last7Days => Some((now - Duration::days(7)).with_timezone(&Utc)),
            Self::Last30Days => Some((now - Duration::days(30)).with_timezone(&Utc)),
        }
    }
}

impl FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Last7Days),
            "month" => Ok(Self::Last30Days),
            other => Err(format!(
                "unknown date range {other:?}, expected all, today, week or month"
            )),
        }
    }
}

/// Criteria an order must meet to be listed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Free-text search
    pub search: Option<String>,
    /// Exact status
    pub status: Option<String>,
    /// Owning store
    pub store_id: Option<String>,
    /// Creation-date window
    pub date_range: DateRange,
}

impl OrderFilter {
    /// Orders matching every criterion, in input order
    #[must_use]
    pub fn apply<'a>(&self, orders: &'a [Order], now: DateTime<Local>) -> Vec<&'a Order> {
        let start = self.date_range.start(now);
        let search = Search::new(self.search.as_deref());

        orders
            .iter()
            .filter(|order| {
                self.status
                    .as_deref()
                    .map_or(true, |status| order.status == status)
            })
            .filter(|order| {
                self.store_id
                    .as_deref()
                    .map_or(true, |store| order.store_id == store)
            })
            .filter(|order| match start {
                None => true,
                Some(start) => order.created_at().is_some_and(|at| at >= start),
            })
            .filter(|order| search.as_ref().map_or(true, |s| s.matches(order)))
            .collect()
    }
}

struct Search {
    term: String,
    digits: String,
}

impl Search {
    fn new(term: Option<&str>) -> Option<Self> {
        let term = term?.trim();
        if term.is_empty() {
            return None;
        }
        Some(Self {
            term: term.to_lowercase(),
            digits: digits(term),
        })
    }

    fn matches(&self, order: &Order) -> bool {
        let contains = |text: &str| text.to_lowercase().contains(&self.term);

        order.id.to_string().contains(&self.term)
            || contains(&order.billing.full_name())
            || contains(&order.billing.email)
            || (!self.digits.is_empty() && order.billing.phone_digits().contains(&self.digits))
            || contains(&order.shipping.full_name())
            || order.line_items.iter().any(|item| contains(&item.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Address, LineItem};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn order(id: u64, store: &str, status: &str, created: &str) -> Order {
        Order {
            id,
            store_id: store.into(),
            status: status.into(),
            date_created: created.into(),
            ..Order::default()
        }
    }

    fn now() -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    fn ids(orders: &[&Order]) -> Vec<u64> {
        orders.iter().map(|o| o.id).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let orders = vec![order(1, "a", "pending", ""), order(2, "b", "completed", "")];
        assert_eq!(ids(&OrderFilter::default().apply(&orders, now())), vec![1, 2]);
    }

    #[test]
    fn status_and_store() {
        let orders = vec![
            order(1, "a", "pending", ""),
            order(2, "a", "completed", ""),
            order(3, "b", "completed", ""),
        ];
        let filter = OrderFilter {
            status: Some("completed".into()),
            store_id: Some("a".into()),
            ..OrderFilter::default()
        };
        assert_eq!(ids(&filter.apply(&orders, now())), vec![2]);
    }

    #[test]
    fn search_fields() {
        let mut named = order(10, "a", "pending", "");
        named.billing = Address {
            first_name: "Ana".into(),
            last_name: "Lima".into(),
            email: "ana@example.com".into(),
            phone: "+1 (555) 010-2030".into(),
            ..Address::default()
        };
        let mut shipped = order(20, "a", "pending", "");
        shipped.shipping.first_name = "Bruno".into();
        let mut itemized = order(30, "a", "pending", "");
        itemized.line_items.push(LineItem {
            name: "Green Tea".into(),
            ..LineItem::default()
        });
        let orders = vec![named, shipped, itemized];

        let search = |term: &str| {
            let filter = OrderFilter {
                search: Some(term.into()),
                ..OrderFilter::default()
            };
            ids(&filter.apply(&orders, now()))
        };

        assert_eq!(search("ana lima"), vec![10]);
        assert_eq!(search("EXAMPLE.COM"), vec![10]);
        assert_eq!(search("555-0102"), vec![10]);
        assert_eq!(search("bruno"), vec![20]);
        assert_eq!(search("tea"), vec![30]);
        assert_eq!(search("30"), vec![10, 30]);
        assert_eq!(search("   "), vec![10, 20, 30]);
    }

    #[test]
    fn letters_only_term_does_not_match_every_phone() {
        let mut with_phone = order(1, "a", "pending", "");
        with_phone.billing.phone = "555 0100".into();
        let orders = vec![with_phone];

        let filter = OrderFilter {
            search: Some("zzz".into()),
            ..OrderFilter::default()
        };
        assert!(filter.apply(&orders, now()).is_empty());
    }

    #[test]
    fn date_ranges() {
        let now = now();
        let stamp = |at: DateTime<Local>| at.with_timezone(&Utc).to_rfc3339();
        let orders = vec![
            order(1, "a", "pending", &stamp(now - Duration::hours(1))),
            order(2, "a", "pending", &stamp(now - Duration::days(3))),
            order(3, "a", "pending", &stamp(now - Duration::days(20))),
            order(4, "a", "pending", &stamp(now - Duration::days(90))),
            order(5, "a", "pending", "not a date"),
        ];
        let within = |range: DateRange| {
            let filter = OrderFilter {
                date_range: range,
                ..OrderFilter::default()
            };
            ids(&filter.apply(&orders, now))
        };

        assert_eq!(within(DateRange::Today), vec![1]);
        assert_eq!(within(DateRange::Last7Days), vec![1, 2]);
        assert_eq!(within(DateRange::Last30Days), vec![1, 2, 3]);
        assert_eq!(within(DateRange::All), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn date_range_names() {
        assert_eq!("week".parse::<DateRange>().unwrap(), DateRange::Last7Days);
        assert!("year".parse::<DateRange>().is_err());
    }
}
