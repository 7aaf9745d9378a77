//! Command handlers
//!
//! Each handler writes a human-readable result to the given writer and
//! returns failures as [`anyhow::Error`] with context attached.

use crate::config::AppConfig;
use anyhow::{bail, Context};
use chrono::Local;
use clap::ArgMatches;
use orderdesk_firebase::FirebaseRemoteStore;
use orderdesk_orders::{
    export_csv, export_file_name, sync_stores, update_order_details, update_status_batch, Address,
    Column, DateRange, NewStore, Order, OrderBook, OrderFilter, OrderKey, OrderPatch, OrderSource,
    OrderStats, OrderStatus, OrdersError, Page, PhoneCounts, ScreenOptions, ScreenOptionsRepo,
    Store, StoreRegistry, StoreUpdate, WooClient,
};
use orderdesk_storage::{FileLocalStore, LocalStore, RemoteData, RemoteStore};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs: settings and the stores behind them
pub struct App {
    config: AppConfig,
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("remote", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create new app over a local store
    ///
    /// The remote store is built from the config on first use.
    #[must_use]
    pub fn new(config: AppConfig, local: Arc<dyn LocalStore>) -> Self {
        Self {
            config,
            local,
            remote: None,
        }
    }

    /// Open the configured data file
    ///
    /// # Errors
    /// Returns error if the data file exists but cannot be read
    pub fn open(config: AppConfig) -> anyhow::Result<Self> {
        let local = FileLocalStore::open(&config.data_file).with_context(|| {
            format!("failed to open data file {}", config.data_file.display())
        })?;
        Ok(Self::new(config, Arc::new(local)))
    }

    /// Use a given remote store instead of the configured database
    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registered stores
    #[must_use]
    pub fn registry(&self) -> StoreRegistry {
        StoreRegistry::new(self.local.clone())
    }

    /// Aggregated orders
    #[must_use]
    pub fn book(&self) -> OrderBook {
        OrderBook::new(self.local.clone())
    }

    fn client(&self) -> anyhow::Result<WooClient> {
        WooClient::new(self.config.client_config()).context("failed to build store client")
    }

    fn remote(&self) -> anyhow::Result<Arc<dyn RemoteStore>> {
        if let Some(remote) = &self.remote {
            return Ok(remote.clone());
        }
        let store = FirebaseRemoteStore::new(self.config.firebase_config()?)
            .context("failed to set up remote database client")?;
        Ok(Arc::new(store))
    }

    fn screen_options(&self) -> anyhow::Result<ScreenOptionsRepo> {
        let data = RemoteData::new(self.remote()?, self.config.remote.root.as_deref())
            .context("invalid [remote] root")?;
        Ok(ScreenOptionsRepo::new(data))
    }

    /// Shared preferences, or defaults when no remote is reachable
    async fn current_screen_options(&self) -> ScreenOptions {
        if self.remote.is_none() && self.config.remote.database_url.is_none() {
            return ScreenOptions::default();
        }
        let loaded = match self.screen_options() {
            Ok(repo) => repo.load().await.map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        loaded.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "screen options unavailable, using defaults");
            ScreenOptions::default()
        })
    }

    /// Run a parsed command line
    ///
    /// # Errors
    /// Returns error if the command fails
    pub async fn run(&self, matches: &ArgMatches, out: &mut dyn Write) -> anyhow::Result<()> {
        match matches.subcommand() {
            Some(("store", args)) => self.store(args, out).await,
            Some(("sync", args)) => {
                let store_id = args.get_one::<String>("store").map(String::as_str);
                self.sync(store_id, out).await
            }
            Some(("orders", args)) => self.orders(args, out).await,
            Some(("export", args)) => self.export(args, out).await,
            Some(("options", args)) => self.options(args, out).await,
            Some((name, _)) => bail!("command {name} needs a running session"),
            None => bail!("no command given"),
        }
    }

    async fn store(&self, args: &ArgMatches, out: &mut dyn Write) -> anyhow::Result<()> {
        let registry = self.registry();
        match args.subcommand() {
            Some(("add", args)) => {
                let definition = NewStore::new(
                    arg(args, "name"),
                    arg(args, "url"),
                    arg(args, "key"),
                    arg(args, "secret"),
                );
                if let Some(field) = definition.missing_field() {
                    return Err(OrdersError::InvalidStore(format!("{field} is required")).into());
                }
                if !args.get_flag("no-test") {
                    let probe = probe_store(&definition);
                    self.client()?
                        .test_connection(&probe)
                        .await
                        .with_context(|| format!("connection to {} failed", probe.url))?;
                }
                let store = registry.add(definition)?;
                writeln!(out, "Added store {} ({})", store.name, store.id)?;
            }
            Some(("edit", args)) => {
                let id = arg(args, "id");
                let update = StoreUpdate {
                    name: opt(args, "name"),
                    url: opt(args, "url"),
                    consumer_key: opt(args, "key"),
                    consumer_secret: opt(args, "secret"),
                    ..StoreUpdate::default()
                };
                if update == StoreUpdate::default() {
                    bail!("nothing to change, pass --name, --url, --key or --secret");
                }
                if !registry.update(&id, update)? {
                    return Err(OrdersError::StoreNotFound(id).into());
                }
                writeln!(out, "Updated store {id}")?;
            }
            Some(("list", _)) => {
                let stores = registry.list()?;
                if stores.is_empty() {
                    writeln!(out, "No stores registered")?;
                    return Ok(());
                }
                writeln!(
                    out,
                    "{:<15} {:<20} {:<12} {:<16} URL",
                    "ID", "NAME", "STATUS", "LAST SYNC"
                )?;
                for store in &stores {
                    let status = if store.connected { "connected" } else { "disconnected" };
                    let last_sync = store.last_sync.map_or_else(
                        || "never".to_string(),
                        |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
                    );
                    writeln!(
                        out,
                        "{:<15} {:<20} {:<12} {:<16} {}",
                        store.id, store.name, status, last_sync, store.url
                    )?;
                }
            }
            Some(("remove", args)) => {
                let id = arg(args, "id");
                let Some(store) = registry.delete(&id)? else {
                    return Err(OrdersError::StoreNotFound(id).into());
                };
                writeln!(out, "Removed store {}", store.name)?;
            }
            Some(("test", args)) => {
                let store = registry.require(&arg(args, "id"))?;
                let status = self
                    .client()?
                    .test_connection(&store)
                    .await
                    .with_context(|| format!("connection to {} failed", store.name))?;
                match status.pointer("/environment/version").and_then(Value::as_str) {
                    Some(version) => {
                        writeln!(out, "Connected to {} (WooCommerce {version})", store.name)?;
                    }
                    None => writeln!(out, "Connected to {}", store.name)?,
                }
            }
            _ => bail!("unknown store command"),
        }
        Ok(())
    }

    async fn sync(&self, store_id: Option<&str>, out: &mut dyn Write) -> anyhow::Result<()> {
        let client = self.client()?;
        let report = sync_stores(&client, &self.registry(), &self.book(), store_id).await?;

        for store in &report.stores {
            match &store.outcome {
                Ok(count) => writeln!(out, "{}: {count} orders", store.store_name)?,
                Err(message) => writeln!(out, "{}: failed, {message}", store.store_name)?,
            }
        }
        writeln!(
            out,
            "Synced {} of {} stores, {} orders",
            report.succeeded(),
            report.stores.len(),
            report.orders()
        )?;
        if report.succeeded() == 0 {
            bail!("no store could be synced");
        }
        Ok(())
    }

    async fn orders(&self, args: &ArgMatches, out: &mut dyn Write) -> anyhow::Result<()> {
        match args.subcommand() {
            Some(("list", args)) => self.list_orders(args, out).await,
            Some(("set-status", args)) => {
                let status: OrderStatus =
                    arg(args, "status").parse().map_err(anyhow::Error::msg)?;
                let keys = order_keys(args)?;
                let client = self.client()?;
                let report =
                    update_status_batch(&client, &self.registry(), &self.book(), &keys, status)
                        .await?;
                writeln!(
                    out,
                    "Updated {} orders to {status}, {} failed",
                    report.succeeded, report.failed
                )?;
                if report.succeeded == 0 {
                    bail!("no order was updated");
                }
                Ok(())
            }
            Some(("edit", args)) => {
                let field = arg(args, "field");
                if !Address::FIELDS.contains(&field.as_str()) {
                    bail!(
                        "unknown billing field {field:?}, expected one of {}",
                        Address::FIELDS.join(", ")
                    );
                }
                let store_id = arg(args, "store");
                let order_id = args.get_one::<u64>("order").copied().unwrap_or_default();
                let patch = OrderPatch::billing_field(field, arg(args, "value"));

                let client = self.client()?;
                let order = update_order_details(
                    &client,
                    &self.registry(),
                    &self.book(),
                    &store_id,
                    order_id,
                    &patch,
                )
                .await?;
                writeln!(out, "Updated order {}", order.key())?;
                Ok(())
            }
            _ => bail!("unknown orders command"),
        }
    }

    async fn list_orders(&self, args: &ArgMatches, out: &mut dyn Write) -> anyhow::Result<()> {
        let orders = self.book().sorted_newest_first()?;
        let date_range: DateRange = opt(args, "since")
            .map_or(Ok(DateRange::All), |since| since.parse())
            .map_err(anyhow::Error::msg)?;
        let filter = OrderFilter {
            search: opt(args, "search"),
            status: opt(args, "status"),
            store_id: opt(args, "store"),
            date_range,
        };
        let matching = filter.apply(&orders, Local::now());

        let options = self.current_screen_options().await;
        let per_page = args
            .get_one::<usize>("per-page")
            .copied()
            .unwrap_or(options.items_per_page as usize);
        let number = args.get_one::<usize>("page").copied().unwrap_or(1);
        let page = Page::of(&matching, number, per_page);
        let phones = PhoneCounts::compute(&orders);
        let columns: Vec<Column> = options
            .visible_columns
            .visible()
            .into_iter()
            .filter(|c| *c != Column::Actions)
            .collect();

        if matching.is_empty() {
            writeln!(out, "No orders found")?;
        } else {
            let mut header = vec!["KEY".to_string()];
            header.extend(columns.iter().map(|c| c.as_str().to_uppercase()));
            writeln!(out, "{}", header.join(" | "))?;
            for order in page.items {
                let mut row = vec![order.key().to_string()];
                row.extend(columns.iter().map(|c| cell(order, *c, &phones)));
                writeln!(out, "{}", row.join(" | "))?;
            }
        }

        let stats = OrderStats::compute(matching.iter().copied());
        writeln!(
            out,
            "Showing {}-{} of {} (page {}/{})",
            page.start_item, page.end_item, page.total_items, page.number, page.total_pages
        )?;
        writeln!(
            out,
            "On hold {} | Processing {} | Completed {} | Cancelled {} | Revenue {:.2}{}",
            stats.on_hold,
            stats.processing,
            stats.completed,
            stats.cancelled,
            stats.revenue,
            stats.currency.as_deref().map(|c| format!(" {c}")).unwrap_or_default()
        )?;
        Ok(())
    }

    async fn export(&self, args: &ArgMatches, out: &mut dyn Write) -> anyhow::Result<()> {
        let orders = self.book().sorted_newest_first()?;
        let keys: HashSet<OrderKey> = order_keys(args)?.into_iter().collect();
        let selected: Vec<&Order> = orders
            .iter()
            .filter(|order| keys.is_empty() || keys.contains(&order.key()))
            .collect();
        if selected.is_empty() {
            return Err(OrdersError::NothingToExport.into());
        }

        let path = args
            .get_one::<PathBuf>("output")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(export_file_name(Local::now().date_naive())));
        let options = self.current_screen_options().await;
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let rows = export_csv(selected, &options.visible_columns, BufWriter::new(file))?;

        tracing::info!(rows, path = %path.display(), "exported orders");
        writeln!(out, "Exported {rows} orders to {}", path.display())?;
        Ok(())
    }

    async fn options(&self, args: &ArgMatches, out: &mut dyn Write) -> anyhow::Result<()> {
        let repo = self.screen_options()?;
        let options = match args.subcommand() {
            Some(("show", _)) => repo.load().await?,
            Some(("set-columns", args)) => {
                let show = columns(args, "show")?;
                let hide = columns(args, "hide")?;
                if show.is_empty() && hide.is_empty() {
                    bail!("pass --show or --hide with column names");
                }
                let mut options = repo.load().await?;
                for column in show {
                    options.visible_columns.set(column, true);
                }
                for column in hide {
                    options.visible_columns.set(column, false);
                }
                repo.save(&options).await?;
                options
            }
            Some(("set-per-page", args)) => {
                let items = args.get_one::<u32>("items").copied().unwrap_or_default();
                repo.set_items_per_page(items).await?
            }
            _ => bail!("unknown options command"),
        };

        let hidden: Vec<&str> = Column::ALL
            .into_iter()
            .filter(|c| !options.visible_columns.is_visible(*c))
            .map(Column::as_str)
            .collect();
        let visible: Vec<&str> = options
            .visible_columns
            .visible()
            .into_iter()
            .map(Column::as_str)
            .collect();
        writeln!(out, "Items per page: {}", options.items_per_page)?;
        writeln!(out, "Visible columns: {}", visible.join(", "))?;
        if !hidden.is_empty() {
            writeln!(out, "Hidden columns: {}", hidden.join(", "))?;
        }
        Ok(())
    }
}

/// Unsaved store used to check credentials before registering
fn probe_store(definition: &NewStore) -> Store {
    Store {
        id: String::new(),
        name: definition.name.clone(),
        url: definition.url.clone(),
        consumer_key: definition.consumer_key.clone(),
        consumer_secret: definition.consumer_secret.clone(),
        connected: false,
        last_sync: None,
    }
}

fn arg(args: &ArgMatches, name: &str) -> String {
    args.get_one::<String>(name).cloned().unwrap_or_default()
}

fn opt(args: &ArgMatches, name: &str) -> Option<String> {
    args.get_one::<String>(name).cloned()
}

fn order_keys(args: &ArgMatches) -> anyhow::Result<Vec<OrderKey>> {
    args.get_many::<String>("keys")
        .into_iter()
        .flatten()
        .map(|key| key.parse::<OrderKey>().map_err(anyhow::Error::msg))
        .collect()
}

fn columns(args: &ArgMatches, name: &str) -> anyhow::Result<Vec<Column>> {
    args.get_many::<String>(name)
        .into_iter()
        .flatten()
        .map(|column| column.trim().parse::<Column>().map_err(anyhow::Error::from))
        .collect()
}

fn cell(order: &Order, column: Column, phones: &PhoneCounts) -> String {
    match column {
        Column::Order => order.store_name.clone(),
        Column::Date => order.created_at().map_or_else(
            || order.date_created.clone(),
            |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        ),
        Column::Status => order.status.clone(),
        Column::Billing => {
            let mut text = order.billing.full_name().trim().to_string();
            if !order.billing.phone.is_empty() {
                text.push_str(&format!(" {}", order.billing.phone));
            }
            if phones.is_duplicate(order) {
                text.push_str(" (repeat phone)");
            }
            text
        }
        Column::Shipping => order.shipping.full_name().trim().to_string(),
        Column::Items => format!("{} items", order.line_items.len()),
        Column::Payment => {
            if order.payment_method_title.is_empty() {
                order.payment_method.clone()
            } else {
                order.payment_method_title.clone()
            }
        }
        Column::Total => format!("{} {}", order.total, order.currency),
        Column::Actions => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderdesk_storage::MemoryLocalStore;

    fn order(id: u64) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "status": "processing",
            "date_created": "2024-03-01T10:00:00",
            "total": "12.50",
            "currency": "EUR",
            "billing": {"first_name": "Ana", "last_name": "Silva", "phone": "+351 910"},
            "shipping": {"first_name": "Rui", "last_name": ""},
            "line_items": [{"name": "Tea", "quantity": 2}],
            "payment_method": "cod",
            "store_name": "Lisbon",
            "store_id": "1"
        }))
        .unwrap()
    }

    #[test]
    fn cells_render_each_column() {
        let first = order(7);
        let mut second = order(8);
        second.payment_method_title = "Cash on delivery".into();
        let phones = PhoneCounts::compute([&first, &second]);

        assert_eq!(cell(&first, Column::Order, &phones), "Lisbon");
        assert_eq!(cell(&first, Column::Status, &phones), "processing");
        assert_eq!(
            cell(&first, Column::Billing, &phones),
            "Ana Silva +351 910 (repeat phone)"
        );
        assert_eq!(cell(&first, Column::Shipping, &phones), "Rui");
        assert_eq!(cell(&first, Column::Items, &phones), "1 items");
        assert_eq!(cell(&first, Column::Payment, &phones), "cod");
        assert_eq!(cell(&second, Column::Payment, &phones), "Cash on delivery");
        assert_eq!(cell(&first, Column::Total, &phones), "12.50 EUR");
    }

    #[test]
    fn probe_store_carries_credentials() {
        let probe = probe_store(&NewStore::new("A", "https://a.example", "ck", "cs"));
        assert_eq!(probe.consumer_key, "ck");
        assert!(probe.id.is_empty());
    }

    #[tokio::test]
    async fn screen_options_default_without_remote() {
        let app = App::new(AppConfig::default(), Arc::new(MemoryLocalStore::new()));
        assert_eq!(app.current_screen_options().await, ScreenOptions::default());
    }
}
