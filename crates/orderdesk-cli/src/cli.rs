//! Command line definition

use crate::config::DEFAULT_CONFIG_FILE;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Build the `orderdesk` command tree
#[must_use]
pub fn command() -> Command {
    Command::new("orderdesk")
        .version(crate::VERSION)
        .about("Multi-store order dashboard with a shared storage mirror")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .default_value(DEFAULT_CONFIG_FILE)
                .value_parser(value_parser!(PathBuf))
                .help("Config file; missing means defaults"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(store_command())
        .subcommand(
            Command::new("sync")
                .about("Fetch orders from the registered stores")
                .arg(
                    Arg::new("store")
                        .long("store")
                        .help("Only sync the store with this id"),
                ),
        )
        .subcommand(orders_command())
        .subcommand(
            Command::new("export")
                .about("Write orders as CSV")
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file; defaults to woocommerce-orders-<date>.csv"),
                )
                .arg(
                    Arg::new("keys")
                        .value_name("KEY")
                        .num_args(0..)
                        .help("Orders to export as <store>-<order>; all when omitted"),
                ),
        )
        .subcommand(options_command())
        .subcommand(
            Command::new("mirror")
                .about("Mirror the local data file with the remote database until Ctrl-C")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help("Session host deciding the mirror role; overrides config"),
                ),
        )
}

fn store_command() -> Command {
    Command::new("store")
        .about("Manage store back ends")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register a store")
                .arg(Arg::new("name").long("name").required(true).help("Display name"))
                .arg(Arg::new("url").long("url").required(true).help("Site base URL"))
                .arg(
                    Arg::new("key")
                        .long("key")
                        .required(true)
                        .help("REST API consumer key"),
                )
                .arg(
                    Arg::new("secret")
                        .long("secret")
                        .required(true)
                        .help("REST API consumer secret"),
                )
                .arg(
                    Arg::new("no-test")
                        .long("no-test")
                        .action(ArgAction::SetTrue)
                        .help("Register without checking the connection first"),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Change a store definition")
                .arg(Arg::new("id").required(true).help("Store id"))
                .arg(Arg::new("name").long("name").help("Display name"))
                .arg(Arg::new("url").long("url").help("Site base URL"))
                .arg(Arg::new("key").long("key").help("REST API consumer key"))
                .arg(Arg::new("secret").long("secret").help("REST API consumer secret")),
        )
        .subcommand(Command::new("list").about("List registered stores"))
        .subcommand(
            Command::new("remove")
                .about("Remove a store")
                .arg(Arg::new("id").required(true).help("Store id")),
        )
        .subcommand(
            Command::new("test")
                .about("Check the connection to a store")
                .arg(Arg::new("id").required(true).help("Store id")),
        )
}

fn orders_command() -> Command {
    Command::new("orders")
        .about("List and change orders")
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("Show one page of filtered orders")
                .arg(Arg::new("search").long("search").help("Free-text search"))
                .arg(Arg::new("status").long("status").help("Exact status"))
                .arg(Arg::new("store").long("store").help("Store id"))
                .arg(
                    Arg::new("since")
                        .long("since")
                        .value_parser(["all", "today", "week", "month"])
                        .default_value("all")
                        .help("Creation-date window"),
                )
                .arg(
                    Arg::new("page")
                        .long("page")
                        .default_value("1")
                        .value_parser(value_parser!(usize))
                        .help("1-based page number"),
                )
                .arg(
                    Arg::new("per-page")
                        .long("per-page")
                        .value_parser(value_parser!(usize))
                        .help("Page size; defaults to the shared screen options"),
                ),
        )
        .subcommand(
            Command::new("set-status")
                .about("Change the status of several orders")
                .arg(
                    Arg::new("status")
                        .long("status")
                        .required(true)
                        .help("New status"),
                )
                .arg(
                    Arg::new("keys")
                        .value_name("KEY")
                        .num_args(1..)
                        .required(true)
                        .help("Orders as <store>-<order>"),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Change one billing field of an order")
                .arg(Arg::new("store").long("store").required(true).help("Store id"))
                .arg(
                    Arg::new("order")
                        .long("order")
                        .required(true)
                        .value_parser(value_parser!(u64))
                        .help("Order id"),
                )
                .arg(
                    Arg::new("field")
                        .long("field")
                        .required(true)
                        .help("Billing field, e.g. phone or address_1"),
                )
                .arg(Arg::new("value").long("value").required(true).help("New value")),
        )
}

fn options_command() -> Command {
    Command::new("options")
        .about("Shared display preferences")
        .subcommand_required(true)
        .subcommand(Command::new("show").about("Print the current preferences"))
        .subcommand(
            Command::new("set-columns")
                .about("Show or hide table columns")
                .arg(
                    Arg::new("show")
                        .long("show")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .help("Columns to show"),
                )
                .arg(
                    Arg::new("hide")
                        .long("hide")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .help("Columns to hide"),
                ),
        )
        .subcommand(
            Command::new("set-per-page")
                .about("Change the table page size")
                .arg(
                    Arg::new("items")
                        .required(true)
                        .value_parser(value_parser!(u32))
                        .help("Orders per page, 1 to 100"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = command()
            .try_get_matches_from(["orderdesk", "sync", "--log-json", "--config", "x.toml"])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("x.toml"))
        );
    }

    #[test]
    fn rejects_unknown_date_range() {
        let result =
            command().try_get_matches_from(["orderdesk", "orders", "list", "--since", "year"]);
        assert!(result.is_err());
    }
}
