use anyhow::Context;
use orderdesk_cli::{cli, logging, session, App, AppConfig};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();
    logging::init(matches.get_flag("log-json"))?;

    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(orderdesk_cli::config::DEFAULT_CONFIG_FILE));
    let config = AppConfig::load(&config_path)?.with_env_overrides();
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match matches.subcommand() {
        Some(("mirror", args)) => {
            let host = args.get_one::<String>("host").map(String::as_str);
            session::run(&config, host, &mut out).await
        }
        _ => {
            let app = App::open(config).context("failed to start")?;
            app.run(&matches, &mut out).await
        }
    }
}
