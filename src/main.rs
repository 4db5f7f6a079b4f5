// ABOUTME: CLI entrypoint for pagemill command
// ABOUTME: Handles error exit codes and command dispatch

use clap::Parser;
use pagemill::{
    api::ApiClient,
    cli::{Cli, Commands},
    config::load_config,
    properties, sync, Result,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("pagemill: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path();

    match cli.command() {
        Commands::Sync { only } => {
            let config = load_config(&config_path)?;
            let client = ApiClient::new(config.notion_api_key.clone(), None)?;
            let reports = sync::sync_all(&client, &config, only.as_deref()).await?;
            if !reports.is_empty() {
                sync::print_summary(&reports);
            }
        }
        Commands::Watch { interval } => {
            let config = load_config(&config_path)?;
            let client = ApiClient::new(config.notion_api_key.clone(), None)?;
            let interval = Duration::from_secs(interval.unwrap_or(config.sync_interval));

            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_token.cancel();
                }
            });

            sync::run_watch(&client, &config, interval, shutdown).await?;
        }
        Commands::Databases => {
            let config = load_config(&config_path)?;
            let client = ApiClient::new(config.notion_api_key.clone(), None)?;
            let databases = client.list_databases().await?;

            if databases.is_empty() {
                println!("No databases are shared with this integration.");
            }
            for db in databases {
                let title = properties::plain_text(&db.title);
                let title = title.trim();
                let display = if title.is_empty() { "(untitled)" } else { title };
                println!("{}  {}", db.id, display);
            }
        }
    }

    Ok(())
}
