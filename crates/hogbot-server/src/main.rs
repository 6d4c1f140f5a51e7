mod config;
mod error;
mod health;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, ServerConfig};
use hogbot_core::{DiscordClient, EventDispatcher, EventSource, TriggerStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hogbot_server=debug,hogbot_core=debug".into()),
        )
        .with_target(false)
        .with_line_number(true)
        .init();

    std::panic::set_hook(Box::new(|panic| {
        error!("Unhandled panic: {}", panic);
    }));

    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.check {
        let store = TriggerStore::load(&cli.triggers)?;
        println!(
            "{}: {} trigger(s), {} enabled",
            cli.triggers.display(),
            store.len(),
            store.enabled_count()
        );
        return Ok(());
    }

    let config = ServerConfig::from_cli(&cli)?;
    let store = Arc::new(TriggerStore::load(&config.triggers_path)?);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("Health server listening on port {}", config.port);

    tokio::spawn(async move {
        if let Err(e) = health::serve(listener).await {
            error!("{:#}", e);
        }
    });

    let client: Arc<dyn EventSource> = Arc::new(DiscordClient::with_token(&config.token));
    let dispatcher = Arc::new(EventDispatcher::new(store));

    loop {
        let mut event_loop = dispatcher.clone().start(client.clone());
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                info!("Shutting down");
                event_loop.abort();
                return Ok(());
            }
            result = &mut event_loop => {
                // A panicking handler takes the loop task down; start a fresh one
                warn!("Event loop stopped ({:?}), restarting", result.err());
            }
        }
    }
}
