mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use complaint_escalation::{EscalationService, MemoryStore, Web3FormsTransport};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.load_config()?;
    info!(
        high = config.limits.high,
        medium = config.limits.medium,
        low = config.limits.low,
        interval_minutes = config.check_interval_minutes,
        endpoint = %config.notifier.endpoint,
        "Escalation daemon starting"
    );

    let store = match &args.seed {
        Some(path) => MemoryStore::from_json_file(path)
            .with_context(|| format!("Failed to load complaints from {}", path.display()))?,
        None => MemoryStore::new(),
    };
    info!(complaints = store.len(), "Record store ready");

    if config.notifier.access_key.is_empty() {
        warn!("WEB3FORMS_ACCESS_KEY is not set; the provider will refuse notifications");
    }
    let transport = Web3FormsTransport::new(config.notifier.clone())
        .context("Failed to build notification transport")?;

    let service = EscalationService::new(&config, store.shared(), Arc::new(transport));

    if let Some(address) = &args.test_email {
        let outcome = service.send_test_message(address).await?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if args.once {
        let sweep = service.run_sweep().await?;
        let stats = service.stats().await?;
        let report = serde_json::json!({ "sweep": sweep, "stats": stats });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let scheduler = service.scheduler();
    scheduler.start(config.check_interval_minutes)?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested, waiting for in-flight sweep");
    scheduler.shutdown().await;

    Ok(())
}
