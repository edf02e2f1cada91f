use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use complaint_escalation::EscalationConfig;

/// Periodically escalates overdue complaints and notifies the parties.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML config file (otherwise configuration comes from the environment)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Minutes between sweeps (overrides ESCALATION_CHECK_INTERVAL_MINUTES)
    #[arg(long)]
    pub interval_minutes: Option<u64>,

    /// Run a single sweep, print the result as JSON and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// JSON array of complaints to load into the in-memory store
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Send a test notification to this address and exit
    #[arg(long)]
    pub test_email: Option<String>,
}

impl Args {
    /// Resolve configuration from file or environment, then apply flags.
    pub fn load_config(&self) -> Result<EscalationConfig> {
        let mut config = match &self.config {
            Some(path) => EscalationConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => EscalationConfig::default(),
        };
        if let Some(minutes) = self.interval_minutes {
            config.check_interval_minutes = minutes;
        }
        config.validate().context("Invalid escalation configuration")?;
        Ok(config)
    }
}
