//! Rights Vat
//!
//! Hosts two issuers and an escrow book in one process and runs a barter
//! exchange between Alice and Bob, logging the final balances.
//!
//! # Usage
//!
//! ```bash
//! # Default exchange: 3 moola for at least 4 simoleans
//! rights-vat
//!
//! # Custom config file
//! rights-vat --config /path/to/vat.toml
//!
//! # Environment overrides
//! RIGHTS__BARTER__ALICE_WANTS=5 rights-vat
//! ```

mod config;
mod exchange;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::VatConfig;

/// Rights Vat - barter exchange over escrowed payments
#[derive(Parser, Debug)]
#[command(name = "rights-vat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "RIGHTS_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RIGHTS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "RIGHTS_LOG_FORMAT")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut vat_config = VatConfig::load(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        vat_config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        vat_config.logging.format = format;
    }

    init_logging(&vat_config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting rights vat");

    let outcome = exchange::run_barter(&vat_config.barter).await?;

    tracing::info!(
        alice_moola = %outcome.alice_moola,
        alice_simoleans = %outcome.alice_simoleans,
        bob_moola = %outcome.bob_moola,
        bob_simoleans = %outcome.bob_simoleans,
        "Barter complete"
    );
    Ok(())
}

fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }

    Ok(())
}
