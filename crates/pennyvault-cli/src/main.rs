//! PennyVault CLI - Round-up micro-savings into an on-chain vault
//!
//! # Quick Start
//!
//! ```bash
//! # Round-ups of the sample data
//! pennyvault roundups
//!
//! # Full flow against an in-memory wallet
//! PENNYVAULT__VAULT__ADDRESS=0x119cfa5bf364b5d4f9d66c8e65fc46bd5b42c8ba \
//!     pennyvault --simulate save
//!
//! # Against a dev node or signing relay
//! pennyvault --rpc-url http://localhost:8545 save --file spending.json
//! ```

mod commands;
mod config;
mod display;

use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::{address, Address};
use clap::{Parser, Subcommand};
use pennyvault_core::AppContext;
use pennyvault_types::{AppConfig, PennyVaultError};
use pennyvault_wallet::{
    JsonRpcConfig, JsonRpcWallet, SimulatedWallet, TokioClock, WalletHost, WalletProvider,
};

/// Account exposed by the simulated wallet
const SIMULATED_ACCOUNT: Address = address!("00000000000000000000000000000000000a11ce");

/// The simulated wallet starts on Ethereum mainnet so the switch is exercised
const SIMULATED_START_CHAIN: u64 = 1;

/// PennyVault CLI - save the spare change of every purchase
#[derive(Parser)]
#[command(name = "pennyvault")]
#[command(author = "PennyVault Contributors")]
#[command(version)]
#[command(about = "Round up purchases and deposit the difference into an on-chain vault", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, global = true, env = "PENNYVAULT_CONFIG")]
    config: Option<String>,

    /// Use an in-memory wallet instead of JSON-RPC
    #[arg(long, global = true)]
    simulate: bool,

    /// JSON-RPC endpoint of the wallet (defaults to the chain RPC URL)
    #[arg(long, global = true, env = "PENNYVAULT_WALLET_RPC")]
    rpc_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "PENNYVAULT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, global = true, env = "PENNYVAULT_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the round-up of every transaction
    Roundups {
        /// JSON array of {desc, amount, date?}; sample data if omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Connect the wallet and show the session
    Connect,

    /// Show the vault balance of the connected account
    Balance,

    /// Deposit the round-ups into the vault
    Save {
        /// JSON array of {desc, amount, date?}; sample data if omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Categorize spending and suggest savings
    Categorize {
        /// JSON array of {desc, amount, date?}; sample data if omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the raw JSON result
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut app_config = config::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        app_config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        app_config.logging.format = format.clone();
    }
    config::init_logging(&app_config.logging)?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting PennyVault CLI");

    let result = run(&cli, &app_config).await;
    if let Err(e) = &result {
        if let Some(err) = e.downcast_ref::<PennyVaultError>() {
            if err.is_connection_error() {
                display::error("Connect your wallet and try again");
            } else if matches!(err, PennyVaultError::DepositFailed { .. }) {
                display::error("Transaction failed");
            }
        }
    }
    result
}

async fn run(cli: &Cli, app_config: &AppConfig) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Roundups { file } => {
            let records = commands::load_records(file.as_deref())?;
            commands::roundups(&records);
        }
        Commands::Connect => {
            let ctx = build_context(cli, app_config)?;
            commands::connect(&ctx).await?;
        }
        Commands::Balance => {
            let ctx = build_context(cli, app_config)?;
            commands::balance(&ctx).await?;
        }
        Commands::Save { file } => {
            let records = commands::load_records(file.as_deref())?;
            let ctx = build_context(cli, app_config)?;
            commands::save(&ctx, &records).await?;
        }
        Commands::Categorize { file, json } => {
            let records = commands::load_records(file.as_deref())?;
            commands::categorize(app_config, &records, *json).await?;
        }
    }
    Ok(())
}

fn build_context(cli: &Cli, app_config: &AppConfig) -> anyhow::Result<Arc<AppContext>> {
    let wallet: Arc<dyn WalletProvider> = if cli.simulate {
        Arc::new(SimulatedWallet::new(SIMULATED_ACCOUNT, SIMULATED_START_CHAIN))
    } else {
        let url = cli
            .rpc_url
            .clone()
            .unwrap_or_else(|| app_config.chain.rpc_url.clone());
        Arc::new(JsonRpcWallet::new(
            JsonRpcConfig::new(url).with_poll_interval(app_config.timing.receipt_poll_interval()),
        )?)
    };

    let ctx = AppContext::new(
        app_config,
        WalletHost::interactive(wallet),
        Arc::new(TokioClock),
    )?;
    Ok(ctx)
}
