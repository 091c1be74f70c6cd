//! Demonstration binary: wires credentials and tuning overrides from the
//! environment into `AsterClient`/`Orchestrator`/`Scheduler` and prints
//! portfolio snapshots on each refresh tick. Not part of the library's
//! tested public contract — see `Cargo.toml`'s `[[bin]]` entry.

use anyhow::{Context, Result};
use aster_dn_bot::config::{Config, Credentials};
use aster_dn_bot::{AsterClient, Orchestrator, Scheduler};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Runs the delta-neutral funding-rate arbitrage scheduler")]
struct Args {
    #[arg(long, env = "ASTER_API_USER")]
    api_user: String,

    #[arg(long, env = "ASTER_API_SIGNER")]
    api_signer: String,

    #[arg(long, env = "ASTER_API_PRIVATE_KEY")]
    api_private_key: String,

    #[arg(long, env = "ASTER_APIV1_PUBLIC")]
    apiv1_public: String,

    #[arg(long, env = "ASTER_APIV1_PRIVATE")]
    apiv1_private: String,

    #[arg(long, env = "ASTER_REFRESH_INTERVAL_SECS", default_value_t = 30)]
    refresh_interval_secs: u64,

    #[arg(long, env = "ASTER_SPOT_BASE_URL")]
    spot_base_url: Option<String>,

    #[arg(long, env = "ASTER_PERP_BASE_URL")]
    perp_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let credentials = Credentials {
        api_user: args.api_user,
        api_signer: args.api_signer,
        api_private_key: args.api_private_key,
        apiv1_public: args.apiv1_public,
        apiv1_private: args.apiv1_private,
    };

    let mut config = Config::default();
    config.refresh_interval = Duration::from_secs(args.refresh_interval_secs);
    if let Some(url) = args.spot_base_url {
        config.spot_base_url = url;
    }
    if let Some(url) = args.perp_base_url {
        config.perp_base_url = url;
    }
    let refresh_interval = config.refresh_interval;

    let client = AsterClient::new(config, credentials).context("failed to construct exchange client")?;
    let orchestrator = Arc::new(Orchestrator::new(client));

    info!("warming exchange filter cache");
    orchestrator
        .client()
        .ensure_exchange_info(aster_dn_bot::types::Market::Spot, false)
        .await
        .context("failed to warm spot exchange info")?;
    orchestrator
        .client()
        .ensure_exchange_info(aster_dn_bot::types::Market::Perp, false)
        .await
        .context("failed to warm perp exchange info")?;

    let scheduler = Scheduler::new(orchestrator, refresh_interval);
    let handle = scheduler.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down scheduler");
            handle.shutdown();
        }
    });

    scheduler
        .run(|snapshot| {
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            println!("[{now}] perp account USDT: {}", snapshot.perp_account_assets_usdt);
            for position in &snapshot.analyzed_positions {
                println!(
                    "  {} delta_neutral={} imbalance={}% value=${}",
                    position.position.symbol, position.position.is_delta_neutral, position.position.imbalance_pct, position.position.position_value_usd
                );
            }
        })
        .await;

    Ok(())
}
