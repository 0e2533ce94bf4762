//! Scheduler binary for the Mantle withdrawal monitor.
//!
//! `check` runs a single tick and exits; `start` runs the ticker loop until
//! every tracked withdrawal has finalized or the process receives
//! SIGINT/SIGTERM.

use clap::{Parser, Subcommand};
use monitor::{
    build_signer,
    config::Config,
    metrics::install_prometheus_exporter,
    scheduler::TICK_INTERVAL,
    Monitor,
};
use notify::{NoopNotifier, Notifier, TelegramNotifier};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

#[derive(Parser)]
#[command(name = "monitor")]
#[command(about = "Drive Mantle L2→L1 withdrawals through prove and finalize")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single tick over the tracked withdrawals, then exit
    Check,

    /// Run the ticker loop until all tracked withdrawals are finalized
    Start,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if config.withdrawal_tx_hashes.is_empty() {
        eyre::bail!("WITHDRAWAL_TX_HASH must list at least one L2 transaction hash");
    }

    info!("Loaded config:");
    info!("  L1 RPC URL: {}", config.l1_rpc_url);
    info!("  L2 RPC URL: {}", config.l2_rpc_url);
    info!("  L1 Portal: {}", config.contracts.l1_optimism_portal);
    info!("  L2 Output Oracle: {}", config.contracts.l2_output_oracle);
    info!("  Tracking {} withdrawal(s)", config.withdrawal_tx_hashes.len());

    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!("  Metrics: 0.0.0.0:{}", port);
    }

    let l1_provider = client::create_provider(&config.l1_rpc_url).await?;
    let l2_provider = client::create_provider(&config.l2_rpc_url).await?;

    let (signer, sender) = build_signer(&config.signer, &l1_provider).await?;
    info!("  Sender: {}", sender);

    let notifier: Box<dyn Notifier> = match &config.telegram {
        Some(telegram) => Box::new(TelegramNotifier::new(
            telegram.bot_token.clone(),
            telegram.chat_id,
            telegram.topic_id,
        )),
        None => Box::new(NoopNotifier),
    };

    let mut monitor = Monitor::new(
        l1_provider,
        l2_provider,
        signer,
        sender,
        config.contracts,
        notifier,
        &config.withdrawal_tx_hashes,
    );

    match cli.command {
        Command::Check => {
            info!("Running single tick");
            if monitor.run_tick().await {
                monitor.notify_all_completed().await;
                info!("All withdrawals finalized");
            }
        }
        Command::Start => {
            info!("Starting scheduler loop");

            // A tick that overruns the interval skips the missed firing
            // rather than queueing it.
            let mut interval = time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut sigterm = signal(SignalKind::terminate())?;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if monitor.run_tick().await {
                            monitor.notify_all_completed().await;
                            info!("All withdrawals finalized; exiting");
                            break;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received SIGINT, shutting down");
                        break;
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
