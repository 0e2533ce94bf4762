//! Operator CLI for a single withdrawal.
//!
//! Runs one step of the pipeline by hand:
//! - `status`: decode the withdrawal and print its portal state
//! - `prove`: generate the proof and submit proveWithdrawalTransaction
//! - `finalize`: submit finalizeWithdrawalTransaction

use action::{
    finalize::{Finalize, FinalizeAction},
    prove::{Prove, ProveAction},
    PortalAction,
};
use alloy_primitives::TxHash;
use clap::{Parser, Subcommand};
use monitor::{build_signer, config::Config, materialize_message};
use tracing::info;
use withdrawal::{
    proof::{generate_proof, ProveReadiness},
    state::{finalize_time, WithdrawalStateProvider},
    types::WithdrawalStatus,
};

#[derive(Parser)]
#[command(name = "operator")]
#[command(about = "Run individual withdrawal steps by hand")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the withdrawal's current lifecycle status
    #[command(visible_alias = "check")]
    Status {
        /// L2 transaction hash of the withdrawal
        #[arg(long)]
        tx_hash: TxHash,
    },

    /// Generate the proof and prove the withdrawal on L1
    Prove {
        #[arg(long)]
        tx_hash: TxHash,
    },

    /// Finalize the proven withdrawal on L1
    #[command(visible_alias = "claim")]
    Finalize {
        #[arg(long)]
        tx_hash: TxHash,
    },
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

    let l1_provider = client::create_provider(&config.l1_rpc_url).await?;
    let l2_provider = client::create_provider(&config.l2_rpc_url).await?;

    match cli.command {
        Command::Status { tx_hash } => {
            let message = materialize_message(&l2_provider, &config.contracts, tx_hash).await?;
            let state = WithdrawalStateProvider::new(
                l1_provider.clone(),
                config.contracts.l1_optimism_portal,
            );
            let status = state.query_status(message.withdrawal_hash).await?;

            info!("Withdrawal {}", message.withdrawal_hash);
            info!("  L2 block: {}", message.l2_block_number);
            info!("  Nonce: {}", message.nonce);
            info!("  MNT value: {}", message.mnt_value);
            info!("  ETH value: {}", message.eth_value);
            info!("  Status: {:?} (code {})", status, status.code());
            if let WithdrawalStatus::Proven { timestamp } = status {
                info!("  Proven at: {}", timestamp);
                info!("  Finalize available at: {}", finalize_time(timestamp));
            }
        }
        Command::Prove { tx_hash } => {
            let message = materialize_message(&l2_provider, &config.contracts, tx_hash).await?;
            let (signer, sender) = build_signer(&config.signer, &l1_provider).await?;

            let readiness = generate_proof(
                &l1_provider,
                &l2_provider,
                config.contracts.l2_output_oracle,
                config.contracts.l2_to_l1_message_passer,
                message.withdrawal_transaction(),
                message.withdrawal_hash,
                message.l2_block_number,
            )
            .await?;

            match readiness {
                ProveReadiness::AwaitingOutput {
                    withdrawal_block,
                    proposed_block,
                } => {
                    info!(
                        withdrawal_block,
                        proposed_block,
                        "No proposed output covers the withdrawal yet; try again later"
                    );
                }
                ProveReadiness::Ready(params) => {
                    let mut action = ProveAction::new(
                        l1_provider.clone(),
                        signer,
                        Prove {
                            portal_address: config.contracts.l1_optimism_portal,
                            params,
                            withdrawal_hash: message.withdrawal_hash,
                            from: sender,
                        },
                    );
                    let result = action.execute().await?;
                    info!(tx_hash = %result.tx_hash, "Prove submitted and mined");
                }
            }
        }
        Command::Finalize { tx_hash } => {
            let message = materialize_message(&l2_provider, &config.contracts, tx_hash).await?;
            let (signer, sender) = build_signer(&config.signer, &l1_provider).await?;

            let mut action = FinalizeAction::new(
                l1_provider.clone(),
                signer,
                Finalize {
                    portal_address: config.contracts.l1_optimism_portal,
                    withdrawal: message.withdrawal_transaction(),
                    withdrawal_hash: message.withdrawal_hash,
                    from: sender,
                },
            );
            let result = action.execute().await?;
            info!(tx_hash = %result.tx_hash, "Finalize submitted and mined");
        }
    }

    Ok(())
}
