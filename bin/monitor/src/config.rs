//! Environment-driven configuration for the monitor binaries.
//!
//! Everything is read once at startup. Missing endpoints or a missing signer
//! are fatal; the Telegram transport and the metrics exporter are optional.

use ::config::{AddressError, ContractAddresses};
use alloy_primitives::TxHash;
use std::{env, num::ParseIntError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing env var: {0}")]
    MissingEnv(String),

    #[error("invalid integer in env var {name}: {source}")]
    InvalidInteger { name: String, source: ParseIntError },

    #[error("no signer configured: set KMS_KEY_ID or PRIV_KEY")]
    MissingSigner,

    #[error("invalid transaction hash in WITHDRAWAL_TX_HASH: {0}")]
    InvalidTxHash(String),

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Which signing backend to use. KMS takes precedence over a local key.
#[derive(Debug, Clone)]
pub enum SignerConfig {
    Kms {
        key_id: String,
        region: Option<String>,
    },
    PrivateKey(String),
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
    pub topic_id: Option<i32>,
}

/// Top-level monitor configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// L1 RPC endpoint url
    pub l1_rpc_url: String,

    /// L2 RPC endpoint url
    pub l2_rpc_url: String,

    /// Signing backend for L1 transactions
    pub signer: SignerConfig,

    /// Contract addresses (Mantle mainnet defaults + overrides)
    pub contracts: ContractAddresses,

    /// L2 withdrawal transaction hashes to track
    pub withdrawal_tx_hashes: Vec<TxHash>,

    /// Optional Telegram notification transport
    pub telegram: Option<TelegramConfig>,

    /// Optional Prometheus exporter port
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let l1_rpc_url = read_required("L1_RPC")?;
        let l2_rpc_url = read_required("L2_RPC")?;

        let signer = signer_config(
            env::var("KMS_KEY_ID").ok(),
            env::var("AWS_REGION").ok(),
            env::var("PRIV_KEY").ok(),
        )?;

        let contracts = ContractAddresses::from_env()?;

        let withdrawal_tx_hashes = match env::var("WITHDRAWAL_TX_HASH") {
            Ok(raw) => parse_tx_hashes(&raw)?,
            Err(_) => Vec::new(),
        };

        let telegram = match env::var("TELEGRAM_BOT_TOKEN") {
            Ok(bot_token) => Some(TelegramConfig {
                bot_token,
                chat_id: read_i64("TELEGRAM_CHAT_ID")?,
                topic_id: read_optional_i32("TELEGRAM_TOPIC_ID")?,
            }),
            Err(_) => None,
        };

        let metrics_port = match env::var("METRICS_PORT") {
            Ok(raw) => Some(raw.parse().map_err(|source| ConfigError::InvalidInteger {
                name: "METRICS_PORT".to_owned(),
                source,
            })?),
            Err(_) => None,
        };

        Ok(Self {
            l1_rpc_url,
            l2_rpc_url,
            signer,
            contracts,
            withdrawal_tx_hashes,
            telegram,
            metrics_port,
        })
    }
}

/// Resolve the signing backend. KMS wins when both are present; neither
/// present is a startup error.
fn signer_config(
    kms_key_id: Option<String>,
    aws_region: Option<String>,
    private_key: Option<String>,
) -> Result<SignerConfig, ConfigError> {
    if let Some(key_id) = kms_key_id {
        return Ok(SignerConfig::Kms {
            key_id,
            region: aws_region,
        });
    }
    if let Some(key) = private_key {
        return Ok(SignerConfig::PrivateKey(key));
    }
    Err(ConfigError::MissingSigner)
}

/// Parse a comma-separated list of L2 transaction hashes.
fn parse_tx_hashes(raw: &str) -> Result<Vec<TxHash>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| ConfigError::InvalidTxHash(part.to_owned()))
        })
        .collect()
}

fn read_required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_owned()))
}

fn read_i64(name: &str) -> Result<i64, ConfigError> {
    let raw = read_required(name)?;
    raw.parse().map_err(|source| ConfigError::InvalidInteger {
        name: name.to_owned(),
        source,
    })
}

fn read_optional_i32(name: &str) -> Result<Option<i32>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|source| ConfigError::InvalidInteger {
                name: name.to_owned(),
                source,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    #[test]
    fn test_kms_takes_precedence() {
        let signer = signer_config(
            Some("key-1".to_owned()),
            Some("eu-west-1".to_owned()),
            Some("deadbeef".to_owned()),
        )
        .unwrap();

        assert!(matches!(signer, SignerConfig::Kms { ref key_id, .. } if key_id == "key-1"));
    }

    #[test]
    fn test_private_key_used_without_kms() {
        let signer = signer_config(None, None, Some("deadbeef".to_owned())).unwrap();
        assert!(matches!(signer, SignerConfig::PrivateKey(ref key) if key == "deadbeef"));
    }

    #[test]
    fn test_no_signer_is_fatal() {
        let result = signer_config(None, Some("eu-west-1".to_owned()), None);
        assert!(matches!(result, Err(ConfigError::MissingSigner)));
    }

    #[test]
    fn test_parse_tx_hashes_csv() {
        let hashes = parse_tx_hashes(
            "0x0101010101010101010101010101010101010101010101010101010101010101, \
             0x0202020202020202020202020202020202020202020202020202020202020202",
        )
        .unwrap();

        assert_eq!(
            hashes,
            vec![
                b256!("0101010101010101010101010101010101010101010101010101010101010101"),
                b256!("0202020202020202020202020202020202020202020202020202020202020202"),
            ]
        );
    }

    #[test]
    fn test_parse_tx_hashes_skips_empty_segments() {
        let hashes = parse_tx_hashes(
            ",0x0101010101010101010101010101010101010101010101010101010101010101,,",
        )
        .unwrap();
        assert_eq!(hashes.len(), 1);
    }

    #[test]
    fn test_parse_tx_hashes_rejects_garbage() {
        let result = parse_tx_hashes("0x01,nonsense");
        assert!(matches!(result, Err(ConfigError::InvalidTxHash(_))));
    }
}
