//! Remote transaction signing through AWS KMS.
//!
//! The KMS signer asks the key service for signatures over transaction
//! digests; the private key never leaves KMS.

use crate::{wallet_signer_fn, ClientError, SignerFn};
use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_signer::Signer;
use alloy_signer_aws::AwsSigner;
use aws_config::{BehaviorVersion, Region};

/// Create a SignerFn backed by an AWS KMS key, plus its signing address.
///
/// # Arguments
/// * `key_id` - The KMS key id (or ARN / alias) holding the secp256k1 key
/// * `region` - Optional region override; falls back to the ambient AWS config
/// * `chain_id` - Chain id for EIP-155 replay protection
///
/// The transaction must be fully filled (nonce, gas, fees, chain_id, from)
/// before being passed to this signer. Use `fill_transaction` at the call site.
pub async fn kms_signer_fn(
    key_id: String,
    region: Option<String>,
    chain_id: u64,
) -> Result<(SignerFn, Address), ClientError> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    let sdk_config = loader.load().await;
    let kms = aws_sdk_kms::Client::new(&sdk_config);

    let signer = AwsSigner::new(kms, key_id, Some(chain_id))
        .await
        .map_err(|e| ClientError::Signer(format!("{}", e)))?;
    let address = signer.address();
    let wallet = EthereumWallet::new(signer);

    Ok((wallet_signer_fn(wallet), address))
}
