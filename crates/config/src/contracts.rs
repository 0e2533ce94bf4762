//! Contract addresses for the Mantle bridge.
//!
//! A single flat record covering every contract the monitor touches, with
//! production Mantle mainnet defaults. Each address can be overridden through
//! one environment variable at startup; the record is immutable afterwards.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::env::{self, VarError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddressError {
    /// An override env var is set but does not parse as an address
    #[error("invalid address in {name}: {value}")]
    Invalid { name: String, value: String },
}

/// Contract addresses used by the monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// OptimismPortal on L1 (prove + finalize)
    pub l1_optimism_portal: Address,
    /// L2OutputOracle on L1 (proposed output roots)
    pub l2_output_oracle: Address,
    /// L1CrossDomainMessenger
    pub l1_cross_domain_messenger: Address,
    /// L1StandardBridge
    pub l1_standard_bridge: Address,
    /// L2CrossDomainMessenger (predeploy)
    pub l2_cross_domain_messenger: Address,
    /// L2ToL1MessagePasser (predeploy)
    pub l2_to_l1_message_passer: Address,
    /// L2StandardBridge (predeploy)
    pub l2_standard_bridge: Address,
}

impl ContractAddresses {
    /// Production Mantle mainnet addresses.
    pub const fn mantle_mainnet() -> Self {
        Self {
            l1_optimism_portal: address!("c54cb22944f2be476e02decfcd7e3e7d3e15a8fb"),
            l2_output_oracle: address!("31d543e7be1da6efdc2206ef7822879045b9f481"),
            l1_cross_domain_messenger: address!("676a795fe6e43c17c668de16730c3f690feb7120"),
            l1_standard_bridge: address!("95fc37a27a2f68e3a647cdc081f0a89bb47c3012"),
            l2_cross_domain_messenger: address!("4200000000000000000000000000000000000007"),
            l2_to_l1_message_passer: address!("4200000000000000000000000000000000000016"),
            l2_standard_bridge: address!("4200000000000000000000000000000000000010"),
        }
    }

    /// Mainnet defaults with per-contract env overrides applied.
    pub fn from_env() -> Result<Self, AddressError> {
        let mut contracts = Self::mantle_mainnet();

        apply_override("L1_OPTIMISM_PORTAL", &mut contracts.l1_optimism_portal)?;
        apply_override("L2_OUTPUT_ORACLE", &mut contracts.l2_output_oracle)?;
        apply_override(
            "L1_CROSS_DOMAIN_MESSENGER",
            &mut contracts.l1_cross_domain_messenger,
        )?;
        apply_override("L1_STANDARD_BRIDGE", &mut contracts.l1_standard_bridge)?;
        apply_override(
            "L2_CROSS_DOMAIN_MESSENGER",
            &mut contracts.l2_cross_domain_messenger,
        )?;
        apply_override(
            "L2_TO_L1_MESSAGE_PASSER",
            &mut contracts.l2_to_l1_message_passer,
        )?;
        apply_override("L2_STANDARD_BRIDGE", &mut contracts.l2_standard_bridge)?;

        Ok(contracts)
    }
}

fn apply_override(name: &str, slot: &mut Address) -> Result<(), AddressError> {
    match env::var(name) {
        Ok(raw) => {
            let parsed = raw.parse().map_err(|_| AddressError::Invalid {
                name: name.to_owned(),
                value: raw.clone(),
            })?;
            *slot = parsed;
            Ok(())
        }
        Err(VarError::NotPresent) => Ok(()),
        Err(VarError::NotUnicode(_)) => Err(AddressError::Invalid {
            name: name.to_owned(),
            value: "<non-unicode>".to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_defaults() {
        let contracts = ContractAddresses::mantle_mainnet();
        assert_eq!(
            contracts.l2_to_l1_message_passer,
            address!("4200000000000000000000000000000000000016")
        );
        assert_eq!(
            contracts.l2_cross_domain_messenger,
            address!("4200000000000000000000000000000000000007")
        );
        assert_ne!(contracts.l1_optimism_portal, Address::ZERO);
        assert_ne!(contracts.l2_output_oracle, Address::ZERO);
    }

    #[test]
    fn test_override_applies() {
        let mut slot = Address::ZERO;
        env::set_var(
            "TEST_CONTRACT_OVERRIDE",
            "0x1111111111111111111111111111111111111111",
        );
        apply_override("TEST_CONTRACT_OVERRIDE", &mut slot).unwrap();
        assert_eq!(slot, address!("1111111111111111111111111111111111111111"));
        env::remove_var("TEST_CONTRACT_OVERRIDE");
    }

    #[test]
    fn test_override_rejects_garbage() {
        let mut slot = Address::ZERO;
        env::set_var("TEST_CONTRACT_GARBAGE", "not-an-address");
        let result = apply_override("TEST_CONTRACT_GARBAGE", &mut slot);
        assert!(result.is_err());
        env::remove_var("TEST_CONTRACT_GARBAGE");
    }

    #[test]
    fn test_missing_override_keeps_default() {
        let default = ContractAddresses::mantle_mainnet().l1_optimism_portal;
        let mut slot = default;
        apply_override("TEST_CONTRACT_UNSET", &mut slot).unwrap();
        assert_eq!(slot, default);
    }
}
