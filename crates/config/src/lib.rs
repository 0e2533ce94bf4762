//! Configuration types for the withdrawal monitor.
//!
//! This crate provides:
//! - The flat contract-address record with Mantle mainnet defaults
//! - Per-contract environment overrides, applied once at startup

pub mod contracts;

pub use contracts::{AddressError, ContractAddresses};
