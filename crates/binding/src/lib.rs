//! Contract bindings for all external contracts.
//!
//! This crate consolidates the Solidity contract interfaces used across the
//! project: the Mantle L2 predeploys (cross-domain messenger, message passer)
//! and the L1 contracts (output oracle, portal).
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod mantle;
