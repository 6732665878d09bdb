//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - ZeroEx: gasless DEX-aggregator API client and USD price feed
//! - EVM: typed-data signing and on-chain ERC-20 access
//! - CLI: Command-line interface handlers

pub mod zeroex;
pub mod evm;
pub mod cli;

pub use zeroex::{ZeroExClient, ZeroExConfig, ZeroExPriceFeed};
pub use evm::{EvmChain, EvmWallet};
pub use cli::CliApp;
