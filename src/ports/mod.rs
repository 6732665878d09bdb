//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - The DEX-aggregator HTTP API (price, quote, submit, status)
//! - Wallet signing and on-chain ERC-20 access
//! - USD price feeds for position monitoring

pub mod mocks;
pub mod models;
pub mod price_feed;
pub mod swap_api;
pub mod wallet;

pub use price_feed::{PriceFeedError, PriceFeedPort};
pub use swap_api::{SwapApiError, SwapApiPort};
pub use wallet::{ChainError, ChainPort, WalletError, WalletPort};
