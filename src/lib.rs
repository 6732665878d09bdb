#![allow(dead_code, unused_imports, unused_variables)]
//! swapsmith - Gasless DEX Trading Bot Library
//!
//! Trades ERC-20 tokens through a gasless DEX-aggregator relay on
//! Ethereum. Swaps are signed as EIP-712 documents and settled by the
//! relay; the bot opens a position, watches it for take-profit,
//! stop-loss or timeout, and books the PnL in a persistent store.
//!
//! # Modules
//!
//! - `domain`: Core business logic (signatures, orders, validation, store)
//! - `ports`: Trait abstractions (SwapApiPort, WalletPort, ChainPort, PriceFeedPort)
//! - `adapters`: External implementations (ZeroEx, EVM, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Swap orchestrator, position monitor and bot engine

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
