//! EVM Adapter
//!
//! Implementation of the WalletPort and ChainPort for EVM chains via
//! a local private key: EIP-712 signing, ERC-20 approvals and reads,
//! and native currency wrapping.

mod chain;
mod signer;

pub use chain::EvmChain;
pub use signer::EvmWallet;
