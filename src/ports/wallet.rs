//! Wallet and Chain Ports
//!
//! Signing and on-chain access behind traits so the trade flow can run
//! against mocks. The wallet signs typed-data documents; the chain port
//! covers the ERC-20 calls the gasless path occasionally still needs.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Wallet error type
#[derive(Error, Debug)]
pub enum WalletError {
    /// Deliberately carries no detail so the key material cannot end up
    /// in logs.
    #[error("private key was rejected by the signer")]
    InvalidKey,

    #[error("typed data is malformed: {0}")]
    MalformedTypedData(String),

    #[error("signer refused the payload")]
    Declined,

    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// Chain access error type
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("transaction {0} reverted on chain")]
    Reverted(String),

    #[error("contract call failed: {0}")]
    CallFailed(String),
}

/// Typed-data signer bound to a single address
#[async_trait]
pub trait WalletPort: Send + Sync {
    /// Checksummed address of the signing key.
    fn address(&self) -> String;

    /// Sign an EIP-712 document and return the 65-byte signature as a
    /// 0x-prefixed hex string.
    async fn sign_typed_data(&self, typed_data: &Value) -> Result<String, WalletError>;
}

/// On-chain reads and the standard approval fallback
#[async_trait]
pub trait ChainPort: Send + Sync {
    /// Approve the spender for the maximum allowance and wait for one
    /// confirmation. Returns the transaction hash.
    async fn approve_max(&self, token: &str, spender: &str) -> Result<String, ChainError>;

    /// ERC-20 decimals for a token contract.
    async fn token_decimals(&self, token: &str) -> Result<u8, ChainError>;

    /// ERC-20 balance of the wallet, base units.
    async fn token_balance(&self, token: &str) -> Result<u128, ChainError>;

    /// Wrap native currency into its ERC-20 form, waiting for one
    /// confirmation.
    async fn wrap_native(&self, amount: u128) -> Result<String, ChainError>;
}
