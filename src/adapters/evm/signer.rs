//! EVM Typed-Data Signer
//!
//! Local-key wallet that signs the EIP-712 documents returned by the
//! quote endpoint. The typed data arrives as opaque JSON and is hashed
//! exactly as received; the 65-byte signature is rendered as
//! 0x + r(64 hex) + s(64 hex) + v(2 hex) with v in {1b, 1c}.

use async_trait::async_trait;
use serde_json::Value;

use alloy::dyn_abi::eip712::TypedData;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::ports::wallet::{WalletError, WalletPort};

/// Wallet backed by a local private key
pub struct EvmWallet {
    signer: PrivateKeySigner,
}

impl EvmWallet {
    /// Build from a raw 64-hex-char private key. The key value never
    /// appears in any error produced here.
    pub fn from_private_key(key_hex: &str) -> Result<Self, WalletError> {
        let signer: PrivateKeySigner =
            key_hex.parse().map_err(|_| WalletError::InvalidKey)?;
        Ok(Self { signer })
    }

    /// Expose the signer for on-chain transaction sending.
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

#[async_trait]
impl WalletPort for EvmWallet {
    fn address(&self) -> String {
        self.signer.address().to_string()
    }

    async fn sign_typed_data(&self, typed_data: &Value) -> Result<String, WalletError> {
        let typed: TypedData = serde_json::from_value(typed_data.clone())
            .map_err(|e| WalletError::MalformedTypedData(e.to_string()))?;

        let digest = typed
            .eip712_signing_hash()
            .map_err(|e| WalletError::MalformedTypedData(format!("EIP-712 encoding failed: {}", e)))?;

        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;

        let v = 27u8 + u8::from(signature.v());
        Ok(format!(
            "0x{:064x}{:064x}{:02x}",
            signature.r(),
            signature.s(),
            v
        ))
    }
}
