//! EVM Chain Access
//!
//! On-chain reads and the two transactions the gasless flow still pays
//! gas for: the standard ERC-20 approval fallback and wrapping native
//! currency. Every transaction waits for one confirmation and checks
//! the receipt status before reporting success.

use std::str::FromStr;

use async_trait::async_trait;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;

use crate::ports::wallet::{ChainError, ChainPort};

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
    }

    #[sol(rpc)]
    interface IWETH {
        function deposit() external payable;
    }
}

/// Chain adapter bound to one RPC endpoint and one signing key
pub struct EvmChain {
    rpc_url: reqwest::Url,
    signer: PrivateKeySigner,
    weth_address: Address,
}

impl EvmChain {
    pub fn new(rpc_url: &str, signer: PrivateKeySigner, weth_address: &str) -> Result<Self, ChainError> {
        let rpc_url = rpc_url
            .parse()
            .map_err(|e| ChainError::Transport(format!("invalid RPC URL: {}", e)))?;
        let weth_address = parse_address(weth_address)?;

        Ok(Self {
            rpc_url,
            signer,
            weth_address,
        })
    }

    fn wallet_address(&self) -> Address {
        self.signer.address()
    }

    /// Read-only provider, no signing capability.
    fn read_provider(&self) -> impl Provider + Clone {
        ProviderBuilder::new().connect_http(self.rpc_url.clone())
    }

    /// Provider that signs and sends with the wallet key.
    fn write_provider(&self) -> impl Provider + Clone {
        ProviderBuilder::new()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .connect_http(self.rpc_url.clone())
    }
}

fn parse_address(value: &str) -> Result<Address, ChainError> {
    Address::from_str(value).map_err(|e| ChainError::CallFailed(format!("invalid address {}: {}", value, e)))
}

#[async_trait]
impl ChainPort for EvmChain {
    async fn approve_max(&self, token: &str, spender: &str) -> Result<String, ChainError> {
        let token = parse_address(token)?;
        let spender = parse_address(spender)?;

        let provider = self.write_provider();
        let erc20 = IERC20::new(token, provider.clone());

        tracing::info!("Sending approval for spender {} on token {}", spender, token);

        let pending = erc20
            .approve(spender, U256::MAX)
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("failed to send approval: {}", e)))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transport(format!("failed to confirm approval: {}", e)))?;

        let tx_hash = format!("{:?}", receipt.transaction_hash);
        if !receipt.status() {
            return Err(ChainError::Reverted(tx_hash));
        }

        tracing::info!("Approval confirmed in {}", tx_hash);
        Ok(tx_hash)
    }

    async fn token_decimals(&self, token: &str) -> Result<u8, ChainError> {
        let token = parse_address(token)?;
        let provider = self.read_provider();
        let erc20 = IERC20::new(token, provider.clone());

        erc20
            .decimals()
            .call()
            .await
            .map_err(|e| ChainError::CallFailed(format!("decimals() failed: {}", e)))
    }

    async fn token_balance(&self, token: &str) -> Result<u128, ChainError> {
        let token = parse_address(token)?;
        let provider = self.read_provider();
        let erc20 = IERC20::new(token, provider.clone());

        let balance = erc20
            .balanceOf(self.wallet_address())
            .call()
            .await
            .map_err(|e| ChainError::CallFailed(format!("balanceOf() failed: {}", e)))?;

        u128::try_from(balance).map_err(|_| ChainError::CallFailed("balance exceeds u128".to_string()))
    }

    async fn wrap_native(&self, amount: u128) -> Result<String, ChainError> {
        let provider = self.write_provider();
        let weth = IWETH::new(self.weth_address, provider.clone());

        tracing::info!("Wrapping {} wei of native currency", amount);

        let pending = weth
            .deposit()
            .value(U256::from(amount))
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("failed to send deposit: {}", e)))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transport(format!("failed to confirm deposit: {}", e)))?;

        let tx_hash = format!("{:?}", receipt.transaction_hash);
        if !receipt.status() {
            return Err(ChainError::Reverted(tx_hash));
        }

        Ok(tx_hash)
    }
}
