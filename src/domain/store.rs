//! Bot State Store
//!
//! JSON-file persistence for users, orders and trades. A single state
//! file under the data directory survives restarts so open positions
//! can be resumed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::order::{Order, OrderError, TradeRecord, User};

/// Default state file name
pub const DEFAULT_STATE_FILE: &str = "bot_state.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize state: {0}")]
    SerializationError(String),

    #[error("failed to deserialize state: {0}")]
    DeserializationError(String),

    #[error("failed to write state file: {0}")]
    WriteError(String),

    #[error("failed to read state file: {0}")]
    ReadError(String),

    #[error("failed to create data directory: {0}")]
    DirectoryError(String),

    #[error("unknown user {0}")]
    UserNotFound(String),

    #[error("order {order_id} not found for user {wallet}")]
    OrderNotFound { wallet: String, order_id: u64 },

    #[error("trade with hash {0} already recorded")]
    DuplicateTrade(String),

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// On-disk state: every known user with their full order history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotState {
    pub users: Vec<User>,
}

/// Outcome of loading state on startup
#[derive(Debug, Clone)]
pub enum RecoveryStatus {
    /// No state file yet
    NoState,
    /// State loaded successfully
    Recovered(BotState),
    /// State file unreadable, manual intervention needed
    Corrupted(String),
}

impl BotState {
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::DirectoryError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        fs::write(path, content).map_err(|e| StoreError::WriteError(e.to_string()))?;
        tracing::debug!("State saved: {} users", self.users.len());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Option<Self>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(path).map_err(|e| StoreError::ReadError(e.to_string()))?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let state: Self = serde_json::from_str(&content)
            .map_err(|e| StoreError::DeserializationError(e.to_string()))?;
        Ok(Some(state))
    }

    /// Load with corruption reported as a status instead of an error.
    pub fn try_recover(path: &Path) -> RecoveryStatus {
        if !path.exists() {
            return RecoveryStatus::NoState;
        }

        match Self::load(path) {
            Ok(Some(state)) => RecoveryStatus::Recovered(state),
            Ok(None) => RecoveryStatus::NoState,
            Err(e) => RecoveryStatus::Corrupted(e.to_string()),
        }
    }

    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join(DEFAULT_STATE_FILE)
    }
}

/// Store manager over a data directory. Every mutating operation writes
/// the state file through before returning.
#[derive(Debug)]
pub struct BotStore {
    data_dir: PathBuf,
    state: BotState,
}

impl BotStore {
    /// Open the store, loading existing state if present.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        let state = BotState::load(&BotState::default_path(&data_dir))?.unwrap_or_default();

        if !state.users.is_empty() {
            tracing::info!(
                "Loaded bot state: {} user(s), {} order(s)",
                state.users.len(),
                state.users.iter().map(|u| u.orders.len()).sum::<usize>()
            );
        }

        Ok(Self { data_dir, state })
    }

    pub fn state_path(&self) -> PathBuf {
        BotState::default_path(&self.data_dir)
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.state.save(&self.state_path())
    }

    pub fn user(&self, wallet: &str) -> Option<&User> {
        self.state
            .users
            .iter()
            .find(|u| u.wallet_address.eq_ignore_ascii_case(wallet))
    }

    fn user_mut(&mut self, wallet: &str) -> Result<&mut User, StoreError> {
        self.state
            .users
            .iter_mut()
            .find(|u| u.wallet_address.eq_ignore_ascii_case(wallet))
            .ok_or_else(|| StoreError::UserNotFound(wallet.to_string()))
    }

    /// Find a user by wallet address, creating the record if missing.
    pub fn find_or_create_user(&mut self, wallet: &str) -> Result<User, StoreError> {
        if let Some(user) = self.user(wallet) {
            return Ok(user.clone());
        }

        tracing::info!("Creating user record for {}", wallet);
        self.state.users.push(User::new(wallet.to_string()));
        self.persist()?;
        self.user(wallet)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound(wallet.to_string()))
    }

    /// The open order for (wallet, token), if one exists.
    pub fn open_order(&self, wallet: &str, token: &str) -> Option<Order> {
        self.user(wallet).and_then(|u| u.open_order(token)).cloned()
    }

    /// Id the next order for this user should take.
    pub fn next_order_id(&self, wallet: &str) -> u64 {
        self.user(wallet).map_or(1, |u| u.next_order_id())
    }

    /// Create a new open order. Fails if one is already open for the
    /// same (user, token) pair.
    pub fn create_order(&mut self, wallet: &str, order: Order) -> Result<(), StoreError> {
        self.user_mut(wallet)?.push_order(order)?;
        self.persist()
    }

    /// Append an executed trade leg to an order. Transaction hashes are
    /// unique across the whole store.
    pub fn record_trade(
        &mut self,
        wallet: &str,
        order_id: u64,
        trade: TradeRecord,
    ) -> Result<(), StoreError> {
        let duplicate = self
            .state
            .users
            .iter()
            .flat_map(|u| u.orders.iter())
            .flat_map(|o| o.trades.iter())
            .any(|t| t.txn_hash == trade.txn_hash);
        if duplicate {
            return Err(StoreError::DuplicateTrade(trade.txn_hash));
        }

        let user = self.user_mut(wallet)?;
        let order = user
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| StoreError::OrderNotFound {
                wallet: wallet.to_string(),
                order_id,
            })?;

        order.trades.push(trade);
        self.persist()
    }

    /// Close an order with its realized profit and roll the profit into
    /// the user's running total.
    pub fn complete_order(
        &mut self,
        wallet: &str,
        order_id: u64,
        pnl: f64,
    ) -> Result<(), StoreError> {
        let user = self.user_mut(wallet)?;
        let order = user
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| StoreError::OrderNotFound {
                wallet: wallet.to_string(),
                order_id,
            })?;

        order.complete(pnl);
        user.total_pnl += pnl;
        self.persist()
    }

    pub fn total_pnl(&self, wallet: &str) -> f64 {
        self.user(wallet).map_or(0.0, |u| u.total_pnl)
    }
}
