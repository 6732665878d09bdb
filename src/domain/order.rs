//! Bot Records
//!
//! User, order and trade record types persisted by the bot, plus the
//! validated parameter bundle a new position starts from.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::validate::{
    validate_amount, validate_stop_loss, validate_take_profit, validate_timeout,
    validate_token_address, ValidationError,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    #[error("an open order already exists for token {0}")]
    OpenOrderExists(String),
}

/// Validated inputs for opening a position
#[derive(Debug, Clone, PartialEq)]
pub struct OrderParams {
    pub token_address: String,
    /// Amount of native currency to spend, in whole units
    pub amount_in: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub timeout_secs: u64,
}

impl OrderParams {
    /// Validate every field against its format/range rule.
    pub fn new(
        token_address: &str,
        amount_in: f64,
        take_profit_pct: f64,
        stop_loss_pct: f64,
        timeout_secs: i64,
    ) -> Result<Self, ValidationError> {
        validate_token_address(token_address)?;
        validate_amount(amount_in)?;
        validate_take_profit(take_profit_pct)?;
        validate_stop_loss(stop_loss_pct)?;
        validate_timeout(timeout_secs)?;

        Ok(Self {
            token_address: token_address.to_string(),
            amount_in,
            take_profit_pct,
            stop_loss_pct,
            timeout_secs: timeout_secs as u64,
        })
    }
}

/// Buy or sell leg of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// One executed trade leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub order_id: u64,
    pub txn_hash: String,
    pub token_address: String,
    /// Native-currency value of the leg, in whole units
    pub eth_amount: f64,
    pub side: TradeSide,
    /// Unix seconds
    pub timestamp: u64,
}

impl TradeRecord {
    pub fn new(
        order_id: u64,
        txn_hash: String,
        token_address: String,
        eth_amount: f64,
        side: TradeSide,
    ) -> Self {
        Self {
            order_id,
            txn_hash,
            token_address,
            eth_amount,
            side,
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }
}

/// A monitored position: opened by a buy leg, closed by take-profit,
/// stop-loss or timeout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub token_address: String,
    /// Native currency spent to open, in whole units
    pub amount_in: f64,
    /// Token received, in base units
    pub token_amount: u128,
    pub decimals: u8,
    /// USD price of the token when the position opened
    pub entry_price: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub timeout_secs: u64,
    pub pnl: f64,
    pub completed: bool,
    pub trades: Vec<TradeRecord>,
}

impl Order {
    pub fn open(
        id: u64,
        params: &OrderParams,
        token_amount: u128,
        decimals: u8,
        entry_price: f64,
    ) -> Self {
        Self {
            id,
            token_address: params.token_address.clone(),
            amount_in: params.amount_in,
            token_amount,
            decimals,
            entry_price,
            take_profit_pct: params.take_profit_pct,
            stop_loss_pct: params.stop_loss_pct,
            timeout_secs: params.timeout_secs,
            pnl: 0.0,
            completed: false,
            trades: Vec::new(),
        }
    }

    /// Realized profit in USD for an exit at `exit_price`:
    /// `(exit - entry) * tokenAmount / 10^decimals`.
    pub fn realized_pnl(&self, exit_price: f64) -> f64 {
        let whole_tokens = self.token_amount as f64 / 10f64.powi(self.decimals as i32);
        (exit_price - self.entry_price) * whole_tokens
    }

    /// Mark the position closed with its final profit.
    pub fn complete(&mut self, pnl: f64) {
        self.pnl = pnl;
        self.completed = true;
    }
}

/// One wallet's trading history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub wallet_address: String,
    pub total_pnl: f64,
    pub orders: Vec<Order>,
}

impl User {
    pub fn new(wallet_address: String) -> Self {
        Self {
            wallet_address,
            total_pnl: 0.0,
            orders: Vec::new(),
        }
    }

    /// The open (non-completed) order for a token, if any.
    pub fn open_order(&self, token_address: &str) -> Option<&Order> {
        self.orders
            .iter()
            .find(|o| !o.completed && o.token_address.eq_ignore_ascii_case(token_address))
    }

    pub fn open_order_mut(&mut self, token_address: &str) -> Option<&mut Order> {
        self.orders
            .iter_mut()
            .find(|o| !o.completed && o.token_address.eq_ignore_ascii_case(token_address))
    }

    /// Append a new open order. At most one open order may exist per
    /// token at a time.
    pub fn push_order(&mut self, order: Order) -> Result<(), OrderError> {
        if self.open_order(&order.token_address).is_some() {
            return Err(OrderError::OpenOrderExists(order.token_address));
        }
        self.orders.push(order);
        Ok(())
    }

    /// Next order id, unique within this user's history.
    pub fn next_order_id(&self) -> u64 {
        self.orders.iter().map(|o| o.id).max().map_or(1, |id| id + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOKEN: &str = "0x4200000000000000000000000000000000000006";

    fn params() -> OrderParams {
        OrderParams::new(TOKEN, 0.5, 10.0, 5.0, 300).unwrap()
    }

    fn open_order(id: u64) -> Order {
        // 2 tokens with 18 decimals at $100
        Order::open(id, &params(), 2_000_000_000_000_000_000, 18, 100.0)
    }

    #[test]
    fn test_params_validation() {
        assert!(OrderParams::new(TOKEN, 0.5, 10.0, 5.0, 300).is_ok());

        assert!(OrderParams::new("not-an-address", 0.5, 10.0, 5.0, 300).is_err());
        assert!(OrderParams::new(TOKEN, 0.0, 10.0, 5.0, 300).is_err());
        assert!(OrderParams::new(TOKEN, 0.5, 1001.0, 5.0, 300).is_err());
        assert!(OrderParams::new(TOKEN, 0.5, 10.0, 0.0, 300).is_err());
        assert!(OrderParams::new(TOKEN, 0.5, 10.0, 5.0, 0).is_err());
    }

    #[test]
    fn test_realized_pnl() {
        let order = open_order(1);

        // 2 tokens, entry $100 -> exit $110 = +$20
        assert_relative_eq!(order.realized_pnl(110.0), 20.0, epsilon = 1e-9);
        // exit $95 = -$10
        assert_relative_eq!(order.realized_pnl(95.0), -10.0, epsilon = 1e-9);
        // flat exit
        assert_relative_eq!(order.realized_pnl(100.0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_realized_pnl_respects_decimals() {
        // Same raw amount read as 6 decimals is a much larger holding
        let mut order = open_order(1);
        order.token_amount = 3_000_000; // 3 tokens at 6 decimals
        order.decimals = 6;

        assert_relative_eq!(order.realized_pnl(101.0), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_complete_order() {
        let mut order = open_order(1);
        assert!(!order.completed);

        order.complete(12.5);
        assert!(order.completed);
        assert_relative_eq!(order.pnl, 12.5);
    }

    #[test]
    fn test_single_open_order_per_token() {
        let mut user = User::new("0xabc0000000000000000000000000000000000001".to_string());

        user.push_order(open_order(1)).unwrap();
        let err = user.push_order(open_order(2)).unwrap_err();
        assert!(matches!(err, OrderError::OpenOrderExists(_)));

        // Completing the first frees the slot
        user.open_order_mut(TOKEN).unwrap().complete(1.0);
        assert!(user.push_order(open_order(2)).is_ok());
    }

    #[test]
    fn test_open_order_lookup_ignores_case() {
        let mut user = User::new("0xabc0000000000000000000000000000000000001".to_string());
        user.push_order(open_order(1)).unwrap();

        assert!(user.open_order(&TOKEN.to_uppercase().replace("0X", "0x")).is_some());
        assert!(user.open_order("0x0000000000000000000000000000000000000001").is_none());
    }

    #[test]
    fn test_next_order_id() {
        let mut user = User::new("0xabc0000000000000000000000000000000000001".to_string());
        assert_eq!(user.next_order_id(), 1);

        user.push_order(open_order(1)).unwrap();
        assert_eq!(user.next_order_id(), 2);
    }

    #[test]
    fn test_trade_side_display() {
        assert_eq!(TradeSide::Buy.to_string(), "buy");
        assert_eq!(TradeSide::Sell.to_string(), "sell");
    }

    #[test]
    fn test_trade_record_timestamp_set() {
        let record = TradeRecord::new(1, "0xhash".to_string(), TOKEN.to_string(), 0.5, TradeSide::Buy);
        assert!(record.timestamp > 1_700_000_000);
    }
}
