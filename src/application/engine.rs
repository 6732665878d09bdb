//! Bot Engine
//!
//! The run-command loop: open a position with a gasless buy, watch it
//! against its exit thresholds, close it with a gasless sell, and book
//! the realized profit into the persistent store. Crash recovery works
//! through the store: an open order found at startup is resumed
//! instead of buying again.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::application::monitor::{MonitorConfig, PositionEvent, PositionMonitor};
use crate::application::orchestrator::{SwapError, SwapOrchestrator};
use crate::domain::order::{Order, OrderParams, TradeRecord, TradeSide};
use crate::domain::store::{BotStore, StoreError};
use crate::ports::models::PriceParams;
use crate::ports::price_feed::PriceFeedPort;
use crate::ports::wallet::{ChainError, ChainPort, WalletPort};

const WEI_PER_ETH: f64 = 1e18;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("swap failed: {0}")]
    Swap(#[from] SwapError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("no USD price available for {0}")]
    PriceUnavailable(String),

    #[error("bought amount could not be parsed: {0}")]
    BadBuyAmount(String),

    #[error("position monitor closed without an event")]
    MonitorClosed,
}

/// Engine wiring parameters
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub chain_id: u64,
    /// Wrapped native token, the sell side of every buy leg
    pub weth_address: String,
    pub slippage_percentage: f64,
    /// Position monitor price check interval
    pub monitor_interval: Duration,
}

/// Result of one completed position
#[derive(Debug, Clone)]
pub struct PositionSummary {
    pub order_id: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    /// Lifetime profit of the wallet after this position
    pub total_pnl: f64,
    pub exit_tx_hash: String,
}

/// Runs one position end to end against the persistent store
pub struct BotEngine {
    store: BotStore,
    orchestrator: SwapOrchestrator,
    feed: Arc<dyn PriceFeedPort>,
    chain: Arc<dyn ChainPort>,
    wallet: Arc<dyn WalletPort>,
    config: EngineConfig,
}

impl BotEngine {
    pub fn new(
        store: BotStore,
        orchestrator: SwapOrchestrator,
        feed: Arc<dyn PriceFeedPort>,
        chain: Arc<dyn ChainPort>,
        wallet: Arc<dyn WalletPort>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            orchestrator,
            feed,
            chain,
            wallet,
            config,
        }
    }

    /// Handle for cancelling an in-flight swap from another task.
    pub fn orchestrator_handle(&self) -> SwapOrchestrator {
        self.orchestrator.clone()
    }

    /// Open (or resume), watch, and close one position.
    pub async fn run_position(
        &mut self,
        params: &OrderParams,
    ) -> Result<PositionSummary, EngineError> {
        let wallet_address = self.wallet.address();
        self.store.find_or_create_user(&wallet_address)?;

        let order = match self.store.open_order(&wallet_address, &params.token_address) {
            Some(order) => {
                tracing::info!(
                    "Resuming open order #{} on {} from a previous run",
                    order.id,
                    order.token_address
                );
                order
            }
            None => self.open_position(&wallet_address, params).await?,
        };

        let exit_price = self.watch_position(&order).await?;
        self.close_position(&wallet_address, &order, exit_price).await
    }

    /// Buy leg: make sure enough wrapped balance exists, record the
    /// entry price, swap, and persist the new order.
    async fn open_position(
        &mut self,
        wallet: &str,
        params: &OrderParams,
    ) -> Result<Order, EngineError> {
        let sell_wei = eth_to_wei(params.amount_in);
        self.ensure_wrapped_balance(sell_wei).await?;

        let decimals = self.chain.token_decimals(&params.token_address).await?;

        let entry_price = self
            .feed
            .usd_price(&params.token_address, decimals)
            .await
            .map_err(|_| EngineError::PriceUnavailable(params.token_address.clone()))?;
        if entry_price <= 0.0 {
            return Err(EngineError::PriceUnavailable(params.token_address.clone()));
        }

        let buy_params = PriceParams::sell(
            self.config.chain_id,
            &self.config.weth_address,
            &params.token_address,
            sell_wei,
        )
        .with_slippage(self.config.slippage_percentage)
        .with_approval_check();

        let outcome = self.orchestrator.run_swap(buy_params).await?;

        let token_amount: u128 = outcome
            .buy_amount
            .parse()
            .map_err(|_| EngineError::BadBuyAmount(outcome.buy_amount.clone()))?;

        let order_id = self.store.next_order_id(wallet);
        let order = Order::open(order_id, params, token_amount, decimals, entry_price);
        self.store.create_order(wallet, order.clone())?;
        self.store.record_trade(
            wallet,
            order_id,
            TradeRecord::new(
                order_id,
                outcome.tx_hash,
                params.token_address.clone(),
                params.amount_in,
                TradeSide::Buy,
            ),
        )?;

        tracing::info!(
            "Opened order #{}: {} base units of {} at ${:.6}",
            order_id,
            token_amount,
            params.token_address,
            entry_price
        );
        Ok(order)
    }

    /// Watch until take-profit, stop-loss, or timeout fires and return
    /// the exit price to sell against.
    async fn watch_position(&self, order: &Order) -> Result<f64, EngineError> {
        let monitor_config = MonitorConfig {
            token_address: order.token_address.clone(),
            decimals: order.decimals,
            entry_price: order.entry_price,
            take_profit_pct: order.take_profit_pct,
            stop_loss_pct: order.stop_loss_pct,
            timeout: Duration::from_secs(order.timeout_secs),
            poll_interval: self.config.monitor_interval,
            ..Default::default()
        };

        let (monitor, mut events) = PositionMonitor::new(monitor_config, Arc::clone(&self.feed));
        let watcher = tokio::spawn(async move { monitor.run().await });

        let event = events.recv().await.ok_or(EngineError::MonitorClosed)?;
        let _ = watcher.await;

        let exit_price = match event {
            PositionEvent::TakeProfit { price } => {
                tracing::info!("Exiting on take profit at ${:.6}", price);
                price
            }
            PositionEvent::StopLoss { price } => {
                tracing::info!("Exiting on stop loss at ${:.6}", price);
                price
            }
            PositionEvent::Timeout { last_price } => {
                tracing::warn!("Exiting on timeout, last price ${:.6}", last_price);
                last_price
            }
        };
        Ok(exit_price)
    }

    /// Sell leg: swap the whole position back and book the profit.
    async fn close_position(
        &mut self,
        wallet: &str,
        order: &Order,
        exit_price: f64,
    ) -> Result<PositionSummary, EngineError> {
        // The stored decimals keep PnL math consistent even if the
        // token contract reports something else now.
        match self.chain.token_decimals(&order.token_address).await {
            Ok(current) if current != order.decimals => tracing::warn!(
                "Token decimals changed from {} to {}, using stored value",
                order.decimals,
                current
            ),
            Err(e) => tracing::warn!("Could not re-read token decimals: {}", e),
            _ => {}
        }

        let sell_params = PriceParams::sell(
            self.config.chain_id,
            &order.token_address,
            &self.config.weth_address,
            order.token_amount,
        )
        .with_slippage(self.config.slippage_percentage)
        .with_approval_check();

        let outcome = self.orchestrator.run_swap(sell_params).await?;

        let received_eth = match outcome.buy_amount.parse::<u128>() {
            Ok(wei) => wei as f64 / WEI_PER_ETH,
            Err(_) => {
                tracing::warn!("Unparseable sell proceeds: {}", outcome.buy_amount);
                0.0
            }
        };

        self.store.record_trade(
            wallet,
            order.id,
            TradeRecord::new(
                order.id,
                outcome.tx_hash.clone(),
                order.token_address.clone(),
                received_eth,
                TradeSide::Sell,
            ),
        )?;

        let pnl = order.realized_pnl(exit_price);
        self.store.complete_order(wallet, order.id, pnl)?;
        let total_pnl = self.store.total_pnl(wallet);

        tracing::info!(
            "Closed order #{}: entry ${:.6}, exit ${:.6}, PnL ${:+.2}, lifetime ${:+.2}",
            order.id,
            order.entry_price,
            exit_price,
            pnl,
            total_pnl
        );

        Ok(PositionSummary {
            order_id: order.id,
            entry_price: order.entry_price,
            exit_price,
            pnl,
            total_pnl,
            exit_tx_hash: outcome.tx_hash,
        })
    }

    /// Top up the wrapped balance by depositing the shortfall.
    async fn ensure_wrapped_balance(&self, required_wei: u128) -> Result<(), EngineError> {
        let balance = self.chain.token_balance(&self.config.weth_address).await?;
        if balance < required_wei {
            let shortfall = required_wei - balance;
            tracing::info!("Wrapping {} wei to cover the position", shortfall);
            self.chain.wrap_native(shortfall).await?;
        }
        Ok(())
    }
}

fn eth_to_wei(amount: f64) -> u128 {
    (amount * WEI_PER_ETH).round() as u128
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::{MockChain, MockPriceFeed, MockSwapApi, MockWallet};
    use crate::ports::models::{
        PriceResponse, QuoteResponse, SignableEnvelope, StatusResponse, StatusTransaction,
        SubmitResponse, TradeStatus,
    };
    use approx::assert_relative_eq;
    use serde_json::json;
    use tempfile::tempdir;

    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
    const TOKEN: &str = "0x4200000000000000000000000000000000000006";

    fn settled(hash: &str) -> StatusResponse {
        StatusResponse {
            status: TradeStatus::Succeeded,
            transactions: vec![StatusTransaction {
                hash: hash.to_string(),
                timestamp: None,
            }],
            approval_transactions: None,
            reason: None,
        }
    }

    fn scripted_api() -> MockSwapApi {
        MockSwapApi::new()
            .with_price(PriceResponse {
                sell_amount: "1000000000000000000".to_string(),
                buy_amount: "2000000000000000000".to_string(),
                liquidity_available: true,
                ..Default::default()
            })
            .with_quote(QuoteResponse {
                sell_amount: "1000000000000000000".to_string(),
                buy_amount: "2000000000000000000".to_string(),
                liquidity_available: true,
                trade: Some(SignableEnvelope {
                    kind: "metatransaction_v2".to_string(),
                    hash: None,
                    eip712: json!({"domain": {}}),
                }),
                ..Default::default()
            })
            .with_submit(SubmitResponse {
                trade_hash: "0xtrade".to_string(),
                kind: None,
            })
            .with_status_sequence(vec![settled("0xbuy"), settled("0xsell")])
    }

    fn test_engine(
        api: Arc<MockSwapApi>,
        chain: Arc<MockChain>,
        feed: Arc<MockPriceFeed>,
        data_dir: &std::path::Path,
    ) -> BotEngine {
        let wallet = Arc::new(MockWallet::new());
        let orchestrator = SwapOrchestrator::new(api, wallet.clone(), chain.clone(), 1)
            .with_poll_interval(Duration::from_millis(1));
        let store = BotStore::open(data_dir).unwrap();

        BotEngine::new(
            store,
            orchestrator,
            feed,
            chain,
            wallet,
            EngineConfig {
                chain_id: 1,
                weth_address: WETH.to_string(),
                slippage_percentage: 1.0,
                monitor_interval: Duration::from_millis(1),
            },
        )
    }

    fn test_params() -> OrderParams {
        OrderParams::new(TOKEN, 1.0, 10.0, 5.0, 600).unwrap()
    }

    #[tokio::test]
    async fn test_full_position_take_profit() {
        let dir = tempdir().unwrap();
        let api = Arc::new(scripted_api());
        let chain = Arc::new(MockChain::new());
        // Entry read 100, monitor sees 105 then 111 -> take profit
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 105.0, 111.0]));
        let mut engine = test_engine(api.clone(), chain, feed, dir.path());

        let summary = engine.run_position(&test_params()).await.unwrap();

        assert_eq!(summary.order_id, 1);
        assert_eq!(summary.entry_price, 100.0);
        assert_eq!(summary.exit_price, 111.0);
        // 2 whole tokens bought, 11 dollars of movement each
        assert_relative_eq!(summary.pnl, 22.0, epsilon = 1e-9);
        assert_relative_eq!(summary.total_pnl, 22.0, epsilon = 1e-9);
        assert_eq!(summary.exit_tx_hash, "0xsell");

        // Buy leg then sell leg, nothing else
        let quotes = api.quote_calls();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].sell_token, WETH);
        assert_eq!(quotes[0].buy_token, TOKEN);
        assert_eq!(quotes[1].sell_token, TOKEN);
        assert_eq!(quotes[1].buy_token, WETH);
        assert_eq!(quotes[1].sell_amount, Some(2_000_000_000_000_000_000));
    }

    #[tokio::test]
    async fn test_position_persisted_across_reload() {
        let dir = tempdir().unwrap();
        let api = Arc::new(scripted_api());
        let chain = Arc::new(MockChain::new());
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 94.0]));
        let mut engine = test_engine(api, chain, feed, dir.path());

        engine.run_position(&test_params()).await.unwrap();

        let store = BotStore::open(dir.path()).unwrap();
        let user = store
            .user("0x1111111111111111111111111111111111111111")
            .unwrap();
        assert_eq!(user.orders.len(), 1);
        assert!(user.orders[0].completed);
        assert_eq!(user.orders[0].trades.len(), 2);
        assert_eq!(user.orders[0].trades[0].side, TradeSide::Buy);
        assert_eq!(user.orders[0].trades[1].side, TradeSide::Sell);
        // Stop loss at 94: 2 tokens * -6 dollars
        assert_relative_eq!(user.total_pnl, -12.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_wraps_shortfall_before_buying() {
        let dir = tempdir().unwrap();
        let api = Arc::new(scripted_api());
        let chain = Arc::new(MockChain::new().with_balance(250_000_000_000_000_000));
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 111.0]));
        let mut engine = test_engine(api, chain.clone(), feed, dir.path());

        engine.run_position(&test_params()).await.unwrap();

        assert_eq!(chain.wraps(), vec![750_000_000_000_000_000]);
    }

    #[tokio::test]
    async fn test_sufficient_balance_never_wraps() {
        let dir = tempdir().unwrap();
        let api = Arc::new(scripted_api());
        let chain = Arc::new(MockChain::new());
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 111.0]));
        let mut engine = test_engine(api, chain.clone(), feed, dir.path());

        engine.run_position(&test_params()).await.unwrap();

        assert!(chain.wraps().is_empty());
    }

    #[tokio::test]
    async fn test_resume_skips_buy_leg() {
        let dir = tempdir().unwrap();

        // A previous run left an open order behind
        {
            let mut store = BotStore::open(dir.path()).unwrap();
            let wallet = "0x1111111111111111111111111111111111111111";
            store.find_or_create_user(wallet).unwrap();
            let order = Order::open(
                7,
                &test_params(),
                3_000_000_000_000_000_000,
                18,
                100.0,
            );
            store.create_order(wallet, order).unwrap();
        }

        let api = Arc::new(scripted_api());
        let chain = Arc::new(MockChain::new());
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![111.0]));
        let mut engine = test_engine(api.clone(), chain, feed, dir.path());

        let summary = engine.run_position(&test_params()).await.unwrap();

        assert_eq!(summary.order_id, 7);
        // Only the sell leg hit the API
        assert_eq!(api.quote_calls().len(), 1);
        assert_eq!(api.quote_calls()[0].sell_token, TOKEN);
        // 3 tokens, 11 dollars each
        assert_relative_eq!(summary.pnl, 33.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_unavailable_entry_price_aborts_before_buying() {
        let dir = tempdir().unwrap();
        let api = Arc::new(scripted_api());
        let chain = Arc::new(MockChain::new());
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![0.0]));
        let mut engine = test_engine(api.clone(), chain, feed, dir.path());

        let result = engine.run_position(&test_params()).await;

        assert!(matches!(result, Err(EngineError::PriceUnavailable(_))));
        assert!(api.submit_calls().is_empty());
    }

    #[test]
    fn test_eth_to_wei_conversion() {
        assert_eq!(eth_to_wei(1.0), 1_000_000_000_000_000_000);
        assert_eq!(eth_to_wei(0.25), 250_000_000_000_000_000);
        assert_eq!(eth_to_wei(0.001), 1_000_000_000_000_000);
    }
}
