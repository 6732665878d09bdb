//! Gasless Trading Integration Tests
//!
//! Integration tests that verify the trading components work together:
//! 1. SwapOrchestrator -> relay wire format (submission bodies, approvals)
//! 2. BotEngine -> BotStore bookkeeping across full position round trips
//! 3. EvmWallet -> signature codec on real typed-data signatures
//!
//! All tests are deterministic (no real network calls) and use the
//! in-crate port mocks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;

use swapsmith::application::{BotEngine, EngineConfig, SwapError, SwapOrchestrator, TradePhase};
use swapsmith::domain::{split, BotStore, OrderParams, SignatureType, TradeSide, DEFAULT_STATE_FILE};
use swapsmith::ports::mocks::{MockChain, MockPriceFeed, MockSwapApi, MockWallet};
use swapsmith::ports::models::{
    AllowanceIssue, Issues, PriceParams, PriceResponse, QuoteResponse, SignableEnvelope,
    StatusResponse, StatusTransaction, SubmitResponse, TradeStatus,
};
use swapsmith::ports::WalletPort;

// ============================================================================
// Test Fixtures
// ============================================================================

const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
const TOKEN: &str = "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984";
const SPENDER: &str = "0x000000000022D473030F116dDEE9F6B43aC78BA3";

/// A liquid indicative price for one WETH in
fn liquid_price() -> PriceResponse {
    PriceResponse {
        sell_amount: "1000000000000000000".to_string(),
        buy_amount: "2000000000000000000".to_string(),
        liquidity_available: true,
        ..Default::default()
    }
}

/// A firm quote carrying only the trade envelope
fn quote_with_trade() -> QuoteResponse {
    QuoteResponse {
        sell_amount: "1000000000000000000".to_string(),
        buy_amount: "2000000000000000000".to_string(),
        liquidity_available: true,
        trade: Some(SignableEnvelope {
            kind: "metatransaction_v2".to_string(),
            hash: None,
            eip712: json!({"primaryType": "MetaTransactionDataV2"}),
        }),
        ..Default::default()
    }
}

/// A firm quote where the token supports gasless approvals
fn quote_with_gasless_approval() -> QuoteResponse {
    QuoteResponse {
        issues: Issues {
            allowance: Some(AllowanceIssue {
                actual: Some("0".to_string()),
                spender: Some(SPENDER.to_string()),
            }),
        },
        approval: Some(SignableEnvelope {
            kind: "executeMetaTransaction::approve".to_string(),
            hash: None,
            eip712: json!({"primaryType": "MetaTransaction"}),
        }),
        ..quote_with_trade()
    }
}

/// A firm quote with an allowance shortfall and no gasless envelope
fn quote_with_allowance_issue() -> QuoteResponse {
    QuoteResponse {
        issues: Issues {
            allowance: Some(AllowanceIssue {
                actual: Some("0".to_string()),
                spender: Some(SPENDER.to_string()),
            }),
        },
        ..quote_with_trade()
    }
}

fn pending() -> StatusResponse {
    StatusResponse {
        status: TradeStatus::Pending,
        transactions: vec![],
        approval_transactions: None,
        reason: None,
    }
}

fn settled(hash: &str) -> StatusResponse {
    StatusResponse {
        status: TradeStatus::Confirmed,
        transactions: vec![StatusTransaction {
            hash: hash.to_string(),
            timestamp: Some(1_700_000_000),
        }],
        approval_transactions: None,
        reason: None,
    }
}

fn failed(reason: &str) -> StatusResponse {
    StatusResponse {
        status: TradeStatus::Failed,
        transactions: vec![],
        approval_transactions: None,
        reason: Some(reason.to_string()),
    }
}

/// Default scripted API: liquid pair, plain quote, settles first try
fn scripted_api() -> MockSwapApi {
    MockSwapApi::new()
        .with_price(liquid_price())
        .with_quote(quote_with_trade())
        .with_submit(SubmitResponse {
            trade_hash: "0xtradehash".to_string(),
            kind: None,
        })
        .with_status_sequence(vec![settled("0xmined")])
}

/// Orchestrator over mocks with millisecond polling
fn orchestrator(
    api: Arc<MockSwapApi>,
    wallet: Arc<MockWallet>,
    chain: Arc<MockChain>,
) -> SwapOrchestrator {
    SwapOrchestrator::new(api, wallet, chain, 1)
        .with_poll_interval(Duration::from_millis(1))
}

fn sell_params() -> PriceParams {
    PriceParams::sell(1, WETH, TOKEN, 1_000_000_000_000_000_000)
}

// ============================================================================
// Test Module: Orchestrator -> Relay Wire Format
// ============================================================================

mod relay_wire_format {
    use super::*;

    /// Test: A submission without an allowance issue omits the approval
    /// key entirely instead of sending null
    #[tokio::test]
    async fn test_submit_body_without_approval() {
        let api = Arc::new(scripted_api());
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api.clone(), wallet.clone(), chain);

        let outcome = orch.run_swap(sell_params()).await.unwrap();
        assert_eq!(outcome.trade_hash, "0xtradehash");
        assert_eq!(outcome.tx_hash, "0xmined");

        let submits = api.submit_calls();
        assert_eq!(submits.len(), 1);

        let body = serde_json::to_value(&submits[0]).unwrap();
        assert_eq!(body["chainId"], 1);
        assert_eq!(body["trade"]["type"], "metatransaction_v2");
        assert!(body.get("approval").is_none());

        // Signature carries the EIP-712 type code and padded words
        let signature = &body["trade"]["signature"];
        assert_eq!(signature["signatureType"], 2);
        assert_eq!(signature["r"].as_str().unwrap().len(), 66);
        assert_eq!(signature["s"].as_str().unwrap().len(), 66);
        assert_eq!(signature["v"], 28);
        assert_eq!(signature["recoveryParam"], 1);
    }

    /// Test: Gasless approvals are signed before the trade and ride
    /// along in the same submission
    #[tokio::test]
    async fn test_gasless_approval_signed_first_and_submitted_together() {
        let api = Arc::new(
            MockSwapApi::new()
                .with_price(liquid_price())
                .with_quote(quote_with_gasless_approval())
                .with_submit(SubmitResponse {
                    trade_hash: "0xtradehash".to_string(),
                    kind: None,
                })
                .with_status_sequence(vec![settled("0xmined")]),
        );
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api.clone(), wallet.clone(), chain.clone());

        orch.run_swap(sell_params()).await.unwrap();

        let signed = wallet.signed_payloads();
        assert_eq!(signed.len(), 2);
        assert_eq!(signed[0], json!({"primaryType": "MetaTransaction"}));
        assert_eq!(signed[1], json!({"primaryType": "MetaTransactionDataV2"}));

        let body = serde_json::to_value(&api.submit_calls()[0]).unwrap();
        assert_eq!(body["approval"]["type"], "executeMetaTransaction::approve");
        assert_eq!(body["approval"]["signature"]["signatureType"], 2);

        // The gasless path never touches the chain
        assert!(chain.approvals().is_empty());
    }

    /// Test: Without a gasless envelope the allowance shortfall is
    /// covered by an on-chain approval before submission
    #[tokio::test]
    async fn test_onchain_approval_fallback() {
        let api = Arc::new(
            MockSwapApi::new()
                .with_price(liquid_price())
                .with_quote(quote_with_allowance_issue())
                .with_submit(SubmitResponse {
                    trade_hash: "0xtradehash".to_string(),
                    kind: None,
                })
                .with_status_sequence(vec![settled("0xmined")]),
        );
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api.clone(), wallet.clone(), chain.clone());

        orch.run_swap(sell_params()).await.unwrap();

        assert_eq!(
            chain.approvals(),
            vec![(WETH.to_string(), SPENDER.to_string())]
        );

        // Only the trade envelope is signed and submitted
        assert_eq!(wallet.signed_payloads().len(), 1);
        let body = serde_json::to_value(&api.submit_calls()[0]).unwrap();
        assert!(body.get("approval").is_none());
    }

    /// Test: A dried-up pool stops the flow before any quote is taken
    #[tokio::test]
    async fn test_no_liquidity_never_quotes() {
        let api = Arc::new(MockSwapApi::new().with_price(PriceResponse {
            liquidity_available: false,
            ..Default::default()
        }));
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api.clone(), wallet, chain);

        let result = orch.run_swap(sell_params()).await;

        assert!(matches!(result, Err(SwapError::NoLiquidity)));
        assert!(api.quote_calls().is_empty());
        assert!(api.submit_calls().is_empty());
    }

    /// Test: A rejected submission is fatal and never replayed
    #[tokio::test]
    async fn test_rejected_submission_not_retried() {
        let api = Arc::new(
            MockSwapApi::new()
                .with_price(liquid_price())
                .with_quote(quote_with_trade())
                .with_submit_rejection(502, "relay unavailable"),
        );
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api.clone(), wallet, chain);

        let result = orch.run_swap(sell_params()).await;

        assert!(matches!(
            result,
            Err(SwapError::SubmissionRejected { status: 502, .. })
        ));
        assert_eq!(api.submit_calls().len(), 1);
    }

    /// Test: Polling rides out interim statuses until settlement
    #[tokio::test]
    async fn test_polls_until_settled() {
        let api = Arc::new(
            MockSwapApi::new()
                .with_price(liquid_price())
                .with_quote(quote_with_trade())
                .with_submit(SubmitResponse {
                    trade_hash: "0xtradehash".to_string(),
                    kind: None,
                })
                .with_status_sequence(vec![pending(), pending(), settled("0xmined")]),
        );
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api.clone(), wallet, chain);

        let outcome = orch.run_swap(sell_params()).await.unwrap();

        assert_eq!(outcome.tx_hash, "0xmined");
        assert_eq!(api.status_calls().len(), 3);
        assert!(api.status_calls().iter().all(|h| h == "0xtradehash"));
    }

    /// Test: An on-chain failure surfaces its decoded reason
    #[tokio::test]
    async fn test_terminal_failure_reason_surfaced() {
        let api = Arc::new(
            MockSwapApi::new()
                .with_price(liquid_price())
                .with_quote(quote_with_trade())
                .with_submit(SubmitResponse {
                    trade_hash: "0xtradehash".to_string(),
                    kind: None,
                })
                .with_status_sequence(vec![pending(), failed("order_expired")]),
        );
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api.clone(), wallet, chain);

        let result = orch.run_swap(sell_params()).await;

        match result {
            Err(SwapError::TerminalFailure(reason)) => {
                assert_eq!(reason.to_string(), "order_expired");
            }
            other => panic!("Expected terminal failure, got {:?}", other.map(|_| ())),
        }
    }

    /// Test: A trade that never settles times out, and the phase
    /// records timeout rather than failure
    #[tokio::test]
    async fn test_poll_deadline_times_out() {
        let api = Arc::new(
            MockSwapApi::new()
                .with_price(liquid_price())
                .with_quote(quote_with_trade())
                .with_submit(SubmitResponse {
                    trade_hash: "0xtradehash".to_string(),
                    kind: None,
                })
                .with_status_sequence(vec![pending()]),
        );
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api, wallet, chain).with_poll_deadline(Duration::from_millis(5));

        let result = orch.run_swap(sell_params()).await;

        assert!(matches!(result, Err(SwapError::PollTimeout(_))));
        assert_eq!(orch.phase().await, TradePhase::TimedOut);
    }
}

// ============================================================================
// Test Module: Engine -> Store Round Trips
// ============================================================================

mod position_round_trip {
    use super::*;

    fn engine_api(buy_hash: &str, sell_hash: &str) -> MockSwapApi {
        MockSwapApi::new()
            .with_price(liquid_price())
            .with_quote(quote_with_trade())
            .with_submit(SubmitResponse {
                trade_hash: "0xtradehash".to_string(),
                kind: None,
            })
            .with_status_sequence(vec![settled(buy_hash), settled(sell_hash)])
    }

    fn engine(
        api: Arc<MockSwapApi>,
        feed: Arc<MockPriceFeed>,
        data_dir: &std::path::Path,
    ) -> BotEngine {
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api, wallet.clone(), chain.clone());
        let store = BotStore::open(data_dir).unwrap();

        BotEngine::new(
            store,
            orch,
            feed,
            chain,
            wallet,
            EngineConfig {
                chain_id: 1,
                weth_address: WETH.to_string(),
                slippage_percentage: 0.5,
                monitor_interval: Duration::from_millis(1),
            },
        )
    }

    /// Test: A take-profit exit books the position and survives a
    /// store reload from disk
    #[tokio::test]
    async fn test_take_profit_round_trip_is_persisted() {
        let dir = tempdir().unwrap();
        let api = Arc::new(engine_api("0xbuy", "0xsell"));
        // Entry at 100, then the monitor sees the take-profit print
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 112.0]));
        let params = OrderParams::new(TOKEN, 1.0, 10.0, 5.0, 600).unwrap();

        let summary = engine(api, feed, dir.path())
            .run_position(&params)
            .await
            .unwrap();

        // 2 whole tokens bought, 12 dollars of movement each
        assert_eq!(summary.exit_price, 112.0);
        assert!((summary.pnl - 24.0).abs() < 1e-9);
        assert_eq!(summary.exit_tx_hash, "0xsell");

        // The state file is on disk and reloads to the same books
        assert!(dir.path().join(DEFAULT_STATE_FILE).exists());
        let store = BotStore::open(dir.path()).unwrap();
        let user = store.user(&MockWallet::new().address()).unwrap();
        assert_eq!(user.orders.len(), 1);
        assert!(user.orders[0].completed);
        assert_eq!(user.orders[0].trades.len(), 2);
        assert_eq!(user.orders[0].trades[0].side, TradeSide::Buy);
        assert_eq!(user.orders[0].trades[0].txn_hash, "0xbuy");
        assert_eq!(user.orders[0].trades[1].side, TradeSide::Sell);
        assert_eq!(user.orders[0].trades[1].txn_hash, "0xsell");
        assert!((user.total_pnl - 24.0).abs() < 1e-9);
    }

    /// Test: A stop-loss exit books a negative PnL
    #[tokio::test]
    async fn test_stop_loss_round_trip_books_loss() {
        let dir = tempdir().unwrap();
        let api = Arc::new(engine_api("0xbuy", "0xsell"));
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 93.0]));
        let params = OrderParams::new(TOKEN, 1.0, 10.0, 5.0, 600).unwrap();

        let summary = engine(api, feed, dir.path())
            .run_position(&params)
            .await
            .unwrap();

        assert_eq!(summary.exit_price, 93.0);
        assert!((summary.pnl + 14.0).abs() < 1e-9);
        assert!((summary.total_pnl + 14.0).abs() < 1e-9);
    }

    /// Test: The holding timeout closes the position at the last seen
    /// price even though neither threshold was hit
    #[tokio::test]
    async fn test_timeout_closes_between_thresholds() {
        let dir = tempdir().unwrap();
        let api = Arc::new(engine_api("0xbuy", "0xsell"));
        // 102 sits between stop loss (95) and take profit (110)
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 102.0]));
        let params = OrderParams::new(TOKEN, 1.0, 10.0, 5.0, 1).unwrap();

        let summary = engine(api, feed, dir.path())
            .run_position(&params)
            .await
            .unwrap();

        assert_eq!(summary.exit_price, 102.0);
        assert!((summary.pnl - 4.0).abs() < 1e-9);
    }

    /// Test: Lifetime PnL accumulates over consecutive positions in
    /// the same data dir
    #[tokio::test]
    async fn test_lifetime_pnl_accumulates_across_runs() {
        let dir = tempdir().unwrap();
        let params = OrderParams::new(TOKEN, 1.0, 10.0, 5.0, 600).unwrap();

        let first = {
            let api = Arc::new(engine_api("0xbuy1", "0xsell1"));
            let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 112.0]));
            engine(api, feed, dir.path())
                .run_position(&params)
                .await
                .unwrap()
        };
        assert_eq!(first.order_id, 1);
        assert!((first.total_pnl - 24.0).abs() < 1e-9);

        let second = {
            let api = Arc::new(engine_api("0xbuy2", "0xsell2"));
            let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 93.0]));
            engine(api, feed, dir.path())
                .run_position(&params)
                .await
                .unwrap()
        };
        assert_eq!(second.order_id, 2);
        // +24 then -14
        assert!((second.total_pnl - 10.0).abs() < 1e-9);
    }

    /// Test: Every trade leg checks the allowance, so a token without
    /// one gets approved on chain before the sell
    #[tokio::test]
    async fn test_sell_leg_requests_approval_check() {
        let dir = tempdir().unwrap();
        let api = Arc::new(engine_api("0xbuy", "0xsell"));
        let feed = Arc::new(MockPriceFeed::new().with_sequence(vec![100.0, 112.0]));
        let params = OrderParams::new(TOKEN, 1.0, 10.0, 5.0, 600).unwrap();

        engine(api.clone(), feed, dir.path())
            .run_position(&params)
            .await
            .unwrap();

        let quotes = api.quote_calls();
        assert_eq!(quotes.len(), 2);
        assert!(quotes.iter().all(|q| q.check_approval));
        // Buy leg sells WETH, sell leg sells the token back
        assert_eq!(quotes[0].sell_token, WETH);
        assert_eq!(quotes[1].sell_token, TOKEN);
        assert_eq!(quotes[1].buy_token, WETH);
    }
}

// ============================================================================
// Test Module: Wallet -> Signature Codec
// ============================================================================

mod signature_round_trip {
    use super::*;
    use swapsmith::adapters::evm::EvmWallet;

    // Well-known throwaway key, account 0 of the default dev mnemonic
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn typed_data() -> serde_json::Value {
        json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "chainId", "type": "uint256"}
                ],
                "Swap": [
                    {"name": "taker", "type": "address"},
                    {"name": "amount", "type": "uint256"}
                ]
            },
            "domain": {"name": "ZeroEx", "chainId": 1},
            "primaryType": "Swap",
            "message": {
                "taker": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
                "amount": "1000000000000000000"
            }
        })
    }

    /// Test: A real secp256k1 signature splits into well-formed
    /// submission components
    #[tokio::test]
    async fn test_real_signature_splits_into_wire_form() {
        let wallet = EvmWallet::from_private_key(DEV_KEY).unwrap();
        let raw = wallet.sign_typed_data(&typed_data()).await.unwrap();

        let parts = split(&raw).unwrap();
        assert_eq!(parts.r.len(), 66);
        assert_eq!(parts.s.len(), 66);
        assert!(parts.v == 27 || parts.v == 28);
        assert_eq!(parts.recovery_param as u64, 1 - (parts.v % 2));

        let wire = serde_json::to_value(parts.with_signature_type(SignatureType::Eip712)).unwrap();
        assert_eq!(wire["signatureType"], 2);
    }

    /// Test: The orchestrator submits exactly the signature the wallet
    /// produced, split but not otherwise altered
    #[tokio::test]
    async fn test_submitted_signature_matches_wallet_output() {
        let api = Arc::new(scripted_api());
        let wallet = Arc::new(MockWallet::new());
        let chain = Arc::new(MockChain::new());
        let orch = orchestrator(api.clone(), wallet.clone(), chain);

        orch.run_swap(sell_params()).await.unwrap();

        let raw = format!("0x{}{}1c", "ab".repeat(32), "cd".repeat(32));
        let expected = split(&raw).unwrap();
        let body = serde_json::to_value(&api.submit_calls()[0]).unwrap();

        assert_eq!(body["trade"]["signature"]["r"], expected.r.as_str());
        assert_eq!(body["trade"]["signature"]["s"], expected.s.as_str());
        assert_eq!(body["trade"]["signature"]["v"], expected.v);
    }
}
