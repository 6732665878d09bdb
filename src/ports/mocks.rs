//! Port Mocks
//!
//! Hand-rolled mock implementations of the port traits with scripted
//! responses and call recording. Shared between unit tests and the
//! integration suite, so they compile into the library proper.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::ports::models::{
    PriceParams, PriceResponse, QuoteResponse, StatusResponse, SubmitRequest, SubmitResponse,
};
use crate::ports::price_feed::{PriceFeedError, PriceFeedPort};
use crate::ports::swap_api::{SwapApiError, SwapApiPort};
use crate::ports::wallet::{ChainError, ChainPort, WalletError, WalletPort};

/// Mock swap API with scripted responses and recorded requests
#[derive(Default)]
pub struct MockSwapApi {
    price_response: Mutex<Option<PriceResponse>>,
    quote_response: Mutex<Option<QuoteResponse>>,
    submit_response: Mutex<Option<SubmitResponse>>,
    submit_rejection: Mutex<Option<(u16, String)>>,
    status_sequence: Mutex<VecDeque<StatusResponse>>,
    price_calls: Arc<Mutex<Vec<PriceParams>>>,
    quote_calls: Arc<Mutex<Vec<PriceParams>>>,
    submit_calls: Arc<Mutex<Vec<SubmitRequest>>>,
    status_calls: Arc<Mutex<Vec<String>>>,
}

impl MockSwapApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, response: PriceResponse) -> Self {
        *self.price_response.lock().unwrap() = Some(response);
        self
    }

    pub fn with_quote(self, response: QuoteResponse) -> Self {
        *self.quote_response.lock().unwrap() = Some(response);
        self
    }

    pub fn with_submit(self, response: SubmitResponse) -> Self {
        *self.submit_response.lock().unwrap() = Some(response);
        self
    }

    /// Make submit fail with the given HTTP status.
    pub fn with_submit_rejection(self, status: u16, detail: &str) -> Self {
        *self.submit_rejection.lock().unwrap() = Some((status, detail.to_string()));
        self
    }

    /// Script status responses in order. The final entry repeats once
    /// the sequence is exhausted.
    pub fn with_status_sequence(self, responses: Vec<StatusResponse>) -> Self {
        *self.status_sequence.lock().unwrap() = responses.into();
        self
    }

    pub fn price_calls(&self) -> Vec<PriceParams> {
        self.price_calls.lock().unwrap().clone()
    }

    pub fn quote_calls(&self) -> Vec<PriceParams> {
        self.quote_calls.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> Vec<SubmitRequest> {
        self.submit_calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapApiPort for MockSwapApi {
    async fn price(&self, params: &PriceParams) -> Result<PriceResponse, SwapApiError> {
        self.price_calls.lock().unwrap().push(params.clone());
        self.price_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SwapApiError::Transport("no price response configured".to_string()))
    }

    async fn quote(&self, params: &PriceParams) -> Result<QuoteResponse, SwapApiError> {
        self.quote_calls.lock().unwrap().push(params.clone());
        self.quote_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SwapApiError::Transport("no quote response configured".to_string()))
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, SwapApiError> {
        self.submit_calls.lock().unwrap().push(request.clone());
        if let Some((status, detail)) = self.submit_rejection.lock().unwrap().clone() {
            return Err(SwapApiError::Rejected { status, detail });
        }
        self.submit_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SwapApiError::Transport("no submit response configured".to_string()))
    }

    async fn status(
        &self,
        trade_hash: &str,
        _chain_id: u64,
    ) -> Result<StatusResponse, SwapApiError> {
        self.status_calls.lock().unwrap().push(trade_hash.to_string());
        let mut sequence = self.status_sequence.lock().unwrap();
        let next = if sequence.len() > 1 {
            sequence.pop_front()
        } else {
            sequence.front().cloned()
        };
        next.ok_or_else(|| SwapApiError::Transport("no status response configured".to_string()))
    }
}

/// Mock wallet returning a fixed, well-formed signature
pub struct MockWallet {
    address: String,
    decline: bool,
    signed_payloads: Arc<Mutex<Vec<Value>>>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self {
            address: "0x1111111111111111111111111111111111111111".to_string(),
            decline: false,
            signed_payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    /// Refuse every signing request.
    pub fn declining(mut self) -> Self {
        self.decline = true;
        self
    }

    pub fn signed_payloads(&self) -> Vec<Value> {
        self.signed_payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletPort for MockWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign_typed_data(&self, typed_data: &Value) -> Result<String, WalletError> {
        if self.decline {
            return Err(WalletError::Declined);
        }
        self.signed_payloads.lock().unwrap().push(typed_data.clone());
        Ok(format!("0x{}{}1c", "ab".repeat(32), "cd".repeat(32)))
    }
}

/// Mock chain with fixed token metadata and recorded approvals
pub struct MockChain {
    decimals: u8,
    balance: u128,
    fail_approval: bool,
    approvals: Arc<Mutex<Vec<(String, String)>>>,
    wraps: Arc<Mutex<Vec<u128>>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            decimals: 18,
            balance: u128::MAX,
            fail_approval: false,
            approvals: Arc::new(Mutex::new(Vec::new())),
            wraps: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_balance(mut self, balance: u128) -> Self {
        self.balance = balance;
        self
    }

    /// Make approval transactions revert.
    pub fn failing_approval(mut self) -> Self {
        self.fail_approval = true;
        self
    }

    pub fn approvals(&self) -> Vec<(String, String)> {
        self.approvals.lock().unwrap().clone()
    }

    pub fn wraps(&self) -> Vec<u128> {
        self.wraps.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainPort for MockChain {
    async fn approve_max(&self, token: &str, spender: &str) -> Result<String, ChainError> {
        self.approvals
            .lock()
            .unwrap()
            .push((token.to_string(), spender.to_string()));
        if self.fail_approval {
            return Err(ChainError::Reverted("0xdeadapproval".to_string()));
        }
        Ok("0xapprovaltx".to_string())
    }

    async fn token_decimals(&self, _token: &str) -> Result<u8, ChainError> {
        Ok(self.decimals)
    }

    async fn token_balance(&self, _token: &str) -> Result<u128, ChainError> {
        Ok(self.balance)
    }

    async fn wrap_native(&self, amount: u128) -> Result<String, ChainError> {
        self.wraps.lock().unwrap().push(amount);
        Ok("0xwraptx".to_string())
    }
}

/// Mock price feed replaying a scripted sequence
#[derive(Default)]
pub struct MockPriceFeed {
    sequence: Mutex<VecDeque<f64>>,
    calls: Arc<Mutex<usize>>,
}

impl MockPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script prices in order. The final entry repeats once the
    /// sequence is exhausted.
    pub fn with_sequence(self, prices: Vec<f64>) -> Self {
        *self.sequence.lock().unwrap() = prices.into();
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PriceFeedPort for MockPriceFeed {
    async fn usd_price(&self, _token: &str, _decimals: u8) -> Result<f64, PriceFeedError> {
        *self.calls.lock().unwrap() += 1;
        let mut sequence = self.sequence.lock().unwrap();
        let next = if sequence.len() > 1 {
            sequence.pop_front()
        } else {
            sequence.front().copied()
        };
        next.ok_or_else(|| PriceFeedError::LookupFailed("no prices configured".to_string()))
    }
}
