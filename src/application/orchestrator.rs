//! Swap Orchestrator
//!
//! Drives a single gasless swap end to end: indicative price, firm
//! quote, approval resolution, sequential signing, relay submission,
//! and status polling. One instance tracks one trade attempt at a time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::signature::{self, DecodeError, SignatureType};
use crate::ports::models::{
    FailureReason, PriceParams, PriceResponse, QuoteResponse, SignableEnvelope, SignedEnvelope,
    SubmitRequest, TradeStatus,
};
use crate::ports::swap_api::{SwapApiError, SwapApiPort};
use crate::ports::wallet::{ChainPort, WalletError, WalletPort};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("no liquidity available for this pair")]
    NoLiquidity,

    #[error("a firm quote requires a taker address")]
    MissingTaker,

    #[error("malformed API response: {0}")]
    Protocol(String),

    #[error("signature decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("approval failed: {0}")]
    ApprovalFailed(String),

    #[error("signing was declined")]
    SigningDeclined,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("relay rejected the submission with status {status}: {detail}")]
    SubmissionRejected { status: u16, detail: String },

    #[error("trade still pending after {0} seconds")]
    PollTimeout(u64),

    #[error("trade failed on chain: {0}")]
    TerminalFailure(FailureReason),

    #[error("operation cancelled")]
    Cancelled,

    #[error("API error: {0}")]
    Api(#[from] SwapApiError),
}

/// Progress of the current trade attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TradePhase {
    Idle,
    PriceFetched,
    QuoteFetched,
    ApprovalResolved,
    Signed,
    Submitted,
    Polling,
    Succeeded { tx_hash: String },
    Failed { reason: String },
    TimedOut,
}

impl fmt::Display for TradePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradePhase::Idle => write!(f, "idle"),
            TradePhase::PriceFetched => write!(f, "price fetched"),
            TradePhase::QuoteFetched => write!(f, "quote fetched"),
            TradePhase::ApprovalResolved => write!(f, "approval resolved"),
            TradePhase::Signed => write!(f, "signed"),
            TradePhase::Submitted => write!(f, "submitted"),
            TradePhase::Polling => write!(f, "polling"),
            TradePhase::Succeeded { tx_hash } => write!(f, "succeeded ({})", tx_hash),
            TradePhase::Failed { reason } => write!(f, "failed ({})", reason),
            TradePhase::TimedOut => write!(f, "timed out"),
        }
    }
}

/// How the sell-token allowance gets covered before submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalPlan {
    /// Current allowance already covers the sell amount
    None,
    /// Token supports gasless approvals; sign the approval envelope
    /// alongside the trade
    SignGasless,
    /// Fall back to a standard on-chain approval for this spender
    OnChain { spender: String },
}

/// Result of a completed swap
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    /// Relay-side identifier of the trade
    pub trade_hash: String,
    /// Hash of the mined settlement transaction
    pub tx_hash: String,
    pub sell_amount: String,
    pub buy_amount: String,
}

/// Decide how to cover the allowance from what the quote reports.
///
/// No allowance issue means nothing to do. With an issue, a present
/// approval envelope selects the gasless path; otherwise the reported
/// spender gets a standard approval.
pub fn approval_plan(quote: &QuoteResponse) -> Result<ApprovalPlan, SwapError> {
    let issue = match &quote.issues.allowance {
        None => return Ok(ApprovalPlan::None),
        Some(issue) => issue,
    };

    if quote.approval.is_some() {
        return Ok(ApprovalPlan::SignGasless);
    }

    let spender = issue
        .spender
        .clone()
        .or_else(|| quote.allowance_target.clone())
        .ok_or_else(|| {
            SwapError::Protocol("allowance issue reported without a spender".to_string())
        })?;

    Ok(ApprovalPlan::OnChain { spender })
}

/// Coordinates the gasless trade flow across the API, wallet, and chain
pub struct SwapOrchestrator {
    api: Arc<dyn SwapApiPort>,
    wallet: Arc<dyn WalletPort>,
    chain: Arc<dyn ChainPort>,
    chain_id: u64,
    poll_interval: Duration,
    poll_deadline: Duration,
    phase: Arc<RwLock<TradePhase>>,
    is_cancelled: Arc<RwLock<bool>>,
}

impl SwapOrchestrator {
    pub fn new(
        api: Arc<dyn SwapApiPort>,
        wallet: Arc<dyn WalletPort>,
        chain: Arc<dyn ChainPort>,
        chain_id: u64,
    ) -> Self {
        Self {
            api,
            wallet,
            chain,
            chain_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_deadline: DEFAULT_POLL_DEADLINE,
            phase: Arc::new(RwLock::new(TradePhase::Idle)),
            is_cancelled: Arc::new(RwLock::new(false)),
        }
    }

    /// Set a custom status poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set a custom poll deadline. Configuration validation keeps this
    /// between one and five minutes; the builder itself accepts any
    /// duration.
    pub fn with_poll_deadline(mut self, deadline: Duration) -> Self {
        self.poll_deadline = deadline;
        self
    }

    /// Current phase snapshot
    pub async fn phase(&self) -> TradePhase {
        self.phase.read().await.clone()
    }

    /// Cancel the trade attempt; polling exits at the next check.
    pub async fn stop(&self) {
        *self.is_cancelled.write().await = true;
        tracing::info!("Stop signal sent to swap orchestrator");
    }

    async fn set_phase(&self, phase: TradePhase) {
        tracing::debug!("Trade phase: {}", phase);
        *self.phase.write().await = phase;
    }

    /// Fetch an indicative price and fail fast when the pair has no
    /// liquidity, before any quote is requested.
    pub async fn fetch_price(&self, params: &PriceParams) -> Result<PriceResponse, SwapError> {
        let price = self.api.price(params).await?;

        if !price.liquidity_available {
            tracing::warn!(
                "No liquidity for {} -> {}",
                params.sell_token,
                params.buy_token
            );
            return Err(SwapError::NoLiquidity);
        }

        tracing::info!(
            "Indicative price: {} sell units -> {} buy units",
            price.sell_amount,
            price.buy_amount
        );
        self.set_phase(TradePhase::PriceFetched).await;
        Ok(price)
    }

    /// Fetch a firm quote. The taker is required here; quotes are valid
    /// for roughly thirty seconds and are not refreshed automatically.
    pub async fn fetch_quote(&self, params: &PriceParams) -> Result<QuoteResponse, SwapError> {
        if params.taker.is_none() {
            return Err(SwapError::MissingTaker);
        }

        let quote = self.api.quote(params).await?;

        if !quote.liquidity_available {
            return Err(SwapError::NoLiquidity);
        }
        if quote.trade.is_none() {
            return Err(SwapError::Protocol(
                "quote carried no trade payload".to_string(),
            ));
        }

        tracing::info!(
            "Firm quote: {} sell units -> {} buy units",
            quote.sell_amount,
            quote.buy_amount
        );
        self.set_phase(TradePhase::QuoteFetched).await;
        Ok(quote)
    }

    /// Decide how the allowance gets covered for this quote.
    pub async fn resolve_approval(&self, quote: &QuoteResponse) -> Result<ApprovalPlan, SwapError> {
        let plan = approval_plan(quote)?;

        match &plan {
            ApprovalPlan::None => tracing::debug!("Allowance already sufficient"),
            ApprovalPlan::SignGasless => tracing::info!("Token supports gasless approval"),
            ApprovalPlan::OnChain { spender } => {
                tracing::info!("Standard approval needed for spender {}", spender)
            }
        }

        self.set_phase(TradePhase::ApprovalResolved).await;
        Ok(plan)
    }

    /// Carry out the on-chain leg of the plan, if there is one. The
    /// approval waits for one confirmation; a revert is fatal for the
    /// whole trade.
    pub async fn execute_approval(
        &self,
        sell_token: &str,
        plan: &ApprovalPlan,
    ) -> Result<(), SwapError> {
        if let ApprovalPlan::OnChain { spender } = plan {
            self.chain
                .approve_max(sell_token, spender)
                .await
                .map_err(|e| SwapError::ApprovalFailed(e.to_string()))?;
        }
        Ok(())
    }

    /// Sign the quote's payloads in order (approval first when present,
    /// then the trade) and submit them to the relay. A rejected
    /// submission is fatal and is never retried, since the relay may
    /// have accepted the first attempt.
    pub async fn sign_and_submit(
        &self,
        quote: QuoteResponse,
        plan: &ApprovalPlan,
    ) -> Result<String, SwapError> {
        let trade_envelope = quote
            .trade
            .ok_or_else(|| SwapError::Protocol("quote carried no trade payload".to_string()))?;

        let approval = match plan {
            ApprovalPlan::SignGasless => {
                let envelope = quote.approval.ok_or_else(|| {
                    SwapError::Protocol("gasless plan without an approval payload".to_string())
                })?;
                Some(self.sign_envelope(envelope).await?)
            }
            _ => None,
        };

        let trade = self.sign_envelope(trade_envelope).await?;
        self.set_phase(TradePhase::Signed).await;

        let request = SubmitRequest {
            trade,
            approval,
            chain_id: self.chain_id,
        };

        let response = match self.api.submit(&request).await {
            Ok(response) => response,
            Err(SwapApiError::Rejected { status, detail }) => {
                return Err(SwapError::SubmissionRejected { status, detail });
            }
            Err(other) => return Err(other.into()),
        };

        tracing::info!("Trade submitted, hash {}", response.trade_hash);
        self.set_phase(TradePhase::Submitted).await;
        Ok(response.trade_hash)
    }

    async fn sign_envelope(&self, envelope: SignableEnvelope) -> Result<SignedEnvelope, SwapError> {
        let raw = self
            .wallet
            .sign_typed_data(&envelope.eip712)
            .await
            .map_err(|e| match e {
                WalletError::Declined => SwapError::SigningDeclined,
                other => SwapError::Signing(other.to_string()),
            })?;

        let parts = signature::split(&raw)?;
        Ok(envelope.into_signed(parts.with_signature_type(SignatureType::Eip712)))
    }

    /// Poll the trade status at a fixed interval until it settles,
    /// fails, or the deadline passes. A deadline hit is reported as a
    /// timeout, never as a failure.
    pub async fn poll_status(&self, trade_hash: &str) -> Result<String, SwapError> {
        self.set_phase(TradePhase::Polling).await;
        let started = tokio::time::Instant::now();

        loop {
            if *self.is_cancelled.read().await {
                return Err(SwapError::Cancelled);
            }

            let status = self.api.status(trade_hash, self.chain_id).await?;

            if status.status.is_terminal_success() {
                if let Some(approvals) = &status.approval_transactions {
                    for tx in approvals {
                        tracing::info!("Approval settled in {}", tx.hash);
                    }
                }

                let tx_hash = status
                    .transactions
                    .first()
                    .map(|tx| tx.hash.clone())
                    .ok_or_else(|| {
                        SwapError::Protocol("settled trade without transactions".to_string())
                    })?;

                tracing::info!("Trade settled in {}", tx_hash);
                return Ok(tx_hash);
            }

            if status.status == TradeStatus::Failed {
                let reason = status
                    .failure_reason()
                    .unwrap_or_else(|| FailureReason::Unknown("unspecified".to_string()));
                tracing::error!("Trade failed: {}", reason);
                return Err(SwapError::TerminalFailure(reason));
            }

            tracing::debug!(
                "Trade {} not settled yet ({:?}), polling again in {:?}",
                trade_hash,
                status.status,
                self.poll_interval
            );

            if started.elapsed() >= self.poll_deadline {
                return Err(SwapError::PollTimeout(self.poll_deadline.as_secs()));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Run the whole flow for one swap. The taker defaults to the
    /// wallet address when the caller did not set one.
    pub async fn run_swap(&self, params: PriceParams) -> Result<SwapOutcome, SwapError> {
        let result = self.drive(params).await;

        match &result {
            Ok(outcome) => {
                self.set_phase(TradePhase::Succeeded {
                    tx_hash: outcome.tx_hash.clone(),
                })
                .await;
            }
            Err(SwapError::PollTimeout(_)) => self.set_phase(TradePhase::TimedOut).await,
            Err(e) => {
                self.set_phase(TradePhase::Failed {
                    reason: e.to_string(),
                })
                .await;
            }
        }

        result
    }

    async fn drive(&self, params: PriceParams) -> Result<SwapOutcome, SwapError> {
        let params = if params.taker.is_none() {
            params.with_taker(&self.wallet.address())
        } else {
            params
        };

        self.fetch_price(&params).await?;
        let quote = self.fetch_quote(&params).await?;
        let plan = self.resolve_approval(&quote).await?;
        self.execute_approval(&params.sell_token, &plan).await?;

        let sell_amount = quote.sell_amount.clone();
        let buy_amount = quote.buy_amount.clone();

        let trade_hash = self.sign_and_submit(quote, &plan).await?;
        let tx_hash = self.poll_status(&trade_hash).await?;

        Ok(SwapOutcome {
            trade_hash,
            tx_hash,
            sell_amount,
            buy_amount,
        })
    }
}

// Implement Clone for SwapOrchestrator (needed for sharing across tasks)
impl Clone for SwapOrchestrator {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            wallet: Arc::clone(&self.wallet),
            chain: Arc::clone(&self.chain),
            chain_id: self.chain_id,
            poll_interval: self.poll_interval,
            poll_deadline: self.poll_deadline,
            phase: Arc::clone(&self.phase),
            is_cancelled: Arc::clone(&self.is_cancelled),
        }
    }
}
