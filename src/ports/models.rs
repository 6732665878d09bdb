//! Wire Models
//!
//! Request and response shapes shared between the orchestration layer
//! and the aggregator API adapter. Amounts travel as base-unit strings
//! to avoid precision loss; `eip712` documents stay opaque JSON and are
//! echoed back exactly as received.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::signature::SubmitSignature;

/// Query parameters for the price and quote endpoints.
///
/// Exactly one of `sell_amount`/`buy_amount` is set; the constructors
/// enforce it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceParams {
    pub chain_id: u64,
    pub sell_token: String,
    pub buy_token: String,
    pub sell_amount: Option<u128>,
    pub buy_amount: Option<u128>,
    pub taker: Option<String>,
    pub slippage_percentage: Option<f64>,
    pub check_approval: bool,
}

impl PriceParams {
    /// Price a swap by the amount being sold.
    pub fn sell(chain_id: u64, sell_token: &str, buy_token: &str, sell_amount: u128) -> Self {
        Self {
            chain_id,
            sell_token: sell_token.to_string(),
            buy_token: buy_token.to_string(),
            sell_amount: Some(sell_amount),
            buy_amount: None,
            taker: None,
            slippage_percentage: None,
            check_approval: false,
        }
    }

    /// Price a swap by the amount being bought.
    pub fn buy(chain_id: u64, sell_token: &str, buy_token: &str, buy_amount: u128) -> Self {
        Self {
            buy_amount: Some(buy_amount),
            sell_amount: None,
            ..Self::sell(chain_id, sell_token, buy_token, 0)
        }
    }

    pub fn with_taker(mut self, taker: &str) -> Self {
        self.taker = Some(taker.to_string());
        self
    }

    pub fn with_slippage(mut self, percentage: f64) -> Self {
        self.slippage_percentage = Some(percentage);
        self
    }

    pub fn with_approval_check(mut self) -> Self {
        self.check_approval = true;
        self
    }

    /// Render as query pairs, leaving unset options out entirely.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("chainId".to_string(), self.chain_id.to_string()),
            ("sellToken".to_string(), self.sell_token.clone()),
            ("buyToken".to_string(), self.buy_token.clone()),
        ];

        if let Some(amount) = self.sell_amount {
            query.push(("sellAmount".to_string(), amount.to_string()));
        }
        if let Some(amount) = self.buy_amount {
            query.push(("buyAmount".to_string(), amount.to_string()));
        }
        if let Some(ref taker) = self.taker {
            query.push(("taker".to_string(), taker.clone()));
        }
        if let Some(slippage) = self.slippage_percentage {
            query.push(("slippagePercentage".to_string(), slippage.to_string()));
        }
        if self.check_approval {
            query.push(("checkApproval".to_string(), "true".to_string()));
        }

        query
    }
}

/// Allowance problem reported by the API for the taker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceIssue {
    /// Current allowance, base units
    #[serde(default)]
    pub actual: Option<String>,
    /// Contract that needs the allowance
    #[serde(default)]
    pub spender: Option<String>,
}

/// Validation issues attached to a price or quote
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issues {
    /// Present when the taker's allowance is insufficient
    #[serde(default)]
    pub allowance: Option<AllowanceIssue>,
}

/// Response of the indicative price endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub buy_amount: String,
    #[serde(default)]
    pub sell_amount: String,
    /// Absent counts as unavailable
    #[serde(default)]
    pub liquidity_available: bool,
    #[serde(default)]
    pub allowance_target: Option<String>,
    #[serde(default)]
    pub fees: Option<Value>,
    #[serde(default)]
    pub sources: Option<Value>,
    #[serde(default)]
    pub issues: Issues,
}

/// A signable object from a quote: opaque typed data plus its variant tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignableEnvelope {
    /// Settlement variant, e.g. "metatransaction_v2"; echoed back verbatim
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub hash: Option<String>,
    /// Full typed-data document: types/domain/message/primaryType
    pub eip712: Value,
}

impl SignableEnvelope {
    /// Pair the envelope with its signature for submission.
    pub fn into_signed(self, signature: SubmitSignature) -> SignedEnvelope {
        SignedEnvelope {
            kind: self.kind,
            eip712: self.eip712,
            signature,
        }
    }
}

/// Response of the firm quote endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub buy_amount: String,
    #[serde(default)]
    pub sell_amount: String,
    #[serde(default)]
    pub liquidity_available: bool,
    #[serde(default)]
    pub allowance_target: Option<String>,
    #[serde(default)]
    pub issues: Issues,
    /// Gasless approval envelope; present only when the token supports it
    #[serde(default)]
    pub approval: Option<SignableEnvelope>,
    /// The swap itself; always present on a valid firm quote
    #[serde(default)]
    pub trade: Option<SignableEnvelope>,
    /// Permit2 envelope for the non-gasless settlement path
    #[serde(default)]
    pub permit2: Option<SignableEnvelope>,
}

/// A signed envelope as embedded in the submission body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub eip712: Value,
    pub signature: SubmitSignature,
}

/// Body of the submit endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub trade: SignedEnvelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<SignedEnvelope>,
    pub chain_id: u64,
}

/// Response of the submit endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub trade_hash: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Trade execution status reported by the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Submitted,
    Succeeded,
    Confirmed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TradeStatus {
    /// Both success spellings are terminal; unknown statuses keep the
    /// poll alive.
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, TradeStatus::Succeeded | TradeStatus::Confirmed)
    }
}

/// Mined transaction reference from the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransaction {
    pub hash: String,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Response of the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: TradeStatus,
    #[serde(default)]
    pub transactions: Vec<StatusTransaction>,
    #[serde(default)]
    pub approval_transactions: Option<Vec<StatusTransaction>>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl StatusResponse {
    /// Decode the failure reason, preserving unknown codes verbatim.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.reason.as_deref().map(FailureReason::from_code)
    }
}

/// Closed set of terminal failure codes from the settlement service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    SimulationFailed,
    OrderExpired,
    MarketMakerDeclined,
    Reverted,
    SignatureError,
    InternalError,
    Unknown(String),
}

impl FailureReason {
    pub fn from_code(code: &str) -> Self {
        match code {
            "simulation_failed" => FailureReason::SimulationFailed,
            "order_expired" => FailureReason::OrderExpired,
            "market_maker_declined" => FailureReason::MarketMakerDeclined,
            "reverted" => FailureReason::Reverted,
            "signature_error" => FailureReason::SignatureError,
            "internal_error" => FailureReason::InternalError,
            other => FailureReason::Unknown(other.to_string()),
        }
    }

    pub fn as_code(&self) -> &str {
        match self {
            FailureReason::SimulationFailed => "simulation_failed",
            FailureReason::OrderExpired => "order_expired",
            FailureReason::MarketMakerDeclined => "market_maker_declined",
            FailureReason::Reverted => "reverted",
            FailureReason::SignatureError => "signature_error",
            FailureReason::InternalError => "internal_error",
            FailureReason::Unknown(code) => code,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code())
    }
}
