//! Swap API Port
//!
//! Abstraction over the DEX-aggregator HTTP surface. Adapters translate
//! these calls into the four gasless endpoints; the orchestrator only
//! ever talks through this trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::ports::models::{
    PriceParams, PriceResponse, QuoteResponse, StatusResponse, SubmitRequest, SubmitResponse,
};

/// Swap API error type
#[derive(Error, Debug)]
pub enum SwapApiError {
    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("API rejected request with status {status}: {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Response parsing error: {0}")]
    Parse(String),

    #[error("API key is not configured")]
    MissingApiKey,
}

/// Aggregator endpoints used by the trade flow
#[async_trait]
pub trait SwapApiPort: Send + Sync {
    /// Fetch an indicative price. Never commits liquidity.
    async fn price(&self, params: &PriceParams) -> Result<PriceResponse, SwapApiError>;

    /// Fetch a firm quote with signable payloads. Quotes expire after
    /// roughly thirty seconds and are not refreshed here.
    async fn quote(&self, params: &PriceParams) -> Result<QuoteResponse, SwapApiError>;

    /// Submit signed payloads to the relay. A non-2xx response is
    /// surfaced as `Rejected` and must not be retried.
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, SwapApiError>;

    /// Look up the execution status of a submitted trade.
    async fn status(&self, trade_hash: &str, chain_id: u64)
        -> Result<StatusResponse, SwapApiError>;
}
