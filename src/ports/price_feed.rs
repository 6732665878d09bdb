//! Price Feed Port
//!
//! USD pricing for the position monitor, decoupled from the swap flow
//! so exits can be driven by scripted sequences in tests.

use async_trait::async_trait;
use thiserror::Error;

/// Price feed error type
#[derive(Error, Debug)]
pub enum PriceFeedError {
    #[error("price lookup failed: {0}")]
    LookupFailed(String),
}

/// USD price source for a token
#[async_trait]
pub trait PriceFeedPort: Send + Sync {
    /// Current USD price of one whole token. A zero return means the
    /// feed had no answer this round; callers treat it as transient.
    async fn usd_price(&self, token: &str, decimals: u8) -> Result<f64, PriceFeedError>;
}
