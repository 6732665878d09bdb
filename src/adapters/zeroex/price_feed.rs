//! Aggregator Price Feed
//!
//! USD pricing via the indicative price endpoint: quote one whole token
//! against USDC and scale the answer by USDC's six decimals. Shares the
//! swap client, so the same API key and rate limits apply.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::models::PriceParams;
use crate::ports::price_feed::{PriceFeedError, PriceFeedPort};
use crate::ports::swap_api::SwapApiPort;

const USDC_BASE_UNITS_PER_DOLLAR: f64 = 1e6;

/// Price feed backed by the aggregator's indicative price endpoint
pub struct ZeroExPriceFeed {
    api: Arc<dyn SwapApiPort>,
    chain_id: u64,
    usdc_address: String,
}

impl ZeroExPriceFeed {
    pub fn new(api: Arc<dyn SwapApiPort>, chain_id: u64, usdc_address: &str) -> Self {
        Self {
            api,
            chain_id,
            usdc_address: usdc_address.to_string(),
        }
    }
}

#[async_trait]
impl PriceFeedPort for ZeroExPriceFeed {
    async fn usd_price(&self, token: &str, decimals: u8) -> Result<f64, PriceFeedError> {
        let one_token = 10u128
            .checked_pow(decimals as u32)
            .ok_or_else(|| PriceFeedError::LookupFailed(format!("decimals out of range: {}", decimals)))?;

        let params = PriceParams::sell(self.chain_id, token, &self.usdc_address, one_token);
        let price = self
            .api
            .price(&params)
            .await
            .map_err(|e| PriceFeedError::LookupFailed(e.to_string()))?;

        // A dried-up pool reads as a zero price; callers retry on the
        // next tick rather than treating it as an exit signal.
        if !price.liquidity_available {
            return Ok(0.0);
        }

        let buy_units: u128 = price
            .buy_amount
            .parse()
            .map_err(|_| PriceFeedError::LookupFailed(format!("bad buyAmount: {}", price.buy_amount)))?;

        Ok(buy_units as f64 / USDC_BASE_UNITS_PER_DOLLAR)
    }
}
