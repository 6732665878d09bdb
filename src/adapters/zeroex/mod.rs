//! 0x Adapter
//!
//! Implementation of the SwapApiPort and PriceFeedPort for the 0x
//! gasless swap API. Handles authentication headers, endpoint routing,
//! and USD price derivation.

mod client;
mod price_feed;

pub use client::{ZeroExClient, ZeroExConfig};
pub use price_feed::ZeroExPriceFeed;
