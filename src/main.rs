//! swapsmith - Gasless DEX Trading Bot
//!
//! Trades ERC-20 tokens through a gasless DEX-aggregator relay on Ethereum.

use anyhow::Result;

use swapsmith::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
