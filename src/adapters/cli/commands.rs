//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the swapsmith trading bot.

use clap::{Parser, Subcommand};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::evm::{EvmChain, EvmWallet};
use crate::adapters::zeroex::{ZeroExClient, ZeroExConfig, ZeroExPriceFeed};
use crate::application::{BotEngine, EngineConfig, SwapOrchestrator};
use crate::config::load_config;
use crate::domain::{
    validate_amount, validate_token_address, validate_private_key, BotStore, OrderParams,
};
use crate::ports::models::PriceParams;
use crate::ports::{ChainPort, PriceFeedPort, SwapApiPort, WalletPort};

/// swapsmith - Gasless DEX Trading Bot for Ethereum
#[derive(Parser, Debug)]
#[command(
    name = "swapsmith",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Gasless DEX Trading Bot for Ethereum",
    long_about = "swapsmith trades ERC-20 tokens through a gasless DEX-aggregator relay: \
                  swaps are signed as EIP-712 documents and settled by the relay, so the \
                  wallet never spends gas on the trade itself. The run command opens a \
                  position and watches it until take-profit, stop-loss or timeout."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a position and watch it until exit
    Run(RunCmd),

    /// Execute a single gasless swap
    Swap(SwapCmd),

    /// Fetch an indicative price without committing liquidity
    Price(PriceCmd),

    /// Look up the execution status of a submitted trade
    Status(StatusCmd),
}

/// Open a monitored position
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Token contract address to trade (0x + 40 hex chars)
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// ETH to spend on the position
    #[arg(short, long, value_name = "ETH", default_value_t = 0.1)]
    pub amount: f64,

    /// Take-profit threshold, percent above entry
    #[arg(short = 't', long, value_name = "PCT", default_value_t = 10.0)]
    pub take_profit: f64,

    /// Stop-loss threshold, percent below entry
    #[arg(short = 's', long, value_name = "PCT", default_value_t = 5.0)]
    pub stop_loss: f64,

    /// Close the position after this many seconds regardless of price
    #[arg(long, value_name = "SECS", default_value_t = 3600)]
    pub timeout: i64,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mainnet.toml")]
    pub config: PathBuf,
}

/// Execute a one-off swap
#[derive(Parser, Debug)]
pub struct SwapCmd {
    /// Token contract address to sell
    #[arg(value_name = "SELL_TOKEN")]
    pub sell_token: String,

    /// Token contract address to buy
    #[arg(value_name = "BUY_TOKEN")]
    pub buy_token: String,

    /// Amount to sell, in whole tokens
    #[arg(short, long, value_name = "AMOUNT", default_value_t = 0.1)]
    pub amount: f64,

    /// Override the configured slippage tolerance (percent)
    #[arg(long, value_name = "PCT")]
    pub slippage: Option<f64>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mainnet.toml")]
    pub config: PathBuf,
}

/// Fetch an indicative price
#[derive(Parser, Debug)]
pub struct PriceCmd {
    /// Token contract address to sell
    #[arg(value_name = "SELL_TOKEN")]
    pub sell_token: String,

    /// Token contract address to buy
    #[arg(value_name = "BUY_TOKEN")]
    pub buy_token: String,

    /// Amount to sell, in whole tokens
    #[arg(short, long, value_name = "AMOUNT", default_value_t = 0.1)]
    pub amount: f64,

    /// Decimals of the sell token, used to scale the amount
    #[arg(long, value_name = "N", default_value_t = 18)]
    pub decimals: u8,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mainnet.toml")]
    pub config: PathBuf,
}

/// Look up a submitted trade
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Trade hash returned at submission
    #[arg(value_name = "TRADE_HASH")]
    pub trade_hash: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mainnet.toml")]
    pub config: PathBuf,
}

/// Execute the parsed CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    init_logging(app.verbose, app.debug)?;

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Swap(cmd) => swap_command(cmd).await,
        Command::Price(cmd) => price_command(cmd).await,
        Command::Status(cmd) => status_command(cmd).await,
    }
}

fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    tracing::info!("Starting swapsmith trading bot...");

    let config = load_config(&cmd.config)
        .context("Failed to load configuration")?;

    // Validate everything before touching the network
    let params = OrderParams::new(
        &cmd.token,
        cmd.amount,
        cmd.take_profit,
        cmd.stop_loss,
        cmd.timeout,
    )?;

    let wallet = load_wallet()?;
    let signer = wallet.signer().clone();
    let wallet: Arc<dyn WalletPort> = Arc::new(wallet);

    let api: Arc<dyn SwapApiPort> =
        Arc::new(ZeroExClient::with_config(ZeroExConfig::from(&config))?);
    let chain: Arc<dyn ChainPort> = Arc::new(EvmChain::new(
        &config.chain.get_rpc_url(),
        signer,
        &config.chain.weth_address,
    )?);
    let feed: Arc<dyn PriceFeedPort> = Arc::new(ZeroExPriceFeed::new(
        api.clone(),
        config.chain.chain_id,
        &config.chain.usdc_address,
    ));

    let orchestrator =
        SwapOrchestrator::new(api, wallet.clone(), chain.clone(), config.chain.chain_id)
            .with_poll_interval(config.status_poll_interval())
            .with_poll_deadline(config.status_poll_deadline());

    // Expand data dir (handles ~ for home directory)
    let data_dir = shellexpand::tilde(&config.storage.data_dir).to_string();
    let store = BotStore::open(data_dir)?;

    let mut engine = BotEngine::new(
        store,
        orchestrator,
        feed,
        chain,
        wallet,
        EngineConfig {
            chain_id: config.chain.chain_id,
            weth_address: config.chain.weth_address.clone(),
            slippage_percentage: config.trading.slippage_percentage,
            monitor_interval: config.monitor_interval(),
        },
    );

    // Setup Ctrl+C handler
    let orch = engine.orchestrator_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        orch.stop().await;
    });

    let summary = engine.run_position(&params).await?;

    println!("Position closed");
    println!("  Order id:     {}", summary.order_id);
    println!("  Entry price:  ${:.6}", summary.entry_price);
    println!("  Exit price:   ${:.6}", summary.exit_price);
    println!("  PnL:          ${:.6}", summary.pnl);
    println!("  Lifetime PnL: ${:.6}", summary.total_pnl);
    println!("  Exit tx:      {}", summary.exit_tx_hash);

    tracing::info!("swapsmith stopped");
    Ok(())
}

async fn swap_command(cmd: SwapCmd) -> Result<()> {
    let config = load_config(&cmd.config)
        .context("Failed to load configuration")?;

    validate_token_address(&cmd.sell_token)?;
    validate_token_address(&cmd.buy_token)?;
    validate_amount(cmd.amount)?;

    let wallet = load_wallet()?;
    let signer = wallet.signer().clone();
    let wallet: Arc<dyn WalletPort> = Arc::new(wallet);

    let api: Arc<dyn SwapApiPort> =
        Arc::new(ZeroExClient::with_config(ZeroExConfig::from(&config))?);
    let chain: Arc<dyn ChainPort> = Arc::new(EvmChain::new(
        &config.chain.get_rpc_url(),
        signer,
        &config.chain.weth_address,
    )?);

    let orchestrator =
        SwapOrchestrator::new(api, wallet, chain.clone(), config.chain.chain_id)
            .with_poll_interval(config.status_poll_interval())
            .with_poll_deadline(config.status_poll_deadline());

    let decimals = chain
        .token_decimals(&cmd.sell_token)
        .await
        .context("Failed to read sell token decimals")?;
    let sell_units = to_base_units(cmd.amount, decimals);
    let slippage = cmd.slippage.unwrap_or(config.trading.slippage_percentage);

    let params = PriceParams::sell(
        config.chain.chain_id,
        &cmd.sell_token,
        &cmd.buy_token,
        sell_units,
    )
    .with_slippage(slippage)
    .with_approval_check();

    tracing::info!(
        "Swapping {} of {} for {}",
        cmd.amount,
        cmd.sell_token,
        cmd.buy_token
    );
    let outcome = orchestrator.run_swap(params).await?;

    println!("Swap settled");
    println!("  Trade hash:  {}", outcome.trade_hash);
    println!("  Transaction: {}", outcome.tx_hash);
    println!("  Sold:        {} base units", outcome.sell_amount);
    println!("  Received:    {} base units", outcome.buy_amount);
    Ok(())
}

async fn price_command(cmd: PriceCmd) -> Result<()> {
    let config = load_config(&cmd.config)
        .context("Failed to load configuration")?;

    validate_token_address(&cmd.sell_token)?;
    validate_token_address(&cmd.buy_token)?;
    validate_amount(cmd.amount)?;

    let api = ZeroExClient::with_config(ZeroExConfig::from(&config))?;
    let sell_units = to_base_units(cmd.amount, cmd.decimals);
    let params = PriceParams::sell(
        config.chain.chain_id,
        &cmd.sell_token,
        &cmd.buy_token,
        sell_units,
    );

    let price = api.price(&params).await.context("Failed to fetch price")?;

    if !price.liquidity_available {
        println!("No liquidity for {} -> {}", cmd.sell_token, cmd.buy_token);
        return Ok(());
    }

    println!("Indicative price {} -> {}", cmd.sell_token, cmd.buy_token);
    println!("  Sell amount: {} base units", price.sell_amount);
    println!("  Buy amount:  {} base units", price.buy_amount);
    if let Some(allowance) = &price.issues.allowance {
        if let Some(spender) = &allowance.spender {
            println!("  Allowance needed for spender {}", spender);
        }
    }
    Ok(())
}

async fn status_command(cmd: StatusCmd) -> Result<()> {
    let config = load_config(&cmd.config)
        .context("Failed to load configuration")?;
    let api = ZeroExClient::with_config(ZeroExConfig::from(&config))?;

    let status = api
        .status(&cmd.trade_hash, config.chain.chain_id)
        .await
        .context("Failed to fetch trade status")?;

    println!("Trade {}: {:?}", cmd.trade_hash, status.status);
    for txn in &status.transactions {
        println!("  Settled in:  {}", txn.hash);
    }
    if let Some(approvals) = &status.approval_transactions {
        for txn in approvals {
            println!("  Approval in: {}", txn.hash);
        }
    }
    if let Some(reason) = &status.reason {
        println!("  Failure reason: {}", reason);
    }
    Ok(())
}

/// Read the signing key from the environment with helpful error messages.
/// The key is never accepted as a flag or config value, and its value is
/// never echoed back in errors.
fn load_wallet() -> Result<EvmWallet> {
    let key = match std::env::var("PRIVATE_KEY") {
        Ok(key) => key,
        Err(_) => bail!(
            "PRIVATE_KEY is not set\n\n\
             The signing key is only ever read from the environment, never from\n\
             flags or config files.\n\n\
             Export it before running:\n  \
             export PRIVATE_KEY=<64 hex chars>\n\n\
             Or add it to a .env file next to the binary."
        ),
    };

    // Tolerate a leading 0x; validation wants the bare 64 hex chars
    let key = key.trim().trim_start_matches("0x");
    validate_private_key(key)?;

    EvmWallet::from_private_key(key).context("Failed to load signing key")
}

fn to_base_units(amount: f64, decimals: u8) -> u128 {
    (amount * 10f64.powi(decimals as i32)).round() as u128
}
