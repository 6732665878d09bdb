//! Position Monitor
//!
//! Watches an open position against its exit thresholds and emits
//! exactly one terminal event: take-profit, stop-loss, or timeout.
//! Prices come through the PriceFeedPort; a zero or failed read is
//! treated as transient and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};

use crate::ports::price_feed::PriceFeedPort;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_CHANNEL_BUFFER: usize = 16;

/// Position monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Token being watched
    pub token_address: String,
    /// ERC-20 decimals of the token
    pub decimals: u8,
    /// USD entry price of the position
    pub entry_price: f64,
    /// Take-profit threshold, percent above entry
    pub take_profit_pct: f64,
    /// Stop-loss threshold, percent below entry
    pub stop_loss_pct: f64,
    /// Maximum holding time before a forced exit
    pub timeout: Duration,
    /// Price poll interval
    pub poll_interval: Duration,
    /// Event channel capacity
    pub channel_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            token_address: String::new(),
            decimals: 18,
            entry_price: 0.0,
            take_profit_pct: 10.0,
            stop_loss_pct: 5.0,
            timeout: Duration::from_secs(3600),
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
        }
    }
}

/// Terminal event for a monitored position
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    /// Price reached or crossed the take-profit threshold
    TakeProfit { price: f64 },
    /// Price reached or crossed the stop-loss threshold
    StopLoss { price: f64 },
    /// Holding time ran out; carries the last observed price
    Timeout { last_price: f64 },
}

/// Exit decision for a single observed price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    TakeProfit,
    StopLoss,
}

/// Classify one price against the thresholds. Take-profit is checked
/// before stop-loss; threshold equality counts as a hit.
pub fn classify_price(
    entry_price: f64,
    take_profit_pct: f64,
    stop_loss_pct: f64,
    price: f64,
) -> Option<ExitTrigger> {
    let take_profit_at = entry_price * (100.0 + take_profit_pct) / 100.0;
    let stop_loss_at = entry_price * (100.0 - stop_loss_pct) / 100.0;

    if price >= take_profit_at {
        Some(ExitTrigger::TakeProfit)
    } else if price <= stop_loss_at {
        Some(ExitTrigger::StopLoss)
    } else {
        None
    }
}

/// Watches one open position until an exit condition fires
///
/// # Example
/// ```ignore
/// let (monitor, mut rx) = PositionMonitor::new(config, feed);
///
/// tokio::spawn(async move {
///     monitor.run().await;
/// });
///
/// match rx.recv().await {
///     Some(PositionEvent::TakeProfit { price }) => sell_at(price),
///     Some(PositionEvent::StopLoss { price }) => sell_at(price),
///     Some(PositionEvent::Timeout { last_price }) => sell_at(last_price),
///     None => {}
/// }
/// ```
pub struct PositionMonitor {
    config: MonitorConfig,
    feed: Arc<dyn PriceFeedPort>,
    event_tx: mpsc::Sender<PositionEvent>,
    is_running: Arc<RwLock<bool>>,
}

impl PositionMonitor {
    /// Create a new monitor with its event receiver.
    pub fn new(
        config: MonitorConfig,
        feed: Arc<dyn PriceFeedPort>,
    ) -> (Self, mpsc::Receiver<PositionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.channel_buffer);

        let monitor = Self {
            config,
            feed,
            event_tx,
            is_running: Arc::new(RwLock::new(false)),
        };

        (monitor, event_rx)
    }

    /// Stop the watch loop without emitting an event.
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
    }

    /// Run until a terminal event fires or the monitor is stopped. The
    /// holding clock starts here, not at position entry.
    pub async fn run(&self) {
        *self.is_running.write().await = true;
        let started = tokio::time::Instant::now();
        let mut last_price = self.config.entry_price;

        tracing::info!(
            "Monitoring {} from entry ${:.6}: take profit +{}%, stop loss -{}%, timeout {:?}",
            self.config.token_address,
            self.config.entry_price,
            self.config.take_profit_pct,
            self.config.stop_loss_pct,
            self.config.timeout
        );

        loop {
            if !*self.is_running.read().await {
                tracing::info!("Position monitor stopped");
                return;
            }

            // Timeout is checked before the price fetch so a stalled
            // feed cannot hold the position open forever.
            if started.elapsed() >= self.config.timeout {
                tracing::warn!(
                    "Holding timeout reached, last price ${:.6}",
                    last_price
                );
                self.emit(PositionEvent::Timeout { last_price }).await;
                return;
            }

            match self.feed.usd_price(&self.config.token_address, self.config.decimals).await {
                Err(e) => {
                    tracing::warn!("Price fetch failed, will retry: {}", e);
                }
                Ok(price) if price <= 0.0 => {
                    tracing::warn!("Transient zero price, will retry");
                }
                Ok(price) => {
                    last_price = price;
                    let trigger = classify_price(
                        self.config.entry_price,
                        self.config.take_profit_pct,
                        self.config.stop_loss_pct,
                        price,
                    );

                    match trigger {
                        Some(ExitTrigger::TakeProfit) => {
                            tracing::info!("Take profit hit at ${:.6}", price);
                            self.emit(PositionEvent::TakeProfit { price }).await;
                            return;
                        }
                        Some(ExitTrigger::StopLoss) => {
                            tracing::info!("Stop loss hit at ${:.6}", price);
                            self.emit(PositionEvent::StopLoss { price }).await;
                            return;
                        }
                        None => {
                            tracing::debug!(
                                "Price ${:.6}, {:.2}% from entry",
                                price,
                                (price / self.config.entry_price - 1.0) * 100.0
                            );
                        }
                    }
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn emit(&self, event: PositionEvent) {
        *self.is_running.write().await = false;
        if self.event_tx.send(event).await.is_err() {
            tracing::warn!("Position event receiver dropped");
        }
    }
}

// Implement Clone for PositionMonitor (needed for sharing across tasks)
impl Clone for PositionMonitor {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            feed: Arc::clone(&self.feed),
            event_tx: self.event_tx.clone(),
            is_running: Arc::clone(&self.is_running),
        }
    }
}
