pub mod engine;
pub mod monitor;
pub mod orchestrator;

pub use engine::{BotEngine, EngineConfig, EngineError, PositionSummary};
pub use monitor::{MonitorConfig, PositionEvent, PositionMonitor};
pub use orchestrator::{
    ApprovalPlan, SwapError, SwapOrchestrator, SwapOutcome, TradePhase,
};
