//! Domain Layer - Core business logic for the gasless trading bot
//!
//! Pure types and logic with no network dependencies. All external
//! interactions happen through the ports layer.
//!
//! - `signature`: compact-signature splitting and padding for submission
//! - `validate`: format/range rules for user-supplied inputs
//! - `order`: user, order and trade records with the PnL arithmetic
//! - `store`: JSON-file persistence of bot state

pub mod order;
pub mod signature;
pub mod store;
pub mod validate;

pub use order::{Order, OrderError, OrderParams, TradeRecord, TradeSide, User};
pub use signature::{
    pad_hex_word, split, DecodeError, SignatureType, SplitSignature, SubmitSignature,
};
pub use store::{BotState, BotStore, RecoveryStatus, StoreError, DEFAULT_STATE_FILE};
pub use validate::{
    validate_amount, validate_private_key, validate_stop_loss, validate_take_profit,
    validate_timeout, validate_token_address, ValidationError,
};
