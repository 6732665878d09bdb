//! Input Validation
//!
//! Format and range rules for everything the bot accepts from the
//! outside: token addresses, signing keys, and trade parameters.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid token address '{0}': expected 0x followed by 40 hex chars")]
    InvalidAddress(String),

    #[error("invalid private key: expected 64 hex chars")]
    InvalidPrivateKey,

    #[error("stop-loss must be in (0, 100], got {0}")]
    StopLossOutOfRange(f64),

    #[error("take-profit must be in (0, 1000], got {0}")]
    TakeProfitOutOfRange(f64),

    #[error("amount must be greater than 0, got {0}")]
    AmountNotPositive(f64),

    #[error("timeout must be a positive number of seconds, got {0}")]
    TimeoutNotPositive(i64),
}

/// Check a token contract address: `0x` + exactly 40 hex chars.
pub fn validate_token_address(address: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidAddress(address.to_string());

    let hex = address.strip_prefix("0x").ok_or_else(invalid)?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    Ok(())
}

/// Check a signing key: exactly 64 hex chars, no `0x` prefix.
/// The key value never appears in the error.
pub fn validate_private_key(key: &str) -> Result<(), ValidationError> {
    if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidPrivateKey);
    }
    Ok(())
}

/// Stop-loss percentage, (0, 100].
pub fn validate_stop_loss(pct: f64) -> Result<(), ValidationError> {
    if !(pct > 0.0 && pct <= 100.0) {
        return Err(ValidationError::StopLossOutOfRange(pct));
    }
    Ok(())
}

/// Take-profit percentage, (0, 1000].
pub fn validate_take_profit(pct: f64) -> Result<(), ValidationError> {
    if !(pct > 0.0 && pct <= 1000.0) {
        return Err(ValidationError::TakeProfitOutOfRange(pct));
    }
    Ok(())
}

/// Trade amount in native currency, strictly positive.
pub fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if !(amount > 0.0) || !amount.is_finite() {
        return Err(ValidationError::AmountNotPositive(amount));
    }
    Ok(())
}

/// Position timeout in seconds, strictly positive.
pub fn validate_timeout(seconds: i64) -> Result<(), ValidationError> {
    if seconds <= 0 {
        return Err(ValidationError::TimeoutNotPositive(seconds));
    }
    Ok(())
}
