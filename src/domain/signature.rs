//! Signature Codec
//!
//! Splits a wallet-produced compact ECDSA signature into the normalized
//! form the settlement API expects: zero-padded `r`/`s` words, the `v`
//! recovery id, and the derived `recoveryParam`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hex digits in one padded 32-byte signature word
pub const WORD_HEX_LEN: usize = 64;

/// Minimum hex digits after the `0x` prefix: r (64) + s (64) + v (>= 2)
const MIN_PAYLOAD_HEX_LEN: usize = 2 * WORD_HEX_LEN + 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("signature must start with 0x")]
    MissingPrefix,

    #[error("signature too short: need at least {MIN_PAYLOAD_HEX_LEN} hex chars after 0x, got {0}")]
    TooShort(usize),

    #[error("signature contains non-hex characters in {0}")]
    NonHex(&'static str),

    #[error("recovery byte is not a valid integer: {0}")]
    InvalidRecoveryByte(String),
}

/// Signature scheme identifiers understood by the settlement API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SignatureType {
    Illegal = 0,
    Invalid = 1,
    Eip712 = 2,
    EthSign = 3,
}

impl From<SignatureType> for u8 {
    fn from(value: SignatureType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for SignatureType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SignatureType::Illegal),
            1 => Ok(SignatureType::Invalid),
            2 => Ok(SignatureType::Eip712),
            3 => Ok(SignatureType::EthSign),
            other => Err(format!("unknown signature type {}", other)),
        }
    }
}

/// A compact signature decomposed into its submission components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSignature {
    /// Recovery id augmented by 27
    pub v: u64,
    /// 32-byte word, `0x` + exactly 64 hex chars
    pub r: String,
    /// 32-byte word, `0x` + exactly 64 hex chars
    pub s: String,
    /// `1 - (v mod 2)`, always 0 or 1
    pub recovery_param: u8,
}

/// Signature object as embedded in a submission payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSignature {
    pub v: u64,
    pub r: String,
    pub s: String,
    pub recovery_param: u8,
    pub signature_type: SignatureType,
}

impl SplitSignature {
    /// Attach a signature type, producing the submission-ready form.
    /// Every signature this system produces is EIP-712.
    pub fn with_signature_type(self, signature_type: SignatureType) -> SubmitSignature {
        SubmitSignature {
            v: self.v,
            r: self.r,
            s: self.s,
            recovery_param: self.recovery_param,
            signature_type,
        }
    }
}

/// Split a raw `0x`-prefixed compact signature (`r` + `s` + `v`) into its
/// components, left-padding `r` and `s` to full 32-byte words.
///
/// The input layout is 64 hex chars of `r`, 64 of `s`, and the remaining
/// trailing hex as `v`. Malformed input is a [`DecodeError`]; the caller
/// must abort the submission rather than recover.
pub fn split(raw_signature: &str) -> Result<SplitSignature, DecodeError> {
    let payload = raw_signature
        .strip_prefix("0x")
        .or_else(|| raw_signature.strip_prefix("0X"))
        .ok_or(DecodeError::MissingPrefix)?;

    if payload.len() < MIN_PAYLOAD_HEX_LEN {
        return Err(DecodeError::TooShort(payload.len()));
    }

    let r_hex = payload.get(..WORD_HEX_LEN).ok_or(DecodeError::NonHex("r"))?;
    let s_hex = payload
        .get(WORD_HEX_LEN..2 * WORD_HEX_LEN)
        .ok_or(DecodeError::NonHex("s"))?;
    let v_hex = payload.get(2 * WORD_HEX_LEN..).ok_or(DecodeError::NonHex("v"))?;

    if !is_hex(r_hex) {
        return Err(DecodeError::NonHex("r"));
    }
    if !is_hex(s_hex) {
        return Err(DecodeError::NonHex("s"));
    }
    if !is_hex(v_hex) {
        return Err(DecodeError::NonHex("v"));
    }

    let v = u64::from_str_radix(v_hex, 16)
        .map_err(|e| DecodeError::InvalidRecoveryByte(e.to_string()))?;

    Ok(SplitSignature {
        v,
        r: pad_hex_word(&format!("0x{}", r_hex)),
        s: pad_hex_word(&format!("0x{}", s_hex)),
        recovery_param: (1 - (v % 2)) as u8,
    })
}

/// Left-pad a `0x`-prefixed hex word to exactly 64 hex chars.
///
/// Only strings matching `^0x<hex>$` are padded; anything else is
/// returned unmodified. Words already at or beyond 64 chars are never
/// truncated.
pub fn pad_hex_word(word: &str) -> String {
    let hex = match word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        Some(h) if !h.is_empty() && is_hex(h) => h,
        _ => return word.to_string(),
    };

    if hex.len() >= WORD_HEX_LEN {
        return word.to_string();
    }

    format!("0x{}{}", "0".repeat(WORD_HEX_LEN - hex.len()), hex)
}

fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit())
}
