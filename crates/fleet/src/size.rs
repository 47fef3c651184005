//! Human-readable memory and disk sizes.
//!
//! Sizes are normalised to whole megabytes: `MB` ×1, `GB` ×1024,
//! `TB` ×1024². Fractions are accepted and truncated toward zero after
//! scaling, so `"1.5GB"` is 1536.

use thiserror::Error;

/// Megabytes per megabyte.
pub const MB: i64 = 1;
/// Megabytes per gigabyte.
pub const GB: i64 = 1024;
/// Megabytes per terabyte.
pub const TB: i64 = 1024 * 1024;

/// Why a size string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizeError {
    /// No `MB`/`GB`/`TB` suffix
    #[error("unsupported size unit in {0:?} (use MB, GB, or TB)")]
    UnsupportedUnit(String),

    /// The part before the suffix is not a finite number
    #[error("invalid number in size {0:?}")]
    InvalidNumber(String),
}

/// Parse a size like `"8GB"` or `"512mb"` into megabytes.
///
/// An empty (or all-whitespace) string is zero. Negative magnitudes are not
/// rejected here; callers that need a positive size check the sign.
pub fn parse_size(input: &str) -> Result<i64, SizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    let upper = trimmed.to_ascii_uppercase();
    let (number, multiplier) = if let Some(num) = upper.strip_suffix("TB") {
        (num, TB)
    } else if let Some(num) = upper.strip_suffix("GB") {
        (num, GB)
    } else if let Some(num) = upper.strip_suffix("MB") {
        (num, MB)
    } else {
        return Err(SizeError::UnsupportedUnit(input.to_string()));
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| SizeError::InvalidNumber(input.to_string()))?;
    if !value.is_finite() {
        return Err(SizeError::InvalidNumber(input.to_string()));
    }

    Ok((value * multiplier as f64) as i64)
}
