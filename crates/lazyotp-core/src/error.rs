//! Error types for `lazyotp-core`.

use thiserror::Error;

/// Errors produced by OTP primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtpError {
    /// Text is not valid RFC 4648 Base32 (bad character or bit length).
    #[error("invalid base32 encoding: {0}")]
    InvalidEncoding(String),

    /// Digit count outside the supported 6–10 range.
    #[error("unsupported digit count: {0} (expected 6 to 10)")]
    UnsupportedDigitCount(i64),

    /// TOTP period must be strictly positive.
    #[error("invalid period: {0}s (must be > 0)")]
    InvalidPeriod(i64),

    /// Secret decoded to zero bytes.
    #[error("secret must not be empty")]
    EmptySecret,
}
