//! `lazyotp-core`: Pure OTP primitives for lazyotp.
//!
//! Zero I/O, zero async, zero logging. Everything here is deterministic
//! computation over bytes, so it can be tested against published vectors.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod base32;
pub mod error;
pub mod secret;
pub mod totp;

pub use error::OtpError;
pub use secret::OtpSecret;
pub use totp::{
    generate_hotp, generate_totp, time_step, HashAlgorithm, OtpDigits, DEFAULT_DIGITS,
    DEFAULT_PERIOD,
};
