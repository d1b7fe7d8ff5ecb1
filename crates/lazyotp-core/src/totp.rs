//! RFC 4226 HOTP and RFC 6238 TOTP generation engine.
//!
//! Provides standards-compliant one-time password generation using
//! `ring::hmac` for HMAC-SHA1, HMAC-SHA256, and HMAC-SHA512.

use ring::hmac;
use serde::{Deserialize, Serialize};

use crate::OtpError;

// ── Constants ───────────────────────────────────────────────────────

/// Default TOTP period in seconds (RFC 6238 §4).
pub const DEFAULT_PERIOD: u32 = 30;

/// Default code length.
pub const DEFAULT_DIGITS: OtpDigits = OtpDigits(6);

const MIN_DIGITS: u8 = 6;
const MAX_DIGITS: u8 = 10;

// ── Types ───────────────────────────────────────────────────────────

/// HMAC algorithm used for OTP generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// HMAC-SHA1 (default for most authenticator apps).
    #[default]
    #[serde(rename = "SHA1")]
    Sha1,
    /// HMAC-SHA256.
    #[serde(rename = "SHA256")]
    Sha256,
    /// HMAC-SHA512.
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// Name as it appears in `otpauth://` URIs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    /// Case-insensitive lookup by URI name (`sha1`, `SHA256`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Sha1, Self::Sha256, Self::Sha512]
            .into_iter()
            .find(|alg| alg.as_str().eq_ignore_ascii_case(name))
    }

    /// Digest length in bytes (20/32/64).
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Map to the corresponding `ring::hmac::Algorithm`.
    fn to_ring_algorithm(self) -> hmac::Algorithm {
        match self {
            Self::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => hmac::HMAC_SHA256,
            Self::Sha512 => hmac::HMAC_SHA512,
        }
    }
}

/// Number of digits in an OTP code (6 through 10).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OtpDigits(u8);

impl OtpDigits {
    /// Validate a digit count.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::UnsupportedDigitCount`] outside 6–10.
    pub fn new(digits: i64) -> Result<Self, OtpError> {
        u8::try_from(digits)
            .ok()
            .filter(|d| (MIN_DIGITS..=MAX_DIGITS).contains(d))
            .map(Self)
            .ok_or(OtpError::UnsupportedDigitCount(digits))
    }

    /// Return the numeric digit count.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Return the modulus value (10^digits) for truncation.
    #[must_use]
    const fn modulus(self) -> u64 {
        10u64.pow(self.0 as u32)
    }
}

impl Default for OtpDigits {
    fn default() -> Self {
        DEFAULT_DIGITS
    }
}

impl TryFrom<u8> for OtpDigits {
    type Error = OtpError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<OtpDigits> for u8 {
    fn from(digits: OtpDigits) -> Self {
        digits.0
    }
}

// ── HOTP (RFC 4226) ────────────────────────────────────────────────

/// Generate an HOTP code per RFC 4226.
///
/// # Arguments
/// - `secret`: Shared secret key bytes (from `OtpSecret::expose()`)
/// - `counter`: moving factor, serialized as 8 bytes big-endian
/// - `digits`: Number of output digits (6–10)
/// - `algorithm`: HMAC algorithm to use
///
/// # Errors
/// Returns [`OtpError::EmptySecret`] if the secret is empty.
#[must_use = "OTP code should be used or stored"]
pub fn generate_hotp(
    secret: &[u8],
    counter: u64,
    digits: OtpDigits,
    algorithm: HashAlgorithm,
) -> Result<String, OtpError> {
    if secret.is_empty() {
        return Err(OtpError::EmptySecret);
    }

    let key = hmac::Key::new(algorithm.to_ring_algorithm(), secret);
    let tag = hmac::sign(&key, &counter.to_be_bytes());
    let digest = tag.as_ref();

    // Dynamic truncation (RFC 4226 §5.3): offset = low nibble of last byte.
    // The largest offset is 15 and the shortest digest is 20 bytes, so the
    // 4-byte window always fits.
    let offset = usize::from(digest[digest.len().wrapping_sub(1)] & 0x0F);
    let binary_code = u32::from_be_bytes([
        digest[offset] & 0x7F,
        digest[offset.wrapping_add(1)],
        digest[offset.wrapping_add(2)],
        digest[offset.wrapping_add(3)],
    ]);

    // modulus is 10^6..=10^10, never zero.
    #[allow(clippy::arithmetic_side_effects)]
    let code = u64::from(binary_code) % digits.modulus();
    let width = usize::from(digits.value());

    Ok(format!("{code:0>width$}"))
}

// ── TOTP (RFC 6238) ────────────────────────────────────────────────

/// Compute the RFC 6238 time step `floor((at_time - epoch) / period)`.
///
/// Times before `epoch` clamp to step 0.
///
/// # Errors
/// Returns [`OtpError::InvalidPeriod`] if `period` is 0.
pub fn time_step(at_time: i64, epoch: i64, period: u32) -> Result<u64, OtpError> {
    if period == 0 {
        return Err(OtpError::InvalidPeriod(0));
    }
    // i128 cannot overflow for any pair of i64 values.
    #[allow(clippy::arithmetic_side_effects)]
    let elapsed = i128::from(at_time) - i128::from(epoch);
    if elapsed <= 0 {
        return Ok(0);
    }
    #[allow(clippy::arithmetic_side_effects)]
    let step = elapsed / i128::from(period);
    Ok(u64::try_from(step).unwrap_or(u64::MAX))
}

/// Generate a TOTP code per RFC 6238.
///
/// # Arguments
/// - `secret`: Shared secret key bytes
/// - `at_time`: Unix timestamp in seconds (injectable for tests)
/// - `epoch`: T0, normally 0
/// - `period`: Time step in seconds (typically 30)
/// - `digits`: Number of output digits (6–10)
/// - `algorithm`: HMAC algorithm to use
///
/// # Errors
/// Returns [`OtpError::InvalidPeriod`] if `period` is 0, or
/// [`OtpError::EmptySecret`] if the secret is empty.
#[must_use = "OTP code should be used or stored"]
pub fn generate_totp(
    secret: &[u8],
    at_time: i64,
    epoch: i64,
    period: u32,
    digits: OtpDigits,
    algorithm: HashAlgorithm,
) -> Result<String, OtpError> {
    let step = time_step(at_time, epoch, period)?;
    generate_hotp(secret, step, digits, algorithm)
}

// ── Tests ───────────────────────────────────────────────────────────
