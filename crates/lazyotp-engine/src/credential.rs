//! The durable credential record.
//!
//! A credential is either time-based or counter-based; the kind carries the
//! only field that differs between the two, so a `period` on an HOTP
//! credential cannot be expressed. Digit count and secret are validated by
//! their types, which means every `Credential` value is usable as-is.

use std::num::NonZeroU32;

use lazyotp_core::totp::{generate_hotp, generate_totp};
use lazyotp_core::{HashAlgorithm, OtpDigits, OtpSecret, DEFAULT_PERIOD};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// OTP flavour plus its moving-factor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OtpKind {
    /// TOTP (RFC 6238); the moving factor is derived from wall-clock time.
    #[serde(rename = "totp")]
    TimeBased {
        /// Time step in seconds.
        period: NonZeroU32,
    },
    /// HOTP (RFC 4226); the moving factor is a persisted counter.
    #[serde(rename = "hotp")]
    CounterBased {
        /// Counter value for the next code.
        counter: u64,
    },
}

impl OtpKind {
    /// Time-based with the default 30 s period.
    #[must_use]
    pub const fn default_totp() -> Self {
        Self::TimeBased {
            period: default_period(),
        }
    }

    /// Type token used as the host of an `otpauth://` URI.
    #[must_use]
    pub const fn type_token(self) -> &'static str {
        match self {
            Self::TimeBased { .. } => "totp",
            Self::CounterBased { .. } => "hotp",
        }
    }
}

/// `DEFAULT_PERIOD` as a `NonZeroU32`.
#[must_use]
pub const fn default_period() -> NonZeroU32 {
    match NonZeroU32::new(DEFAULT_PERIOD) {
        Some(p) => p,
        None => NonZeroU32::MIN,
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// One stored OTP credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Unique, case-sensitive display name.
    pub name: String,
    /// Informational issuer; not part of uniqueness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Shared secret, persisted as canonical Base32.
    #[serde(with = "secret_base32")]
    pub secret: OtpSecret,
    /// Code length.
    #[serde(default)]
    pub digits: OtpDigits,
    /// HMAC hash.
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    /// TOTP or HOTP with its parameter.
    #[serde(flatten)]
    pub kind: OtpKind,
}

impl Credential {
    /// A time-based credential with default digits, period and algorithm.
    #[must_use]
    pub fn totp(name: impl Into<String>, secret: OtpSecret) -> Self {
        Self {
            name: name.into(),
            issuer: None,
            secret,
            digits: OtpDigits::default(),
            algorithm: HashAlgorithm::default(),
            kind: OtpKind::default_totp(),
        }
    }

    /// A counter-based credential with default digits and algorithm.
    #[must_use]
    pub fn hotp(name: impl Into<String>, secret: OtpSecret, counter: u64) -> Self {
        Self {
            kind: OtpKind::CounterBased { counter },
            ..Self::totp(name, secret)
        }
    }

    /// Current counter for HOTP credentials.
    #[must_use]
    pub const fn counter(&self) -> Option<u64> {
        match self.kind {
            OtpKind::CounterBased { counter } => Some(counter),
            OtpKind::TimeBased { .. } => None,
        }
    }

    /// Period for TOTP credentials.
    #[must_use]
    pub const fn period(&self) -> Option<NonZeroU32> {
        match self.kind {
            OtpKind::TimeBased { period } => Some(period),
            OtpKind::CounterBased { .. } => None,
        }
    }

    /// Whether generating a code mutates persisted state.
    #[must_use]
    pub const fn is_counter_based(&self) -> bool {
        matches!(self.kind, OtpKind::CounterBased { .. })
    }

    /// Check the fields the type system cannot: the name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidName`] for an empty or blank name.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvalidName(
                "name must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Compute the code for this credential without touching any state.
    ///
    /// TOTP uses `unix_time`; HOTP uses the current counter and ignores it.
    ///
    /// # Errors
    ///
    /// Propagates [`lazyotp_core::OtpError`] from the generator.
    pub fn code_at(&self, unix_time: i64) -> Result<String, EngineError> {
        let code = match self.kind {
            OtpKind::TimeBased { period } => generate_totp(
                self.secret.expose(),
                unix_time,
                0,
                period.get(),
                self.digits,
                self.algorithm,
            )?,
            OtpKind::CounterBased { counter } => {
                generate_hotp(self.secret.expose(), counter, self.digits, self.algorithm)?
            }
        };
        Ok(code)
    }
}

/// Serde adapter storing [`OtpSecret`] as canonical Base32 text.
mod secret_base32 {
    use lazyotp_core::OtpSecret;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &OtpSecret, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&secret.to_base32())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OtpSecret, D::Error> {
        let text = String::deserialize(deserializer)?;
        OtpSecret::from_base32(&text).map_err(serde::de::Error::custom)
    }
}
