//! Engine error types for `lazyotp-engine`.

use lazyotp_core::OtpError;
use thiserror::Error;

/// Errors produced by URI parsing, the credential store and QR import.
///
/// Messages name the offending field but never include a secret, a full
/// `otpauth://` URI (which embeds the secret) or a generated code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Encoding, digit-count or period validation failed (delegated from core).
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// Scheme is not `otpauth` or the type is neither `totp` nor `hotp`.
    #[error("not an otpauth URI: {0}")]
    NotAnOtpUri(String),

    /// Percent-encoding or a numeric parameter could not be decoded.
    #[error("malformed URI: {0}")]
    MalformedUri(String),

    /// The required `secret` parameter is absent or empty.
    #[error("URI is missing the 'secret' parameter")]
    MissingSecret,

    /// An `hotp` URI without a `counter` parameter.
    #[error("hotp URI is missing the 'counter' parameter")]
    MissingCounter,

    /// `algorithm` is not one of SHA1, SHA256, SHA512.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Credential name is empty or whitespace.
    #[error("invalid credential name: {0}")]
    InvalidName(String),

    /// A credential with this name already exists.
    #[error("a credential named '{0}' already exists")]
    DuplicateName(String),

    /// No credential with this name.
    #[error("credential not found: {0}")]
    NotFound(String),

    /// The persistence substrate could not be read or written.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// The HOTP counter cannot advance without wrapping.
    #[error("counter exhausted for credential '{0}'")]
    CounterExhausted(String),
}
