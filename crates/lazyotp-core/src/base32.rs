//! RFC 4648 Base32 codec for OTP secrets.
//!
//! Decoding is deliberately forgiving about presentation: secrets are
//! typed by hand or copied out of web pages, so case, embedded whitespace
//! and trailing `=` padding are all accepted. Anything outside the
//! alphabet, or a length that leaves a partial output byte, is rejected.

use data_encoding::{DecodeKind, Encoding, BASE32, BASE32_NOPAD};

use crate::OtpError;

/// Normalize user-supplied Base32 text.
///
/// Strips all whitespace, upper-cases ASCII letters and removes trailing
/// `=` padding of any length. Characters outside the alphabet are kept
/// so that [`decode`] can report them.
#[must_use]
pub fn normalize(text: &str) -> String {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    compact.trim_end_matches('=').to_owned()
}

/// Decode Base32 text into raw bytes.
///
/// # Errors
///
/// Returns [`OtpError::InvalidEncoding`] if a character is outside the
/// RFC 4648 alphabet or the symbol count does not map onto whole bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, OtpError> {
    let normalized = normalize(text);
    lenient_nopad()?
        .decode(normalized.as_bytes())
        .map_err(|e| {
            let reason = match e.kind {
                DecodeKind::Symbol => format!("invalid character at position {}", e.position),
                DecodeKind::Length => format!(
                    "{} symbols do not form a whole number of bytes",
                    normalized.len()
                ),
                _ => e.to_string(),
            };
            OtpError::InvalidEncoding(reason)
        })
}

/// Encode bytes as unpadded upper-case Base32.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    BASE32_NOPAD.encode(bytes)
}

/// Encode bytes as padded upper-case Base32.
#[must_use]
pub fn encode_padded(bytes: &[u8]) -> String {
    BASE32.encode(bytes)
}

/// Unpadded Base32 that ignores non-zero trailing bits.
///
/// Several issuers emit secrets whose final symbol carries stray low bits;
/// authenticator apps accept them, so we do too.
fn lenient_nopad() -> Result<Encoding, OtpError> {
    let mut spec = BASE32_NOPAD.specification();
    spec.check_trailing_bits = false;
    spec.encoding()
        .map_err(|e| OtpError::InvalidEncoding(format!("codec setup failed: {e}")))
}

// ── Tests ───────────────────────────────────────────────────────────
