//! Shared-secret container for OTP credentials.
//!
//! The decoded key is held in a zeroize-on-drop buffer and never shows
//! up in `Debug` output. The only textual form handed out is Base32.

use std::fmt;

use zeroize::Zeroizing;

use crate::{base32, OtpError};

/// A non-empty HMAC key decoded from Base32.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpSecret {
    bytes: Zeroizing<Vec<u8>>,
}

impl OtpSecret {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::EmptySecret`] if `bytes` is empty.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, OtpError> {
        if bytes.is_empty() {
            return Err(OtpError::EmptySecret);
        }
        Ok(Self {
            bytes: Zeroizing::new(bytes),
        })
    }

    /// Decode a Base32 secret as typed by a user or found in a URI.
    ///
    /// # Errors
    ///
    /// - [`OtpError::InvalidEncoding`] for malformed Base32.
    /// - [`OtpError::EmptySecret`] if nothing remains after normalization.
    pub fn from_base32(text: &str) -> Result<Self, OtpError> {
        Self::from_bytes(base32::decode(text)?)
    }

    /// Canonical upper-case, unpadded Base32 form.
    #[must_use]
    pub fn to_base32(&self) -> String {
        base32::encode(&self.bytes)
    }

    /// Raw key bytes for HMAC computation.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// Key length in bytes (always > 0).
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; present for API symmetry with slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for OtpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OtpSecret({} bytes, ***)", self.bytes.len())
    }
}
