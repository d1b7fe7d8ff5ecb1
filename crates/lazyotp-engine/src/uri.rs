//! `otpauth://` URI grammar: parse and serialize.
//!
//! Format:
//! `otpauth://{totp|hotp}/[ISSUER:]LABEL?secret=BASE32&issuer=...&algorithm=SHA1&digits=6&period=30&counter=N`
//!
//! Structure (scheme, host, path, query) is split with the `url` crate;
//! percent-decoding of the label and of each query component is strict, so
//! a stray `%` or invalid UTF-8 is reported instead of passed through.

use std::num::NonZeroU32;

use lazyotp_core::{HashAlgorithm, OtpDigits, OtpError, OtpSecret};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::credential::{default_period, Credential, OtpKind};
use crate::error::EngineError;

/// URI scheme for OTP credentials.
pub const SCHEME: &str = "otpauth";

/// Name hint used when a URI carries neither issuer nor label.
pub const DEFAULT_ACCOUNT_NAME: &str = "New Account";

/// Everything except RFC 3986 unreserved characters gets escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// ---------------------------------------------------------------------------
// Parsed form
// ---------------------------------------------------------------------------

/// A validated `otpauth://` URI, not yet bound to a store name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    /// `issuer` query parameter, if present and non-empty.
    pub issuer: Option<String>,
    /// Issuer prefix of the label (`ISSUER:` part), if any.
    pub label_issuer: Option<String>,
    /// Full percent-decoded label.
    pub label: String,
    /// Decoded shared secret.
    pub secret: OtpSecret,
    /// Code length.
    pub digits: OtpDigits,
    /// HMAC hash.
    pub algorithm: HashAlgorithm,
    /// TOTP period or HOTP counter.
    pub kind: OtpKind,
    /// Suggested display name (issuer, label issuer, label, or a default).
    pub name_hint: String,
}

impl ParsedUri {
    /// Bind the parsed parameters to a final store name.
    #[must_use]
    pub fn into_credential(self, name: impl Into<String>) -> Credential {
        Credential {
            name: name.into(),
            issuer: self.issuer,
            secret: self.secret,
            digits: self.digits,
            algorithm: self.algorithm,
            kind: self.kind,
        }
    }

    /// Bind using the name hint.
    #[must_use]
    pub fn into_hinted_credential(self) -> Credential {
        let name = self.name_hint.clone();
        self.into_credential(name)
    }
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Parse an `otpauth://` URI, falling back to [`DEFAULT_ACCOUNT_NAME`] for
/// the name hint.
///
/// # Errors
///
/// - [`EngineError::NotAnOtpUri`] for a non-URI, wrong scheme or type.
/// - [`EngineError::MalformedUri`] for bad percent-encoding or non-numeric
///   `digits`/`period`/`counter`.
/// - [`EngineError::MissingSecret`], [`EngineError::MissingCounter`],
///   [`EngineError::UnsupportedAlgorithm`].
/// - [`EngineError::Otp`] for invalid Base32, digit count or period.
pub fn parse(uri: &str) -> Result<ParsedUri, EngineError> {
    parse_with_default(uri, DEFAULT_ACCOUNT_NAME)
}

/// Parse an `otpauth://` URI with a caller-chosen fallback name hint.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_with_default(uri: &str, default_name: &str) -> Result<ParsedUri, EngineError> {
    let url = Url::parse(uri.trim()).map_err(|e| EngineError::NotAnOtpUri(e.to_string()))?;

    if url.scheme() != SCHEME {
        return Err(EngineError::NotAnOtpUri(format!(
            "expected scheme '{SCHEME}', got '{}'",
            url.scheme()
        )));
    }

    let type_token = url.host_str().unwrap_or_default();
    let is_hotp = if type_token.eq_ignore_ascii_case("totp") {
        false
    } else if type_token.eq_ignore_ascii_case("hotp") {
        true
    } else {
        return Err(EngineError::NotAnOtpUri(format!(
            "unknown OTP type '{type_token}'"
        )));
    };

    let raw_label = url.path().strip_prefix('/').unwrap_or_else(|| url.path());
    let label = percent_decode(raw_label, false)
        .map_err(|e| EngineError::MalformedUri(format!("label: {e}")))?;
    let label_issuer = label
        .split_once(':')
        .map(|(prefix, _)| prefix.trim().to_owned())
        .filter(|prefix| !prefix.is_empty());

    let query = QueryParams::parse(url.query().unwrap_or_default())?;

    let secret_text = query.get("secret").ok_or(EngineError::MissingSecret)?;
    let secret = OtpSecret::from_base32(secret_text)?;

    let algorithm = match query.get("algorithm") {
        Some(name) => HashAlgorithm::from_name(name)
            .ok_or_else(|| EngineError::UnsupportedAlgorithm(name.to_owned()))?,
        None => HashAlgorithm::default(),
    };

    let digits = match query.get("digits") {
        Some(text) => OtpDigits::new(parse_integer("digits", text)?)?,
        None => OtpDigits::default(),
    };

    let kind = if is_hotp {
        let text = query.get("counter").ok_or(EngineError::MissingCounter)?;
        let counter = text.parse::<u64>().map_err(|_| {
            EngineError::MalformedUri(format!(
                "counter: '{text}' is not a non-negative integer"
            ))
        })?;
        OtpKind::CounterBased { counter }
    } else {
        let period = match query.get("period") {
            Some(text) => parse_period(text)?,
            None => default_period(),
        };
        OtpKind::TimeBased { period }
    };

    let issuer = query.get_exact("issuer").map(str::to_owned);
    let name_hint = issuer
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .map(str::to_owned)
        .or_else(|| label_issuer.clone())
        .or_else(|| Some(label.trim().to_owned()).filter(|l| !l.is_empty()))
        .unwrap_or_else(|| default_name.to_owned());

    Ok(ParsedUri {
        issuer,
        label_issuer,
        label,
        secret,
        digits,
        algorithm,
        kind,
        name_hint,
    })
}

/// Decoded query parameters; the first occurrence of a key wins and empty
/// values count as absent. Numeric and secret values are read trimmed; the
/// issuer is read verbatim so it survives a serialize/parse cycle.
struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    fn parse(raw: &str) -> Result<Self, EngineError> {
        let mut pairs = Vec::new();
        for segment in raw.split('&').filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            let key = percent_decode(key, true)
                .map_err(|e| EngineError::MalformedUri(format!("query key: {e}")))?;
            let value = percent_decode(value, true)
                .map_err(|e| EngineError::MalformedUri(format!("parameter '{key}': {e}")))?;
            pairs.push((key, value));
        }
        Ok(Self { pairs })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.get_exact(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn get_exact(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

fn parse_integer(field: &str, text: &str) -> Result<i64, EngineError> {
    text.parse::<i64>()
        .map_err(|_| EngineError::MalformedUri(format!("{field}: '{text}' is not an integer")))
}

fn parse_period(text: &str) -> Result<NonZeroU32, EngineError> {
    let value = parse_integer("period", text)?;
    if value <= 0 {
        return Err(OtpError::InvalidPeriod(value).into());
    }
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| EngineError::MalformedUri(format!("period: {value}s is out of range")))
}

// ---------------------------------------------------------------------------
// Serialize
// ---------------------------------------------------------------------------

/// Serialize a credential back to an `otpauth://` URI.
///
/// The label is `ISSUER:NAME` when an issuer is set, otherwise `NAME`. The
/// secret is canonical Base32, HOTP always carries its current counter, and
/// `algorithm`/`digits`/`period` appear only when they differ from the
/// defaults.
#[must_use]
pub fn serialize(credential: &Credential) -> String {
    let name = encode_component(&credential.name);
    let issuer = credential.issuer.as_deref().filter(|i| !i.is_empty());

    let label = match issuer {
        Some(iss) => format!("{}:{name}", encode_component(iss)),
        None => name,
    };

    let mut params = vec![format!("secret={}", credential.secret.to_base32())];

    if let Some(iss) = issuer {
        params.push(format!("issuer={}", encode_component(iss)));
    }

    if credential.algorithm != HashAlgorithm::default() {
        params.push(format!("algorithm={}", credential.algorithm.as_str()));
    }

    if credential.digits != OtpDigits::default() {
        params.push(format!("digits={}", credential.digits.value()));
    }

    match credential.kind {
        OtpKind::TimeBased { period } if period != default_period() => {
            params.push(format!("period={period}"));
        }
        OtpKind::TimeBased { .. } => {}
        OtpKind::CounterBased { counter } => params.push(format!("counter={counter}")),
    }

    format!(
        "{SCHEME}://{}/{label}?{}",
        credential.kind.type_token(),
        params.join("&")
    )
}

// ---------------------------------------------------------------------------
// Percent-encoding helpers
// ---------------------------------------------------------------------------

fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Strict percent-decoding.
///
/// Collects raw bytes first, then validates UTF-8, so multi-byte sequences
/// (e.g. `%C3%A9`) decode correctly. `+` becomes a space only in query
/// components.
fn percent_decode(input: &str, plus_as_space: bool) -> Result<String, String> {
    let mut bytes = Vec::with_capacity(input.len());
    let mut iter = input.bytes();

    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hi = iter
                    .next()
                    .ok_or_else(|| "incomplete percent-encoding".to_owned())?;
                let lo = iter
                    .next()
                    .ok_or_else(|| "incomplete percent-encoding".to_owned())?;
                bytes.push(hex_byte(hi, lo)?);
            }
            b'+' if plus_as_space => bytes.push(b' '),
            _ => bytes.push(b),
        }
    }

    String::from_utf8(bytes).map_err(|_| "invalid UTF-8 after percent-decoding".to_owned())
}

/// Convert two hex ASCII bytes to a single byte value.
#[allow(clippy::arithmetic_side_effects)]
fn hex_byte(hi: u8, lo: u8) -> Result<u8, String> {
    let h = hex_nibble(hi)?;
    let l = hex_nibble(lo)?;
    Ok((h << 4) | l)
}

/// Convert a single hex ASCII character to its nibble value.
fn hex_nibble(b: u8) -> Result<u8, String> {
    char::from(b)
        .to_digit(16)
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| format!("invalid hex character '{}'", char::from(b)))
}
