//! QR import: pick the first OTP URI out of a page's decoded images.
//!
//! Decoding pixels is the host's job. This module receives the decoder's
//! output in page order and stops at the first candidate that parses.
//! Candidates that fail to parse are expected noise (logos, unrelated QR
//! codes) and are not reported individually.

use crate::config::EngineConfig;
use crate::credential::Credential;
use crate::uri::{self, ParsedUri, DEFAULT_ACCOUNT_NAME};

/// One page image after the external QR decoder has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImage {
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
    /// Text of the QR code, if the decoder found one.
    pub decoded: Option<String>,
}

/// The winning candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSuggestion {
    /// Position of the candidate in the input sequence.
    pub index: usize,
    /// The parsed URI.
    pub parsed: ParsedUri,
}

impl ImportSuggestion {
    /// Name to prefill in the "add account" form.
    #[must_use]
    pub fn suggested_name(&self) -> &str {
        &self.parsed.name_hint
    }

    /// Finalize as a credential named after the hint.
    #[must_use]
    pub fn into_credential(self) -> Credential {
        self.parsed.into_hinted_credential()
    }
}

/// First candidate that parses as an `otpauth://` URI, or `None`.
pub fn resolve_candidates<I, T>(candidates: I) -> Option<ImportSuggestion>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    resolve_with(candidates, DEFAULT_ACCOUNT_NAME)
}

/// [`resolve_candidates`] with a caller-chosen fallback name hint.
pub fn resolve_with<I, T>(candidates: I, default_name: &str) -> Option<ImportSuggestion>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    first_match(candidates.into_iter().enumerate(), default_name)
}

/// Apply the image size filter, then resolve the decoded strings in page
/// order. `index` in the result refers to `images`.
pub fn resolve_images(images: &[ScannedImage], config: &EngineConfig) -> Option<ImportSuggestion> {
    let scannable = images.iter().enumerate().filter_map(|(index, image)| {
        if !config.is_scannable(image.width, image.height) {
            return None;
        }
        image.decoded.as_deref().map(|text| (index, text))
    });
    first_match(scannable, &config.default_account_name)
}

/// First `(index, text)` pair whose text parses; `index` is passed through.
fn first_match<I, T>(candidates: I, default_name: &str) -> Option<ImportSuggestion>
where
    I: IntoIterator<Item = (usize, T)>,
    T: AsRef<str>,
{
    let mut tried = 0_usize;
    for (index, candidate) in candidates {
        tried = tried.saturating_add(1);
        if let Ok(parsed) = uri::parse_with_default(candidate.as_ref(), default_name) {
            tracing::debug!(candidates = tried, index, "otpauth URI found");
            return Some(ImportSuggestion { index, parsed });
        }
    }
    tracing::debug!(candidates = tried, "no candidate is an otpauth URI");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "otpauth://totp/Foo?secret=JBSWY3DPEHPK3PXP";

    fn image(side: u32, decoded: Option<&str>) -> ScannedImage {
        ScannedImage {
            width: side,
            height: side,
            decoded: decoded.map(str::to_owned),
        }
    }

    #[test]
    fn first_valid_candidate_wins() {
        let hit = resolve_candidates([
            "not a uri",
            URI,
            "otpauth://totp/Bar?secret=JBSWY3DPEHPK3PXP",
        ])
        .unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.suggested_name(), "Foo");
    }

    #[test]
    fn no_candidates_is_none() {
        assert!(resolve_candidates(Vec::<String>::new()).is_none());
        assert!(resolve_candidates(["https://example.com", "otpauth://totp/x"]).is_none());
    }

    #[test]
    fn fallback_name_applies_to_unlabeled_uri() {
        let hit = resolve_with(["otpauth://totp/?secret=JBSWY3DPEHPK3PXP"], "Scanned").unwrap();
        assert_eq!(hit.suggested_name(), "Scanned");
        assert_eq!(hit.into_credential().name, "Scanned");
    }

    #[test]
    fn images_outside_bounds_are_skipped() {
        let config = EngineConfig::default();
        let images = [
            image(20, Some(URI)),
            image(2000, Some(URI)),
            image(300, None),
            image(300, Some("otpauth://hotp/Late?secret=JBSWY3DPEHPK3PXP&counter=0")),
        ];
        let hit = resolve_images(&images, &config).unwrap();
        assert_eq!(hit.index, 3);
        assert_eq!(hit.suggested_name(), "Late");
    }

    #[test]
    fn image_resolution_uses_configured_fallback_name() {
        let config = EngineConfig {
            default_account_name: "From page".into(),
            ..EngineConfig::default()
        };
        let images = [
            image(300, Some("not a uri")),
            image(300, Some("otpauth://totp/?secret=JBSWY3DPEHPK3PXP")),
        ];
        let hit = resolve_images(&images, &config).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.suggested_name(), "From page");
        assert_eq!(
            resolve_with(images.iter().filter_map(|i| i.decoded.as_deref()), "From page"),
            Some(hit)
        );
    }

    #[test]
    fn image_filter_uses_config_bounds() {
        let config = EngineConfig {
            min_image_side: 10,
            ..EngineConfig::default()
        };
        let hit = resolve_images(&[image(20, Some(URI))], &config).unwrap();
        assert_eq!(hit.index, 0);
    }
}
