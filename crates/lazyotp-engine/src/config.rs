//! Engine configuration, stored as plain JSON beside the credential data.
//!
//! Every field has a default, so a missing or partial file is valid. The
//! file holds no secrets.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::uri::DEFAULT_ACCOUNT_NAME;

/// Default substrate key for the credential blob.
pub const DEFAULT_STORAGE_KEY: &str = "lazyotp_accounts";

const CONFIG_FILE: &str = "lazyotp.json";

/// Tunables for the credential store and QR import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Key under which the credential list is stored in the substrate.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Name hint when a scanned URI has neither issuer nor label.
    #[serde(default = "default_account_name")]
    pub default_account_name: String,

    /// Images narrower or shorter than this are not scanned for QR codes.
    #[serde(default = "default_min_image_side")]
    pub min_image_side: u32,

    /// Images wider or taller than this are not scanned for QR codes.
    #[serde(default = "default_max_image_side")]
    pub max_image_side: u32,

    /// Attempts at a compare-and-swap write before giving up.
    #[serde(default = "default_max_cas_attempts")]
    pub max_cas_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            default_account_name: default_account_name(),
            min_image_side: default_min_image_side(),
            max_image_side: default_max_image_side(),
            max_cas_attempts: default_max_cas_attempts(),
        }
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.into()
}
fn default_account_name() -> String {
    DEFAULT_ACCOUNT_NAME.into()
}
const fn default_min_image_side() -> u32 {
    50
}
const fn default_max_image_side() -> u32 {
    1200
}
const fn default_max_cas_attempts() -> u32 {
    5
}

impl EngineConfig {
    /// Load configuration from `{dir}/lazyotp.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or
    /// contains invalid JSON.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        fs::read_to_string(&path).map_or_else(
            |_| Self::default(),
            |contents| {
                serde_json::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), "ignoring corrupt config: {e}");
                    Self::default()
                })
            },
        )
    }

    /// Persist configuration to `{dir}/lazyotp.json`.
    ///
    /// Writes to a synced temp file in `dir` and renames it into place, so
    /// a crash never leaves a half-written file.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the directory does not exist or the
    /// file system rejects the write/rename.
    pub fn save(&self, dir: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(dir.join(CONFIG_FILE)).map_err(|e| e.error)?;

        Ok(())
    }

    /// Whether an image of this size is worth handing to the QR decoder.
    #[must_use]
    pub const fn is_scannable(&self, width: u32, height: u32) -> bool {
        width >= self.min_image_side
            && height >= self.min_image_side
            && width <= self.max_image_side
            && height <= self.max_image_side
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_values_are_correct() {
        let config = EngineConfig::default();
        assert_eq!(config.storage_key, "lazyotp_accounts");
        assert_eq!(config.default_account_name, "New Account");
        assert_eq!(config.min_image_side, 50);
        assert_eq!(config.max_image_side, 1200);
        assert_eq!(config.max_cas_attempts, 5);
    }

    #[test]
    fn load_returns_default_on_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(EngineConfig::load(dir.path()), EngineConfig::default());
    }

    #[test]
    fn load_returns_default_on_corrupt_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(EngineConfig::load(dir.path()), EngineConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), r#"{"storageKey":"work"}"#).unwrap();
        let config = EngineConfig::load(dir.path());
        assert_eq!(config.storage_key, "work");
        assert_eq!(config.max_image_side, 1200);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig {
            default_account_name: "Scanned".into(),
            max_cas_attempts: 9,
            ..EngineConfig::default()
        };
        config.save(dir.path()).unwrap();
        assert_eq!(EngineConfig::load(dir.path()), config);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn scannable_bounds_are_inclusive() {
        let config = EngineConfig::default();
        assert!(config.is_scannable(50, 1200));
        assert!(!config.is_scannable(49, 300));
        assert!(!config.is_scannable(300, 1201));
    }
}
