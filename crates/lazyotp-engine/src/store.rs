//! Credential store: the ordered credential list over a [`Substrate`].
//!
//! Every mutation is a full read-modify-write of the serialized list. A
//! store-wide mutex serializes these cycles within the process. Across
//! processes, substrates with compare-and-swap detect a concurrent writer
//! and the cycle is retried on a fresh read; substrates without it fall
//! back to a plain write and leave a narrow window in which two processes
//! can advance an HOTP counter from the same value.

use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazyotp_core::OtpSecret;

use crate::config::EngineConfig;
use crate::credential::{Credential, OtpKind};
use crate::db::SqliteSubstrate;
use crate::error::EngineError;
use crate::substrate::{CasOutcome, JsonFileSubstrate, Substrate, SubstrateError};
use crate::uri;

/// Ordered, name-unique collection of credentials.
#[derive(Debug)]
pub struct CredentialStore<S: Substrate> {
    substrate: S,
    config: EngineConfig,
    lock: Mutex<()>,
}

impl CredentialStore<JsonFileSubstrate> {
    /// Store backed by `{dir}/{storageKey}.json`.
    #[must_use]
    pub fn open_json(dir: &Path, config: EngineConfig) -> Self {
        let substrate = JsonFileSubstrate::new(dir, &config.storage_key);
        Self::new(substrate, config)
    }
}

impl CredentialStore<SqliteSubstrate> {
    /// Store backed by the `SQLite` database at `path`, row `storageKey`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PersistenceFailed`] if the database cannot be
    /// opened or migrated.
    pub fn open_sqlite(path: &Path, config: EngineConfig) -> Result<Self, EngineError> {
        let substrate =
            SqliteSubstrate::open(path, &config.storage_key).map_err(persistence_failed)?;
        Ok(Self::new(substrate, config))
    }
}

impl<S: Substrate> CredentialStore<S> {
    /// Wrap a substrate. Nothing is read until the first operation.
    pub const fn new(substrate: S, config: EngineConfig) -> Self {
        Self {
            substrate,
            config,
            lock: Mutex::new(()),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying substrate.
    #[must_use]
    pub const fn substrate(&self) -> &S {
        &self.substrate
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All credentials in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PersistenceFailed`] if the substrate cannot be
    /// read or holds a corrupt list.
    pub fn list(&self) -> Result<Vec<Credential>, EngineError> {
        let raw = self.read_raw()?;
        let list = decode(raw.as_deref())?;
        tracing::debug!(count = list.len(), "listed credentials");
        Ok(list)
    }

    /// The credential named `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if absent, [`EngineError::PersistenceFailed`]
    /// on substrate failure.
    pub fn get(&self, name: &str) -> Result<Credential, EngineError> {
        self.list()?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| EngineError::NotFound(name.to_owned()))
    }

    /// Whether a credential named `name` exists.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PersistenceFailed`] on substrate failure.
    pub fn contains(&self, name: &str) -> Result<bool, EngineError> {
        Ok(self.list()?.iter().any(|c| c.name == name))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a credential.
    ///
    /// An empty or blank issuer is stored as absent.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidName`] for a blank name.
    /// - [`EngineError::DuplicateName`] if the name is taken.
    /// - [`EngineError::PersistenceFailed`] if the write fails; the stored
    ///   list is unchanged.
    pub fn insert(&self, mut credential: Credential) -> Result<(), EngineError> {
        credential.validate()?;
        if credential
            .issuer
            .as_deref()
            .is_some_and(|issuer| issuer.trim().is_empty())
        {
            credential.issuer = None;
        }

        self.modify(|list| {
            if list.iter().any(|c| c.name == credential.name) {
                return Err(EngineError::DuplicateName(credential.name.clone()));
            }
            list.push(credential.clone());
            Ok(())
        })?;

        tracing::info!(name = %credential.name, kind = credential.kind.type_token(), "credential added");
        Ok(())
    }

    /// Parse `uri` and insert it under `name`.
    ///
    /// # Errors
    ///
    /// Any parse error from [`uri::parse`], plus the errors of [`insert`](Self::insert).
    pub fn add_from_uri(&self, name: &str, uri: &str) -> Result<(), EngineError> {
        let parsed = uri::parse_with_default(uri, &self.config.default_account_name)?;
        self.insert(parsed.into_credential(name))
    }

    /// Insert a TOTP credential from a hand-typed Base32 secret.
    ///
    /// Whitespace and case in `secret_text` are ignored. The credential gets
    /// the defaults: SHA1, 6 digits, 30 second period.
    ///
    /// # Errors
    ///
    /// [`EngineError::Otp`] for an invalid or empty secret, plus the errors
    /// of [`insert`](Self::insert).
    pub fn add_manual(&self, name: &str, secret_text: &str) -> Result<(), EngineError> {
        let secret = OtpSecret::from_base32(secret_text)?;
        self.insert(Credential::totp(name, secret))
    }

    /// Remove the credential named `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if absent, [`EngineError::PersistenceFailed`]
    /// if the write fails.
    pub fn delete(&self, name: &str) -> Result<(), EngineError> {
        self.modify(|list| {
            let idx = list
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| EngineError::NotFound(name.to_owned()))?;
            list.remove(idx);
            Ok(())
        })?;

        tracing::info!(name = %name, "credential deleted");
        Ok(())
    }

    /// Remove `name` if present. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PersistenceFailed`] on substrate failure.
    pub fn delete_if_present(&self, name: &str) -> Result<bool, EngineError> {
        match self.delete(name) {
            Ok(()) => Ok(true),
            Err(EngineError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // Code generation
    // -----------------------------------------------------------------------

    /// Code for `name` at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// See [`generate_code_at`](Self::generate_code_at).
    pub fn generate_code(&self, name: &str) -> Result<String, EngineError> {
        self.generate_code_at(name, unix_now())
    }

    /// Code for `name`, with TOTP evaluated at `unix_time`.
    ///
    /// TOTP credentials are read without locking and nothing is written.
    /// HOTP credentials use the stored counter and persist `counter + 1`;
    /// the code is returned only once that write has succeeded.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if absent.
    /// - [`EngineError::CounterExhausted`] if the counter is at `u64::MAX`.
    /// - [`EngineError::PersistenceFailed`] if the counter could not be
    ///   persisted; the stored counter is unchanged.
    pub fn generate_code_at(&self, name: &str, unix_time: i64) -> Result<String, EngineError> {
        let credential = self.get(name)?;
        if !credential.is_counter_based() {
            return credential.code_at(unix_time);
        }

        let (code, next) = self.modify(|list| {
            let stored = list
                .iter_mut()
                .find(|c| c.name == name)
                .ok_or_else(|| EngineError::NotFound(name.to_owned()))?;

            let OtpKind::CounterBased { counter } = stored.kind else {
                // Replaced by a time-based credential since the first read.
                return Ok((stored.code_at(unix_time)?, None));
            };

            let next = counter
                .checked_add(1)
                .ok_or_else(|| EngineError::CounterExhausted(name.to_owned()))?;
            let code = stored.code_at(unix_time)?;
            stored.kind = OtpKind::CounterBased { counter: next };
            Ok((code, Some(next)))
        })?;

        if let Some(counter) = next {
            tracing::info!(name = %name, counter, "counter advanced");
        }
        Ok(code)
    }

    /// The stored credential as an `otpauth://` URI, with its current counter.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if absent, [`EngineError::PersistenceFailed`]
    /// on substrate failure.
    pub fn export_uri(&self, name: &str) -> Result<String, EngineError> {
        Ok(uri::serialize(&self.get(name)?))
    }

    // -----------------------------------------------------------------------
    // Read-modify-write
    // -----------------------------------------------------------------------

    fn read_raw(&self) -> Result<Option<String>, EngineError> {
        self.substrate.read().map_err(persistence_failed)
    }

    /// Run `op` on a fresh copy of the list and persist the result.
    ///
    /// `op` may run more than once when a compare-and-swap conflicts; an
    /// `Err` from `op` aborts without writing.
    fn modify<T>(
        &self,
        mut op: impl FnMut(&mut Vec<Credential>) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| EngineError::PersistenceFailed("store lock poisoned".into()))?;

        let attempts = self.config.max_cas_attempts.max(1);
        for attempt in 1..=attempts {
            let raw = self.read_raw()?;
            let mut list = decode(raw.as_deref())?;
            let out = op(&mut list)?;
            let encoded = encode(&list)?;

            match self
                .substrate
                .compare_and_swap(raw.as_deref(), &encoded)
                .map_err(persistence_failed)?
            {
                CasOutcome::Swapped => return Ok(out),
                CasOutcome::Unsupported => {
                    self.substrate
                        .write(&encoded)
                        .map_err(persistence_failed)?;
                    return Ok(out);
                }
                CasOutcome::Conflict => {
                    tracing::warn!(attempt, "concurrent write detected, retrying");
                }
            }
        }

        Err(EngineError::PersistenceFailed(format!(
            "gave up after {attempts} conflicting writes"
        )))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn persistence_failed(e: SubstrateError) -> EngineError {
    tracing::warn!("substrate failure: {e}");
    EngineError::PersistenceFailed(e.to_string())
}

fn decode(raw: Option<&str>) -> Result<Vec<Credential>, EngineError> {
    let Some(text) = raw else {
        return Ok(Vec::new());
    };
    // Only the position is reported: serde messages can quote field values.
    serde_json::from_str(text).map_err(|e| {
        EngineError::PersistenceFailed(format!(
            "stored credential list is corrupt (line {}, column {})",
            e.line(),
            e.column()
        ))
    })
}

fn encode(list: &[Credential]) -> Result<String, EngineError> {
    serde_json::to_string(list)
        .map_err(|e| EngineError::PersistenceFailed(format!("cannot serialize credentials: {e}")))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::MemorySubstrate;

    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn store() -> CredentialStore<MemorySubstrate> {
        CredentialStore::new(MemorySubstrate::new(), EngineConfig::default())
    }

    fn secret() -> OtpSecret {
        OtpSecret::from_base32(RFC_SECRET).unwrap()
    }

    #[test]
    fn empty_substrate_lists_nothing() {
        assert!(store().list().unwrap().is_empty());
    }

    #[test]
    fn list_keeps_insertion_order() {
        let s = store();
        for name in ["c", "a", "b"] {
            s.insert(Credential::totp(name, secret())).unwrap();
        }
        let names: Vec<_> = s.list().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn blank_issuer_is_dropped() {
        let s = store();
        let mut cred = Credential::totp("a", secret());
        cred.issuer = Some("  ".into());
        s.insert(cred).unwrap();
        assert_eq!(s.get("a").unwrap().issuer, None);
    }

    #[test]
    fn names_are_case_sensitive() {
        let s = store();
        s.insert(Credential::totp("Mail", secret())).unwrap();
        s.insert(Credential::totp("mail", secret())).unwrap();
        assert_eq!(s.list().unwrap().len(), 2);
    }

    #[test]
    fn hotp_advances_from_stored_counter() {
        let s = store();
        s.insert(Credential::hotp("bank", secret(), 0)).unwrap();
        assert_eq!(s.generate_code("bank").unwrap(), "755224");
        assert_eq!(s.generate_code("bank").unwrap(), "287082");
        assert_eq!(s.get("bank").unwrap().counter(), Some(2));
    }

    #[test]
    fn totp_generation_does_not_write() {
        let mem = MemorySubstrate::new();
        let s = CredentialStore::new(mem.clone(), EngineConfig::default());
        s.insert(Credential::totp("t", secret())).unwrap();
        let before = mem.read().unwrap();
        s.generate_code_at("t", 59).unwrap();
        assert_eq!(mem.read().unwrap(), before);
    }

    #[test]
    fn counter_at_max_is_exhausted() {
        let s = store();
        s.insert(Credential::hotp("max", secret(), u64::MAX)).unwrap();
        assert_eq!(
            s.generate_code("max"),
            Err(EngineError::CounterExhausted("max".into()))
        );
        assert_eq!(s.get("max").unwrap().counter(), Some(u64::MAX));
    }

    #[test]
    fn corrupt_blob_is_persistence_failure() {
        let s = CredentialStore::new(
            MemorySubstrate::with_value(r#"[{"name":"x","secret":"SECRETVALUE1"#),
            EngineConfig::default(),
        );
        let err = s.list().unwrap_err();
        assert!(matches!(err, EngineError::PersistenceFailed(_)));
        assert!(!err.to_string().contains("SECRETVALUE1"));
    }

    #[test]
    fn add_manual_normalizes_secret() {
        let s = store();
        s.add_manual("typed", " gezd gnbv gy3t qojq gezd gnbv gy3t qojq ")
            .unwrap();
        let cred = s.get("typed").unwrap();
        assert_eq!(cred.secret.to_base32(), RFC_SECRET);
        assert_eq!(cred.period().map(std::num::NonZeroU32::get), Some(30));
    }

    #[test]
    fn add_manual_rejects_bad_secret() {
        let s = store();
        assert!(matches!(
            s.add_manual("typed", "not base32!"),
            Err(EngineError::Otp(_))
        ));
        assert!(s.list().unwrap().is_empty());
    }

    #[test]
    fn export_reflects_advanced_counter() {
        let s = store();
        s.add_from_uri("bank", &format!("otpauth://hotp/Bank?secret={RFC_SECRET}&counter=3"))
            .unwrap();
        s.generate_code("bank").unwrap();
        let exported = s.export_uri("bank").unwrap();
        assert!(exported.contains("counter=4"));
    }

    #[test]
    fn delete_if_present_is_idempotent() {
        let s = store();
        s.insert(Credential::totp("a", secret())).unwrap();
        assert!(s.delete_if_present("a").unwrap());
        assert!(!s.delete_if_present("a").unwrap());
        assert!(!s.contains("a").unwrap());
    }
}
