//! Persistence substrates: where the serialized credential list lives.
//!
//! The store sees a single opaque text blob per storage key. A substrate
//! may additionally offer an atomic compare-and-swap; the store uses it to
//! close cross-process counter races when available.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Failure reported by a substrate.
#[derive(Debug, Error)]
pub enum SubstrateError {
    /// File-system failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Database failure.
    #[error("database error: {0}")]
    Database(String),

    /// The substrate is in an unusable state (poisoned lock, closed handle).
    #[error("substrate unavailable: {0}")]
    Unavailable(String),
}

impl<T> From<PoisonError<T>> for SubstrateError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Unavailable("lock poisoned".into())
    }
}

/// Result of [`Substrate::compare_and_swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored value matched `expected` and was replaced.
    Swapped,
    /// The stored value changed since it was read; nothing was written.
    Conflict,
    /// The substrate has no atomic compare-and-swap.
    Unsupported,
}

/// Key-value backing store holding one serialized blob.
pub trait Substrate: Send + Sync {
    /// Current blob, or `None` if nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError`] if the backing store cannot be read.
    fn read(&self) -> Result<Option<String>, SubstrateError>;

    /// Replace the blob. Either the whole value is stored or the previous
    /// value remains.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError`] if the backing store cannot be written.
    fn write(&self, value: &str) -> Result<(), SubstrateError>;

    /// Replace the blob only if it still equals `expected`.
    ///
    /// The default reports [`CasOutcome::Unsupported`] without writing.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError`] if the backing store cannot be accessed.
    fn compare_and_swap(
        &self,
        expected: Option<&str>,
        value: &str,
    ) -> Result<CasOutcome, SubstrateError> {
        let _ = (expected, value);
        Ok(CasOutcome::Unsupported)
    }
}

impl<S: Substrate + ?Sized> Substrate for Arc<S> {
    fn read(&self) -> Result<Option<String>, SubstrateError> {
        (**self).read()
    }

    fn write(&self, value: &str) -> Result<(), SubstrateError> {
        (**self).write(value)
    }

    fn compare_and_swap(
        &self,
        expected: Option<&str>,
        value: &str,
    ) -> Result<CasOutcome, SubstrateError> {
        (**self).compare_and_swap(expected, value)
    }
}

// ---------------------------------------------------------------------------
// MemorySubstrate
// ---------------------------------------------------------------------------

/// In-memory blob. Clones share the same cell, so two stores built from
/// clones behave like two surfaces over one storage area.
#[derive(Debug, Clone, Default)]
pub struct MemorySubstrate {
    cell: Arc<Mutex<Option<String>>>,
}

impl MemorySubstrate {
    /// Empty substrate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Substrate pre-seeded with `value`.
    #[must_use]
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Some(value.into()))),
        }
    }
}

impl Substrate for MemorySubstrate {
    fn read(&self) -> Result<Option<String>, SubstrateError> {
        Ok(self.cell.lock()?.clone())
    }

    fn write(&self, value: &str) -> Result<(), SubstrateError> {
        *self.cell.lock()? = Some(value.to_owned());
        Ok(())
    }

    fn compare_and_swap(
        &self,
        expected: Option<&str>,
        value: &str,
    ) -> Result<CasOutcome, SubstrateError> {
        let mut guard = self.cell.lock()?;
        if guard.as_deref() != expected {
            return Ok(CasOutcome::Conflict);
        }
        *guard = Some(value.to_owned());
        Ok(CasOutcome::Swapped)
    }
}

// ---------------------------------------------------------------------------
// JsonFileSubstrate
// ---------------------------------------------------------------------------

/// One JSON file per storage key: `{dir}/{key}.json`.
///
/// Each write goes to its own synced temp file in the same directory, which
/// is then renamed over the target, so concurrent writers never publish a
/// partial or foreign value. There is no compare-and-swap, so two processes
/// advancing the same counter can both read the old value.
#[derive(Debug, Clone)]
pub struct JsonFileSubstrate {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonFileSubstrate {
    /// Substrate for `key` inside `dir`. The directory is not created.
    #[must_use]
    pub fn new(dir: &Path, key: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            path: dir.join(format!("{key}.json")),
        }
    }

    /// File backing this substrate.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Substrate for JsonFileSubstrate {
    fn read(&self) -> Result<Option<String>, SubstrateError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, value: &str) -> Result<(), SubstrateError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
