//! `lazyotp-engine`: OTP credential engine for lazyotp.
//!
//! Credential model, `otpauth://` URI grammar, the persisted credential
//! store with its substrates, QR import and the page messaging contracts.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod config;
pub mod credential;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod import;
pub mod store;
pub mod substrate;
pub mod uri;

pub use config::EngineConfig;
pub use credential::{Credential, OtpKind};
pub use db::SqliteSubstrate;
pub use dispatch::{fill_request, menu_entries, MenuEntry, Request, ResponseGetImageUrls};
pub use error::EngineError;
pub use import::{resolve_candidates, resolve_images, ImportSuggestion, ScannedImage};
pub use store::CredentialStore;
pub use substrate::{CasOutcome, JsonFileSubstrate, MemorySubstrate, Substrate, SubstrateError};
pub use uri::ParsedUri;
