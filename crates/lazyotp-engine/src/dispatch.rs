//! Message contracts between the background process and the page script.
//!
//! The host routes these as JSON; the engine only builds and reads them.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::store::CredentialStore;
use crate::substrate::Substrate;

/// Request sent to the page script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Type `code` into the focused text field.
    #[serde(rename = "FILL_OTP")]
    FillOtp {
        /// Generated code.
        code: String,
    },
    /// Report the `src` of every image on the page.
    #[serde(rename = "GET_IMAGE_URLS")]
    GetImageUrls,
}

/// Page script reply to [`Request::GetImageUrls`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseGetImageUrls {
    /// Image sources in document order.
    pub image_srcs: Vec<String>,
}

/// One context-menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Menu item id; the credential name.
    pub id: String,
    /// Label shown to the user; the credential name.
    pub title: String,
}

/// Context-menu items for every stored credential, in insertion order.
///
/// # Errors
///
/// Returns [`EngineError::PersistenceFailed`] if the store cannot be read.
pub fn menu_entries<S: Substrate>(store: &CredentialStore<S>) -> Result<Vec<MenuEntry>, EngineError> {
    Ok(store
        .list()?
        .into_iter()
        .map(|c| MenuEntry {
            id: c.name.clone(),
            title: c.name,
        })
        .collect())
}

/// Generate a code for `name` and wrap it for delivery to the page.
///
/// # Errors
///
/// Any error from [`CredentialStore::generate_code`], unchanged.
pub fn fill_request<S: Substrate>(
    store: &CredentialStore<S>,
    name: &str,
) -> Result<Request, EngineError> {
    let code = store.generate_code(name)?;
    Ok(Request::FillOtp { code })
}
