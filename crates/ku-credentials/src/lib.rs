// SPDX-License-Identifier: MIT

//! Portal login storage for the KU Launcher
//!
//! Passwords live in the OS keychain under the `KoreaUniversityLauncher`
//! service, one entry per portal account. [`legacy`] imports a login left
//! behind by the older KUPID desktop app.

pub mod keychain;
pub mod legacy;
pub mod memory;

pub use keychain::{KeyringStore, SERVICE_NAME};
pub use legacy::{LegacyCredentials, candidate_paths, find_legacy_credentials, migrate};
pub use memory::MemoryStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("account name is required")]
    InvalidAccount,

    #[error("credential storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Secret storage keyed by account name
pub trait CredentialStore: Send + Sync {
    fn save(&self, account: &str, secret: &str) -> Result<()>;

    /// `None` when nothing is stored for `account`
    fn load(&self, account: &str) -> Result<Option<String>>;

    /// Returns whether an entry existed
    fn delete(&self, account: &str) -> Result<bool>;
}

pub(crate) fn require_account(account: &str) -> Result<&str> {
    let account = account.trim();
    if account.is_empty() {
        return Err(CredentialError::InvalidAccount);
    }
    Ok(account)
}
