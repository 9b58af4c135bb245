// SPDX-License-Identifier: MIT

//! OS keychain backend (macOS Keychain, Windows Credential Manager, Secret Service)

use crate::{CredentialError, CredentialStore, Result, require_account};

pub const SERVICE_NAME: &str = "KoreaUniversityLauncher";

#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, account).map_err(|e| {
            CredentialError::Storage(format!("Failed to create keyring entry: {e}"))
        })
    }
}

impl CredentialStore for KeyringStore {
    fn save(&self, account: &str, secret: &str) -> Result<()> {
        let account = require_account(account)?;
        self.entry(account)?
            .set_password(secret)
            .map_err(|e| CredentialError::Storage(format!("Failed to store credential: {e}")))?;
        tracing::debug!(service = %self.service, %account, "Credential saved");
        Ok(())
    }

    fn load(&self, account: &str) -> Result<Option<String>> {
        let account = require_account(account)?;
        match self.entry(account)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Storage(format!(
                "Failed to retrieve credential: {e}"
            ))),
        }
    }

    fn delete(&self, account: &str) -> Result<bool> {
        let account = require_account(account)?;
        match self.entry(account)?.delete_credential() {
            Ok(()) => {
                tracing::debug!(service = %self.service, %account, "Credential deleted");
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(CredentialError::Storage(format!(
                "Failed to delete credential: {e}"
            ))),
        }
    }
}
