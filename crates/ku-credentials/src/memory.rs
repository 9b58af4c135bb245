// SPDX-License-Identifier: MIT

//! Process-local store for tests and headless runs

use crate::{CredentialStore, Result, require_account};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, account: &str, secret: &str) -> Result<()> {
        let account = require_account(account)?;
        self.entries
            .lock()
            .insert(account.to_owned(), secret.to_owned());
        Ok(())
    }

    fn load(&self, account: &str) -> Result<Option<String>> {
        let account = require_account(account)?;
        Ok(self.entries.lock().get(account).cloned())
    }

    fn delete(&self, account: &str) -> Result<bool> {
        let account = require_account(account)?;
        Ok(self.entries.lock().remove(account).is_some())
    }
}
