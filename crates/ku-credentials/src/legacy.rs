// SPDX-License-Identifier: MIT

//! Import of a login saved by the older KUPID desktop app
//!
//! KUPID kept `{"username": ..., "password": ...}` in plain JSON inside its
//! app-data folder. The first candidate file holding a usable pair wins.

use crate::{CredentialStore, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const LEGACY_APP_DIR: &str = "KUPID";
const LEGACY_CONFIG_FILE: &str = "config.json";

/// Login found in a legacy config file
#[derive(Clone, PartialEq, Eq)]
pub struct LegacyCredentials {
    pub account: String,
    pub password: String,
}

impl std::fmt::Debug for LegacyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyCredentials")
            .field("account", &self.account)
            .field("password", &"[HIDDEN]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct LegacyConfig {
    #[serde(default)]
    username: Option<serde_json::Value>,
    #[serde(default)]
    password: Option<serde_json::Value>,
}

/// Where KUPID may have left its config, relative to the user's home directory
pub fn candidate_paths(home: &Path) -> Vec<PathBuf> {
    vec![
        home.join("Library")
            .join("Application Support")
            .join(LEGACY_APP_DIR)
            .join(LEGACY_CONFIG_FILE),
        home.join("AppData")
            .join("Roaming")
            .join(LEGACY_APP_DIR)
            .join(LEGACY_CONFIG_FILE),
        home.join(".config")
            .join(LEGACY_APP_DIR)
            .join(LEGACY_CONFIG_FILE),
    ]
}

fn read_candidate(path: &Path) -> Option<LegacyCredentials> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable legacy config");
            return None;
        }
    };

    let config: LegacyConfig = match serde_json::from_str(&raw) {
        Ok(config) => config,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Skipping malformed legacy config");
            return None;
        }
    };

    let account = match config.username {
        Some(serde_json::Value::String(s)) => s.trim().to_owned(),
        _ => String::new(),
    };
    let password = match config.password {
        Some(serde_json::Value::String(s)) => s,
        _ => String::new(),
    };

    (!account.is_empty() && !password.is_empty()).then_some(LegacyCredentials { account, password })
}

/// First candidate holding a non-empty username and password
pub fn find_legacy_credentials(paths: &[PathBuf]) -> Option<LegacyCredentials> {
    let found = paths.iter().find_map(|p| {
        read_candidate(p).inspect(|c| {
            tracing::info!(path = %p.display(), account = %c.account, "Found legacy login");
        })
    });
    if found.is_none() {
        tracing::debug!(candidates = paths.len(), "No legacy login found");
    }
    found
}

/// Copy a legacy login into `store`. Returns the imported account, if any.
pub fn migrate(store: &dyn CredentialStore, paths: &[PathBuf]) -> Result<Option<String>> {
    let Some(creds) = find_legacy_credentials(paths) else {
        return Ok(None);
    };
    store.save(&creds.account, &creds.password)?;
    tracing::info!(account = %creds.account, "Legacy login migrated");
    Ok(Some(creds.account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_candidate_paths_cover_all_platforms() {
        let paths = candidate_paths(Path::new("/home/student"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/home/student/Library/Application Support/KUPID/config.json"),
                PathBuf::from("/home/student/AppData/Roaming/KUPID/config.json"),
                PathBuf::from("/home/student/.config/KUPID/config.json"),
            ]
        );
    }

    #[test]
    fn test_first_valid_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let broken = write(&dir, "broken.json", "{ nope");
        let blank = write(&dir, "blank.json", r#"{"username": "   ", "password": "pw"}"#);
        let wrong_type = write(&dir, "wrong.json", r#"{"username": 2024, "password": "pw"}"#);
        let good = write(
            &dir,
            "good.json",
            r#"{"username": " 2024123456 ", "password": "hunter2", "theme": "dark"}"#,
        );
        let later = write(&dir, "later.json", r#"{"username": "other", "password": "pw"}"#);

        let found =
            find_legacy_credentials(&[missing, broken, blank, wrong_type, good, later]).unwrap();
        assert_eq!(found.account, "2024123456");
        assert_eq!(found.password, "hunter2");
    }

    #[test]
    fn test_password_required() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", r#"{"username": "student", "password": ""}"#);
        assert!(find_legacy_credentials(&[path]).is_none());
    }

    #[test]
    fn test_migrate_saves_into_store() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"username": "student", "password": "pw"}"#,
        );
        let store = MemoryStore::new();

        let account = migrate(&store, &[path]).unwrap();

        assert_eq!(account.as_deref(), Some("student"));
        assert_eq!(store.load("student").unwrap().as_deref(), Some("pw"));
    }

    #[test]
    fn test_migrate_without_candidates() {
        let store = MemoryStore::new();
        assert!(migrate(&store, &[]).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = LegacyCredentials {
            account: "student".to_owned(),
            password: "hunter2".to_owned(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
