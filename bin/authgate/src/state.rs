//! Persistence of the virtual backend between CLI runs.

use authgate::MemoryState;
use authgate_core::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::StateError;

/// On-disk snapshot of the identity store and hint store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub identity: MemoryState,
    #[serde(default)]
    pub hints: BTreeMap<String, String>,
    /// When the file was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl StateFile {
    /// Reads a state file. A missing file is an empty state.
    ///
    /// # Errors
    ///
    /// Returns `Read` if the file exists but cannot be read, or `Parse` if
    /// its contents are not a state file.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file, starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(StateError::Read {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let state: Self = serde_json::from_str(&contents).map_err(|e| StateError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(
            path = %path.display(),
            accounts = state.identity.accounts.len(),
            saved_at = ?state.saved_at,
            "loaded state"
        );
        Ok(state)
    }

    /// Writes the state file, stamping `saved_at` and creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `Write` if the file or its directory cannot be written.
    pub fn save(mut self, path: &Path) -> Result<(), StateError> {
        let write_err = |reason: String| StateError::Write {
            path: path.to_path_buf(),
            reason,
        };

        self.saved_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(&self).map_err(|e| write_err(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        std::fs::write(path, json).map_err(|e| write_err(e.to_string()))?;
        debug!(path = %path.display(), "saved state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate::Account;

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StateFile::load(&dir.path().join("state.json")).expect("load");
        assert_eq!(state, StateFile::default());
    }

    #[test]
    fn save_then_load_keeps_accounts_and_hints() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");

        let mut state = StateFile::default();
        state.identity.accounts.insert(
            "uid_1".to_string(),
            Account {
                user_id: "uid_1".to_string(),
                email: None,
                is_anonymous: true,
                linked: Vec::new(),
            },
        );
        state.identity.current = Some("uid_1".to_string());
        state
            .hints
            .insert("AUTHGATE_LATEST_PROVIDER_ID".to_string(), "google.com".to_string());
        state.clone().save(&path).expect("save");

        let loaded = StateFile::load(&path).expect("load");
        assert!(loaded.saved_at.is_some());
        assert_eq!(loaded.identity, state.identity);
        assert_eq!(loaded.hints, state.hints);
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").expect("write");

        let err = StateFile::load(&path).unwrap_err();
        assert!(matches!(err.current_context(), StateError::Parse { .. }));
    }
}
