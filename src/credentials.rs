//! Persisted bridge credentials.
//!
//! The store is a single JSON file mapping a bridge address to the username
//! the bridge issued during pairing:
//!
//! ```json
//! {"192.168.1.10": {"username": "<token>"}}
//! ```
//!
//! Only the most recently registered bridge survives a save; the whole file
//! is rewritten every time.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// File name used for the default credential location.
pub const CONFIG_FILE_NAME: &str = ".python_hue";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CredentialRecord {
    username: String,
}

/// A credential read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub address: String,
    pub username: String,
}

/// Result of [`CredentialStore::load`].
///
/// A missing file, an unreadable file, malformed JSON and an unknown address
/// all produce [`LoadOutcome::NotFound`]; callers react to each the same way,
/// by registering again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Found(StoredCredential),
    NotFound,
}

/// JSON file holding the bridge address and username.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    log_target: String,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialStore {
            path: path.into(),
            log_target: module_path!().to_string(),
        }
    }

    /// Send this store's log records to `log_target`.
    pub fn with_log_target(mut self, log_target: &str) -> Self {
        self.log_target = log_target.to_string();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the credential for `address`, or the first stored bridge when
    /// no address is given.
    pub fn load(&self, address: Option<&str>) -> LoadOutcome {
        let records = match self.read() {
            Some(records) => records,
            None => return LoadOutcome::NotFound,
        };

        let found = match address {
            Some(address) => records
                .get(address)
                .map(|record| (address.to_string(), record)),
            None => records
                .iter()
                .next()
                .map(|(address, record)| (address.clone(), record)),
        };

        match found {
            Some((address, record)) => LoadOutcome::Found(StoredCredential {
                address,
                username: record.username.clone(),
            }),
            None => {
                debug!(
                    target: self.log_target.as_str(),
                    "no credential for {:?} in {}", address, self.path.display()
                );
                LoadOutcome::NotFound
            }
        }
    }

    /// Overwrite the store with a single record for `address`.
    pub fn save(&self, address: &str, username: &str) -> Result<()> {
        let records = BTreeMap::from([(
            address.to_string(),
            CredentialRecord {
                username: username.to_string(),
            },
        )]);
        let contents = serde_json::to_string(&records).map_err(Error::JsonDump)?;

        info!(
            target: self.log_target.as_str(),
            "Writing configuration file to {}", self.path.display()
        );
        fs::write(&self.path, contents).map_err(|err| Error::CredentialWrite {
            path: self.path.clone(),
            err,
        })
    }

    fn read(&self) -> Option<BTreeMap<String, CredentialRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(target: self.log_target.as_str(), "cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(records) => Some(records),
            Err(e) => {
                debug!(
                    target: self.log_target.as_str(),
                    "malformed credential file {}: {}", self.path.display(), e
                );
                None
            }
        }
    }
}

/// Default credential file location.
///
/// Uses the user's home directory when it exists and is writable, otherwise
/// the current working directory.
pub fn default_config_path() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    config_path_in(dirs::home_dir().as_deref(), &cwd)
}

fn config_path_in(home: Option<&Path>, fallback: &Path) -> PathBuf {
    match home {
        Some(home) if is_writable_dir(home) => home.join(CONFIG_FILE_NAME),
        _ => fallback.join(CONFIG_FILE_NAME),
    }
}

/// Whether this process can create files in `dir`.
///
/// Permission bits alone do not say who may write, so a scratch file is
/// created and removed again.
fn is_writable_dir(dir: &Path) -> bool {
    let scratch = dir.join(format!(".hue_write_check_{}", process::id()));
    match OpenOptions::new().write(true).create_new(true).open(&scratch) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&scratch) {
                debug!("cannot remove {}: {}", scratch.display(), e);
            }
            true
        }
        Err(e) => {
            debug!("{} is not writable: {}", dir.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{capture_logs, captured_logs};

    fn store_in(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join(CONFIG_FILE_NAME))
    }

    #[test]
    fn test_save_writes_single_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("10.0.0.0", "fooo").unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, r#"{"10.0.0.0":{"username":"fooo"}}"#);
    }

    #[test]
    fn test_save_overwrites_previous_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("10.0.0.1", "first").unwrap();
        store.save("10.0.0.2", "second").unwrap();

        assert_eq!(store.load(Some("10.0.0.1")), LoadOutcome::NotFound);
        assert_eq!(
            store.load(Some("10.0.0.2")),
            LoadOutcome::Found(StoredCredential {
                address: "10.0.0.2".to_string(),
                username: "second".to_string(),
            })
        );
    }

    #[test]
    fn test_load_without_address_uses_stored_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("10.0.0.0", "fooo").unwrap();

        let LoadOutcome::Found(credential) = store.load(None) else {
            panic!("expected a stored credential");
        };
        assert_eq!(credential.address, "10.0.0.0");
        assert_eq!(credential.username, "fooo");
    }

    #[test]
    fn test_missing_and_malformed_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load(None), LoadOutcome::NotFound);

        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(Some("10.0.0.0")), LoadOutcome::NotFound);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("missing").join(CONFIG_FILE_NAME));
        let err = store.save("10.0.0.0", "fooo").unwrap_err();
        assert!(matches!(err, Error::CredentialWrite { .. }));
    }

    #[test]
    fn test_default_path_ends_with_file_name() {
        assert!(default_config_path().ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_writable_home_is_chosen() {
        let home = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();

        let path = config_path_in(Some(home.path()), cwd.path());
        assert_eq!(path, home.path().join(CONFIG_FILE_NAME));
        // the scratch file is gone again
        assert_eq!(fs::read_dir(home.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_home_falls_back_to_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();

        // Nothing can be created beneath a regular file.
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "").unwrap();
        let path = config_path_in(Some(&file), cwd.path());
        assert_eq!(path, cwd.path().join(CONFIG_FILE_NAME));

        let missing = dir.path().join("missing");
        let path = config_path_in(Some(&missing), cwd.path());
        assert_eq!(path, cwd.path().join(CONFIG_FILE_NAME));

        assert_eq!(config_path_in(None, cwd.path()), cwd.path().join(CONFIG_FILE_NAME));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_home_matches_real_access() {
        use std::os::unix::fs::PermissionsExt;

        let home = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        fs::set_permissions(home.path(), fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users may still write here; the choice must follow
        // what this process can actually do.
        let can_write = fs::write(home.path().join("check"), "").is_ok();
        let path = config_path_in(Some(home.path()), cwd.path());
        let expected = if can_write { home.path() } else { cwd.path() };
        assert_eq!(path, expected.join(CONFIG_FILE_NAME));

        let _ = fs::remove_file(home.path().join("check"));
        fs::set_permissions(home.path(), fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_records_use_configured_target() {
        capture_logs();
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).with_log_target("credentials-target-test");
        store.save("10.0.0.0", "fooo").unwrap();

        let records = captured_logs("credentials-target-test");
        assert!(records.iter().any(|(_, message)| message.contains("Writing configuration file")));
    }
}
