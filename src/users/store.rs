use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::repo_types::{StoredUser, UserRecord};
use crate::error::StoreError;
use crate::jsonfile;

/// Converts every historical entry shape into a `UserRecord`.
pub fn normalize(raw: Map<String, Value>) -> BTreeMap<String, UserRecord> {
    raw.into_iter()
        .map(|(username, value)| {
            let stored = serde_json::from_value::<StoredUser>(value)
                .unwrap_or(StoredUser::Unrecognized(Value::Null));
            (username, UserRecord::from(stored))
        })
        .collect()
}

fn read_users(path: &Path) -> Result<BTreeMap<String, UserRecord>, StoreError> {
    jsonfile::read_object(path).map(normalize)
}

/// Rewrites a users file in the current record shape. Returns the user count.
pub fn normalize_file(path: &Path) -> anyhow::Result<usize> {
    let users = match read_users(path) {
        Ok(users) => users,
        Err(e @ StoreError::MalformedPersistedState { .. }) => {
            warn!(error = %e, "users file is malformed; writing an empty store");
            BTreeMap::new()
        }
        Err(e) => return Err(e.into()),
    };
    jsonfile::write_atomic(path, &users)?;
    Ok(users.len())
}

/// Username -> record map backed by a JSON file.
///
/// One mutex covers both the map and the file write, so mutations from
/// request handlers in this process never interleave. Another process
/// writing the same username can still lose an update: persistence merges
/// unrelated users but the last writer wins per username.
pub struct UserStore {
    path: PathBuf,
    users: Mutex<BTreeMap<String, UserRecord>>,
}

impl UserStore {
    /// Loads the store, starting empty when the file is missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let users = match read_users(&path) {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "could not load users; starting empty");
                BTreeMap::new()
            }
        };
        info!(count = users.len(), path = %path.display(), "user store loaded");
        Self {
            path,
            users: Mutex::new(users),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, UserRecord>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, username: &str) -> Option<UserRecord> {
        self.lock().get(username).cloned()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.lock().contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn create(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let mut users = self.lock();
        if users.contains_key(username) {
            return Err(StoreError::AlreadyExists(username.to_string()));
        }
        let mut next = users.clone();
        next.insert(username.to_string(), UserRecord::new(password));
        *users = self.write_merged(&next)?;
        info!(%username, "user created");
        Ok(())
    }

    /// Exact, byte-for-byte password comparison.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserRecord, StoreError> {
        match self.lock().get(username) {
            Some(record) if record.password == password => Ok(record.clone()),
            _ => Err(StoreError::InvalidCredentials),
        }
    }

    /// Sets the profile picture, creating a password-less record for unknown users.
    pub fn set_profile_picture(&self, username: &str, url: &str) -> Result<(), StoreError> {
        let mut users = self.lock();
        let mut next = users.clone();
        next.entry(username.to_string())
            .or_insert_with(|| UserRecord::new(""))
            .profile_pic = Some(url.to_string());
        *users = self.write_merged(&next)?;
        debug!(%username, %url, "profile picture set");
        Ok(())
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        let mut users = self.lock();
        let merged = self.write_merged(&users)?;
        *users = merged;
        Ok(())
    }

    /// Merge-on-write: re-read the file, overlay `users`, write the union back
    /// and return it. Callers swap it into memory only once the write landed,
    /// so users added elsewhere become visible and a failed write changes nothing.
    fn write_merged(
        &self,
        users: &BTreeMap<String, UserRecord>,
    ) -> Result<BTreeMap<String, UserRecord>, StoreError> {
        let mut merged = match read_users(&self.path) {
            Ok(on_disk) => on_disk,
            Err(e @ StoreError::MalformedPersistedState { .. }) => {
                warn!(error = %e, "users file is malformed; overwriting with in-memory state");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        merged.extend(users.iter().map(|(k, v)| (k.clone(), v.clone())));
        jsonfile::write_atomic(&self.path, &merged)?;
        Ok(merged)
    }
}
