use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::jsonfile;
use crate::storage::StorageClient;
use crate::users::UserStore;

pub const UNKNOWN_UPLOADER: &str = "Unknown";

/// One entry of the post index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEntry {
    #[serde(default = "unknown_uploader")]
    pub uploader: String,
    #[serde(default)]
    pub likes: u64,
}

fn unknown_uploader() -> String {
    UNKNOWN_UPLOADER.to_string()
}

impl Default for PostEntry {
    fn default() -> Self {
        Self {
            uploader: unknown_uploader(),
            likes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub filename: String,
    pub uploader: String,
    pub likes: u64,
    pub url: String,
}

/// Filename -> post metadata, reconciled against the object store at startup.
///
/// Mutations and index writes share one mutex. Create and delete take effect
/// in memory only after the index write succeeds. Likes are kept in memory and
/// reach the file with the next create, delete or explicit `persist`.
pub struct PostRegistry {
    path: PathBuf,
    storage: Arc<dyn StorageClient>,
    admin: String,
    entries: Mutex<BTreeMap<String, PostEntry>>,
}

impl PostRegistry {
    pub async fn bootstrap(
        path: impl Into<PathBuf>,
        storage: Arc<dyn StorageClient>,
        users: &UserStore,
        admin: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let mut entries = load_index(&path);

        for (filename, entry) in entries.iter_mut() {
            if entry.uploader != UNKNOWN_UPLOADER && !users.contains(&entry.uploader) {
                warn!(%filename, uploader = %entry.uploader, "uploader not a known user");
                entry.uploader = unknown_uploader();
            }
        }

        match storage.list_objects().await {
            Ok(keys) => {
                let mut added = 0usize;
                // keys under a pseudo-directory (profile pictures) are not posts
                for key in keys.into_iter().filter(|k| !k.contains('/')) {
                    entries.entry(key).or_insert_with(|| {
                        added += 1;
                        PostEntry::default()
                    });
                }
                info!(added, "reconciled post index with object store");
            }
            Err(e) => {
                error!(error = %e, "listing object store failed; using local index only");
            }
        }

        info!(count = entries.len(), path = %path.display(), "post registry ready");
        Self {
            path,
            storage,
            admin: admin.into(),
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, PostEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn to_post(&self, filename: &str, entry: &PostEntry) -> Post {
        Post {
            filename: filename.to_string(),
            uploader: entry.uploader.clone(),
            likes: entry.likes,
            url: self.storage.object_url(filename),
        }
    }

    pub fn list(&self) -> Vec<Post> {
        self.lock()
            .iter()
            .map(|(filename, entry)| self.to_post(filename, entry))
            .collect()
    }

    pub fn get(&self, filename: &str) -> Option<Post> {
        self.lock()
            .get(filename)
            .map(|entry| self.to_post(filename, entry))
    }

    /// Uploads `content` and (re)indexes it with zero likes.
    pub async fn create(
        &self,
        filename: &str,
        uploader: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<Post, StoreError> {
        let url = self
            .storage
            .put_object(filename, content, content_type)
            .await
            .map_err(|e| StoreError::Remote(format!("{e:#}")))?;

        let entry = PostEntry {
            uploader: uploader.to_string(),
            likes: 0,
        };
        {
            let mut entries = self.lock();
            let mut next = entries.clone();
            next.insert(filename.to_string(), entry.clone());
            jsonfile::write_atomic(&self.path, &next)?;
            *entries = next;
        }
        info!(%filename, %uploader, "post created");
        Ok(Post {
            filename: filename.to_string(),
            uploader: entry.uploader,
            likes: 0,
            url,
        })
    }

    /// Adds one like and returns the new count. Not written to disk.
    pub fn like(&self, filename: &str) -> Result<u64, StoreError> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(filename)
            .ok_or_else(|| StoreError::NotFound(filename.to_string()))?;
        entry.likes += 1;
        Ok(entry.likes)
    }

    /// Admin-only. The local removal stands even if the remote delete fails.
    pub async fn delete(&self, filename: &str, requested_by: &str) -> Result<(), StoreError> {
        if requested_by != self.admin {
            warn!(%filename, %requested_by, "delete refused for non-admin");
            return Err(StoreError::Unauthorized(requested_by.to_string()));
        }
        {
            let mut entries = self.lock();
            let mut next = entries.clone();
            if next.remove(filename).is_none() {
                return Err(StoreError::NotFound(filename.to_string()));
            }
            jsonfile::write_atomic(&self.path, &next)?;
            *entries = next;
        }
        if let Err(e) = self.storage.delete_object(filename).await {
            error!(error = %e, %filename, "remote delete failed; post removed from index anyway");
        }
        info!(%filename, "post deleted");
        Ok(())
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        let entries = self.lock();
        jsonfile::write_atomic(&self.path, &*entries)
    }
}

fn load_index(path: &std::path::Path) -> BTreeMap<String, PostEntry> {
    let raw = match jsonfile::read_object(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "could not load post index; starting empty");
            return BTreeMap::new();
        }
    };
    raw.into_iter()
        .map(|(filename, value)| {
            let entry = serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(error = %e, %filename, "malformed post entry; using defaults");
                PostEntry::default()
            });
            (filename, entry)
        })
        .collect()
}
