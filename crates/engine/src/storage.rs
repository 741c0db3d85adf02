//! Evidence photo storage.
//!
//! Paths are relative keys of the form `{user_id}/{assigned_mission_id}.{ext}`.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a photo store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Binary object storage for evidence photos.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Store `bytes` under `path`, replacing any previous object, and return
    /// its public URL.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;

    /// Remove objects. Missing objects are not an error.
    async fn delete_many(&self, paths: &[String]) -> Result<(), StorageError>;
}

/// Storage key for an assignment's evidence photo.
pub fn photo_path(user_id: &str, assigned_mission_id: &str, ext: &str) -> String {
    format!("{}/{}.{}", user_id, assigned_mission_id, ext)
}

fn checked_relative(path: &str) -> Result<&Path, StorageError> {
    let relative = Path::new(path);
    let safe = !path.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if safe {
        Ok(relative)
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

/// Photos stored on the local filesystem and served from `base_url`.
#[derive(Debug, Clone)]
pub struct LocalPhotoStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalPhotoStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let full = self.root.join(checked_relative(path)?);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, &bytes).await?;

        debug!(path = %path, content_type = %content_type, size = bytes.len(), "Stored photo");
        Ok(self.public_url(path))
    }

    async fn delete_many(&self, paths: &[String]) -> Result<(), StorageError> {
        for path in paths {
            let full = self.root.join(checked_relative(path)?);
            match tokio::fs::remove_file(&full).await {
                Ok(()) => debug!(path = %path, "Deleted photo"),
                Err(e) if e.kind() == IoErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// An in-memory photo store with failure injection.
///
/// Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryPhotoStorage {
    objects: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
    fail_puts: Arc<AtomicBool>,
    undeletable: Arc<Mutex<HashSet<String>>>,
}

impl MemoryPhotoStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put` fail.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make any `delete_many` call that includes `path` fail.
    pub fn fail_deletes_of(&self, path: impl Into<String>) {
        if let Ok(mut set) = self.undeletable.lock() {
            set.insert(path.into());
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(path))
            .unwrap_or(false)
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        let objects = self.objects.lock().ok()?;
        objects.get(path).map(|(_, content_type)| content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PhotoStorage for MemoryPhotoStorage {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        checked_relative(path)?;
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("uploads disabled".to_string()));
        }

        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("store poisoned".to_string()))?;
        objects.insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(format!("memory://{}", path))
    }

    async fn delete_many(&self, paths: &[String]) -> Result<(), StorageError> {
        {
            let undeletable = self
                .undeletable
                .lock()
                .map_err(|_| StorageError::Unavailable("store poisoned".to_string()))?;
            if let Some(path) = paths.iter().find(|p| undeletable.contains(*p)) {
                return Err(StorageError::Unavailable(format!("cannot delete {}", path)));
            }
        }

        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("store poisoned".to_string()))?;
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_path() {
        assert_eq!(photo_path("u1", "a1", "png"), "u1/a1.png");
    }

    #[test]
    fn test_checked_relative() {
        assert!(checked_relative("u1/a1.jpg").is_ok());
        assert!(checked_relative("").is_err());
        assert!(checked_relative("../etc/passwd").is_err());
        assert!(checked_relative("/abs/path.jpg").is_err());
        assert!(checked_relative("u1/./a1.jpg").is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalPhotoStorage::new(dir.path(), "http://cdn.local/photos/");

        let url = storage.put("u1/a1.jpg", vec![1, 2, 3], "image/jpeg").await.unwrap();
        assert_eq!(url, "http://cdn.local/photos/u1/a1.jpg");
        assert_eq!(std::fs::read(dir.path().join("u1/a1.jpg")).unwrap(), vec![1, 2, 3]);

        // Deleting twice (or something never stored) is fine.
        let paths = vec!["u1/a1.jpg".to_string(), "u2/none.jpg".to_string()];
        storage.delete_many(&paths).await.unwrap();
        storage.delete_many(&paths).await.unwrap();
        assert!(!dir.path().join("u1/a1.jpg").exists());
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalPhotoStorage::new(dir.path(), "http://cdn.local");

        let result = storage.put("../escape.jpg", vec![0], "image/jpeg").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_memory_storage_failures() {
        let storage = MemoryPhotoStorage::new();
        storage.put("u1/a.jpg", vec![1], "image/jpeg").await.unwrap();
        storage.put("u1/b.jpg", vec![2], "image/png").await.unwrap();
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.content_type("u1/b.jpg").as_deref(), Some("image/png"));

        storage.fail_deletes_of("u1/b.jpg");
        let result = storage.delete_many(&["u1/a.jpg".to_string(), "u1/b.jpg".to_string()]).await;
        assert!(result.is_err());
        assert_eq!(storage.len(), 2);

        storage.delete_many(&["u1/a.jpg".to_string()]).await.unwrap();
        assert!(!storage.contains("u1/a.jpg"));

        storage.set_fail_puts(true);
        assert!(storage.put("u1/c.jpg", vec![3], "image/jpeg").await.is_err());
        assert!(!storage.contains("u1/c.jpg"));
    }
}
