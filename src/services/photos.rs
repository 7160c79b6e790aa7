//! Photo storage collaborator. The core only keeps the URL a backend hands back.

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub trait PhotoStorage: Send {
    /// Store `bytes` under the logical `path` and return the public URL.
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<String, StoreError>;
    fn remove(&mut self, url: &str) -> Result<(), StoreError>;
}

/// Used when no backend is configured: uploads fail, removals are no-ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPhotoStorage;

impl PhotoStorage for NoPhotoStorage {
    fn upload(&mut self, path: &str, _bytes: &[u8]) -> Result<String, StoreError> {
        Err(StoreError::Unavailable(format!("no photo storage configured for {}", path)))
    }

    fn remove(&mut self, _url: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Keeps blobs in memory. Clones share the same blobs, so a test can hold one handle
/// while the service owns another.
#[derive(Debug, Clone)]
pub struct MemoryPhotoStorage {
    base_url: String,
    blobs: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryPhotoStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        MemoryPhotoStorage {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.blobs.lock().map(|b| b.contains_key(url)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PhotoStorage for MemoryPhotoStorage {
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Unavailable("photo storage lock poisoned".to_string()))?;
        blobs.insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    fn remove(&mut self, url: &str) -> Result<(), StoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Unavailable("photo storage lock poisoned".to_string()))?;
        blobs.remove(url);
        Ok(())
    }
}
