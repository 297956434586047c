//! Remote key-value store holding cache entries
//!
//! [`VariableStore`] abstracts the backend (GitHub repository variables in
//! CI, memory in tests). [`CacheStore`] layers the cache protocol on top:
//! decoding, create-or-overwrite, and the read-modify-write update.
//!
//! Updates are not atomic. Two writers racing on one key can lose an update;
//! the anti-regression policy keeps such a race from replacing a stored
//! `fail` with a stale `pass`.

pub mod github;
pub mod memory;

pub use github::GithubVariables;
pub use memory::MemoryVariables;

use crate::cache::entry::{CacheEntry, EntryUpdate, StatusTransition, UpdatePolicy};
use crate::cache::fingerprint::Fingerprint;
use crate::cache::key::CacheKey;
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Result of a create attempt against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The name is already taken; nothing was written
    AlreadyExists,
}

/// Backend interface for named string variables
#[async_trait]
pub trait VariableStore: Send + Sync {
    /// Read a variable.
    ///
    /// Any non-success response, not-found included, is `Ok(None)`.
    /// Transport failures are errors.
    async fn get(&self, name: &str) -> CacheResult<Option<String>>;

    /// Create a new variable
    async fn create(&self, name: &str, value: &str) -> CacheResult<CreateOutcome>;

    /// Overwrite an existing variable
    async fn update(&self, name: &str, value: &str) -> CacheResult<()>;

    /// Names of all variables
    async fn list(&self) -> CacheResult<Vec<String>>;

    /// Delete a variable
    async fn delete(&self, name: &str) -> CacheResult<()>;

    /// Human-readable backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Cache protocol over a [`VariableStore`]
pub struct CacheStore<S: ?Sized> {
    backend: Box<S>,
}

impl<S: VariableStore + ?Sized> CacheStore<S> {
    pub fn new(backend: Box<S>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Read and decode the entry under `key`
    pub async fn fetch(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let Some(raw) = self.backend.get(key.as_str()).await? else {
            debug!("No entry under {} in {}", key, self.backend.backend_name());
            return Ok(None);
        };

        CacheEntry::decode(&raw)
            .map(Some)
            .map_err(|e| CacheError::MalformedCache {
                key: key.to_string(),
                reason: e.to_string(),
                raw,
            })
    }

    /// Write a `presuite` entry for `fingerprint`; last write wins
    pub async fn create(&self, key: &CacheKey, fingerprint: &Fingerprint) -> CacheResult<CacheEntry> {
        let entry = CacheEntry::pending(fingerprint);
        let value = entry.encode()?;

        match self.backend.create(key.as_str(), &value).await? {
            CreateOutcome::Created => info!("Created cache entry {}", key),
            CreateOutcome::AlreadyExists => {
                warn!("Cache entry {} appeared concurrently, overwriting it", key);
                self.backend.update(key.as_str(), &value).await?;
            }
        }

        Ok(entry)
    }

    /// Merge `update` into the stored entry and write it back
    pub async fn update(
        &self,
        key: &CacheKey,
        update: &EntryUpdate,
        policy: UpdatePolicy,
    ) -> CacheResult<CacheEntry> {
        let mut entry = self
            .fetch(key)
            .await?
            .ok_or_else(|| CacheError::EntryNotFound(key.to_string()))?;

        match entry.apply(update, policy) {
            StatusTransition::Unchanged => debug!("Status of {} unchanged", key),
            StatusTransition::Changed { from, to } => {
                info!("Status of {} changed from {} to {}", key, from, to)
            }
            StatusTransition::Suppressed { kept, rejected } => warn!(
                "Not overriding {} with {} for {}: stored failures need an explicit override",
                kept, rejected, key
            ),
        }

        self.backend.update(key.as_str(), &entry.encode()?).await?;
        Ok(entry)
    }

    /// Delete every cache entry, returning the removed keys
    pub async fn purge(&self) -> CacheResult<Vec<String>> {
        let keys: Vec<String> = self
            .backend
            .list()
            .await?
            .into_iter()
            .filter(|name| CacheKey::is_cache_key(name))
            .collect();

        for key in &keys {
            debug!("Deleting cache entry {}", key);
            self.backend.delete(key).await?;
        }

        info!("Purged {} cache entries", keys.len());
        Ok(keys)
    }
}
