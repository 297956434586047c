//! In-process variable store

use crate::error::{CacheError, CacheResult};
use crate::store::{CreateOutcome, VariableStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Variables held in memory, with an optional simulated read outage
#[derive(Debug, Default)]
pub struct MemoryVariables {
    vars: Mutex<BTreeMap<String, String>>,
    reads_fail: AtomicBool,
}

impl MemoryVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable directly, bypassing create semantics
    pub fn insert(&self, name: &str, value: &str) {
        self.lock().insert(name.to_string(), value.to_string());
    }

    /// Make subsequent reads fail as a transport error would
    pub fn fail_reads(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    /// Copy of every variable
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        // a panicking test thread must not hide the map from the others
        self.vars.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl VariableStore for MemoryVariables {
    async fn get(&self, name: &str) -> CacheResult<Option<String>> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(CacheError::remote("get", "simulated outage"));
        }
        Ok(self.lock().get(name).cloned())
    }

    async fn create(&self, name: &str, value: &str) -> CacheResult<CreateOutcome> {
        let mut vars = self.lock();
        if vars.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        vars.insert(name.to_string(), value.to_string());
        Ok(CreateOutcome::Created)
    }

    async fn update(&self, name: &str, value: &str) -> CacheResult<()> {
        match self.lock().get_mut(name) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(CacheError::remote("update", format!("{} not found", name))),
        }
    }

    async fn list(&self) -> CacheResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> CacheResult<()> {
        self.lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CacheError::remote("delete", format!("{} not found", name)))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
