//! Workflow name to repository variable key mapping
//!
//! GitHub variable names may only contain `[A-Z0-9_]` and cannot start with
//! a digit or `GITHUB_`. Keys are the uppercased alphanumerics of the
//! workflow name behind a `_` sentinel, which also lets purge find them.

use std::fmt;

/// Leading character of every cache key
pub const KEY_PREFIX: char = '_';

/// A storage-safe repository variable name for one workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Map a workflow display name to its cache key.
    ///
    /// Names that differ only in case or punctuation share a key.
    pub fn from_workflow_name(workflow_name: &str) -> Self {
        let mut key = String::with_capacity(workflow_name.len() + 1);
        key.push(KEY_PREFIX);
        key.extend(
            workflow_name
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_uppercase()),
        );
        Self(key)
    }

    /// Whether a stored variable name looks like a cache key
    pub fn is_cache_key(name: &str) -> bool {
        name.starts_with(KEY_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Tree name a workflow builds, e.g. `mainline` for `mainline (clang-19)`
pub fn tree_name(workflow_name: &str) -> &str {
    workflow_name
        .split_once(' ')
        .map_or(workflow_name, |(tree, _)| tree)
}
