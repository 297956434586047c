//! Persisted cache entry and its update rules
//!
//! The stored value is decoded through [`RawEntry`], whose fields are all
//! optional, and validated into a [`CacheEntry`]. Fields the entry does not
//! know about are carried along untouched so older or newer writers never
//! lose each other's data.

use crate::cache::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Outcome recorded for the last build of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    /// Entry created or reset, builds not yet finished (`presuite`)
    Pending,
    /// Every build completed and passed
    Pass,
    /// Every build completed and at least one failed
    Fail,
    /// The remote build service never finished (`badtux`)
    InfraFailure,
    /// Any other status the build service reported
    Other(String),
}

impl BuildStatus {
    /// Whether a matching fingerprint may skip work on this status.
    ///
    /// Only a conclusive result from a completed remote build qualifies.
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Pass | Self::Fail)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "presuite",
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::InfraFailure => "badtux",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for BuildStatus {
    fn from(s: &str) -> Self {
        match s.trim() {
            "presuite" => Self::Pending,
            "pass" => Self::Pass,
            "fail" => Self::Fail,
            "badtux" => Self::InfraFailure,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for BuildStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        match status {
            BuildStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stored value could not become a [`CacheEntry`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryDecodeError {
    #[error("value is not a JSON object of strings: {0}")]
    Invalid(String),

    #[error("missing mandatory fields: {0:?}")]
    MissingFields(Vec<&'static str>),

    #[error("empty identity fields: {0:?}")]
    EmptyFields(Vec<&'static str>),
}

/// Stored value as written by any version of the cache
#[derive(Debug, Deserialize)]
struct RawEntry {
    linux_sha: Option<String>,
    clang_version: Option<String>,
    patches_hash: Option<String>,
    build_status: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Cache record for one workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub linux_sha: String,
    pub clang_version: String,
    /// Absent in entries written before patch series were fingerprinted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patches_hash: Option<String>,
    pub build_status: BuildStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CacheEntry {
    /// Fresh entry for a fingerprint that has not been built yet
    pub fn pending(fingerprint: &Fingerprint) -> Self {
        Self {
            linux_sha: fingerprint.linux_sha.clone(),
            clang_version: fingerprint.clang_version.clone(),
            patches_hash: Some(fingerprint.patches_hash.clone()),
            build_status: BuildStatus::Pending,
            extra: Map::new(),
        }
    }

    /// Decode a stored variable value
    pub fn decode(value: &str) -> Result<Self, EntryDecodeError> {
        let raw: RawEntry =
            serde_json::from_str(value).map_err(|e| EntryDecodeError::Invalid(e.to_string()))?;

        let mut missing = Vec::new();
        if raw.linux_sha.is_none() {
            missing.push("linux_sha");
        }
        if raw.clang_version.is_none() {
            missing.push("clang_version");
        }
        if raw.build_status.is_none() {
            missing.push("build_status");
        }

        let (Some(linux_sha), Some(clang_version), Some(build_status)) =
            (raw.linux_sha, raw.clang_version, raw.build_status)
        else {
            return Err(EntryDecodeError::MissingFields(missing));
        };

        // an empty build_status is tolerated and decodes as untrusted
        let empty: Vec<_> = [("linux_sha", &linux_sha), ("clang_version", &clang_version)]
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
            .collect();
        if !empty.is_empty() {
            return Err(EntryDecodeError::EmptyFields(empty));
        }

        Ok(Self {
            linux_sha,
            clang_version,
            patches_hash: raw.patches_hash,
            build_status: BuildStatus::from(build_status),
            extra: raw.extra,
        })
    }

    /// Encode for storage
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Whether this entry describes the build the fingerprint would produce.
    ///
    /// A missing stored `patches_hash` matches any current hash.
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        self.linux_sha == fingerprint.linux_sha
            && self.clang_version == fingerprint.clang_version
            && self
                .patches_hash
                .as_ref()
                .is_none_or(|hash| *hash == fingerprint.patches_hash)
    }

    /// Merge the present fields of `update` into this entry.
    pub fn apply(&mut self, update: &EntryUpdate, policy: UpdatePolicy) -> StatusTransition {
        if let Some(sha) = &update.linux_sha {
            self.linux_sha.clone_from(sha);
        }
        if let Some(version) = &update.clang_version {
            self.clang_version.clone_from(version);
        }
        if let Some(hash) = &update.patches_hash {
            self.patches_hash = Some(hash.clone());
        }

        let Some(next) = &update.build_status else {
            return StatusTransition::Unchanged;
        };

        if *next == self.build_status {
            return StatusTransition::Unchanged;
        }

        if !policy.allow_fail_to_pass
            && self.build_status == BuildStatus::Fail
            && *next == BuildStatus::Pass
        {
            return StatusTransition::Suppressed {
                kept: BuildStatus::Fail,
                rejected: BuildStatus::Pass,
            };
        }

        let from = std::mem::replace(&mut self.build_status, next.clone());
        StatusTransition::Changed {
            from,
            to: next.clone(),
        }
    }
}

/// Fields to overwrite on an existing entry; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub linux_sha: Option<String>,
    pub clang_version: Option<String>,
    pub patches_hash: Option<String>,
    pub build_status: Option<BuildStatus>,
}

impl EntryUpdate {
    /// Point an entry at a new fingerprint and mark it unbuilt
    pub fn reset_to(fingerprint: &Fingerprint) -> Self {
        Self {
            linux_sha: Some(fingerprint.linux_sha.clone()),
            clang_version: Some(fingerprint.clang_version.clone()),
            patches_hash: Some(fingerprint.patches_hash.clone()),
            build_status: Some(BuildStatus::Pending),
        }
    }
}

/// Rules applied to `build_status` during an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// Let a `pass` replace a stored `fail`
    pub allow_fail_to_pass: bool,
}

impl UpdatePolicy {
    /// Stored failures stick until explicitly overridden
    pub fn anti_regression() -> Self {
        Self {
            allow_fail_to_pass: false,
        }
    }

    pub fn permissive() -> Self {
        Self {
            allow_fail_to_pass: true,
        }
    }
}

/// What an update did to `build_status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusTransition {
    Unchanged,
    Changed { from: BuildStatus, to: BuildStatus },
    Suppressed { kept: BuildStatus, rejected: BuildStatus },
}
