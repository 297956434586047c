//! Pre-flight cache decision
//!
//! Given the current fingerprint, decide whether a workflow's builds need to
//! run. Every miss leaves the store pointing at the current fingerprint so
//! the next run has the best chance of a hit.

use crate::cache::entry::{BuildStatus, EntryUpdate, UpdatePolicy};
use crate::cache::fingerprint::Fingerprint;
use crate::cache::key::CacheKey;
use crate::error::{CacheError, CacheResult};
use crate::store::{CacheStore, VariableStore};
use std::fmt;
use tracing::{debug, warn};

/// Why the builds have to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No entry existed (or it could not be read); one was created
    NoEntry,
    /// The stored fingerprint is stale; the entry was reset to `presuite`
    FingerprintMismatch { stored: Fingerprint },
    /// Fingerprint matches but the stored status is not conclusive
    UntrustedStatus(BuildStatus),
}

/// Outcome of a pre-flight check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Skip the builds and replay the cached status
    Hit(BuildStatus),
    /// Run the builds
    Miss(MissReason),
}

impl Decision {
    /// Process exit code: 0 skips the remote builds, 1 runs them
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Hit(_) => 0,
            Self::Miss(_) => 1,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit(status) => write!(f, "CACHE HIT ({})", status),
            Self::Miss(MissReason::NoEntry) => write!(f, "CACHE MISS (no entry)"),
            Self::Miss(MissReason::FingerprintMismatch { .. }) => {
                write!(f, "CACHE MISS (fingerprint changed)")
            }
            Self::Miss(MissReason::UntrustedStatus(status)) => {
                write!(f, "CACHE MISS (untrusted status '{}')", status)
            }
        }
    }
}

/// Run the decision table for `key` against `current`.
///
/// A store read that fails outright counts as a missing entry. Malformed
/// entries abort without touching the store. Create and update failures
/// are fatal.
pub async fn decide<S: VariableStore + ?Sized>(
    store: &CacheStore<S>,
    key: &CacheKey,
    current: &Fingerprint,
) -> CacheResult<Decision> {
    let stored = match store.fetch(key).await {
        Ok(stored) => stored,
        Err(CacheError::RemoteStore { operation, reason }) => {
            warn!(
                "Reading {} failed during {} ({}), treating it as absent",
                key, operation, reason
            );
            None
        }
        Err(e) => return Err(e),
    };

    let Some(entry) = stored else {
        store.create(key, current).await?;
        return Ok(Decision::Miss(MissReason::NoEntry));
    };

    if !entry.matches(current) {
        let stored = Fingerprint {
            linux_sha: entry.linux_sha.clone(),
            clang_version: entry.clang_version.clone(),
            patches_hash: entry.patches_hash.clone().unwrap_or_default(),
        };
        debug!("Stored fingerprint {:?} differs from {:?}", stored, current);

        store
            .update(key, &EntryUpdate::reset_to(current), UpdatePolicy::anti_regression())
            .await?;
        return Ok(Decision::Miss(MissReason::FingerprintMismatch { stored }));
    }

    if !entry.build_status.is_trusted() {
        return Ok(Decision::Miss(MissReason::UntrustedStatus(entry.build_status)));
    }

    Ok(Decision::Hit(entry.build_status))
}
