//! Reduce a Tuxsuite build batch to one cache status
//!
//! `builds.json` maps build ids to per-target results. Individual entries can
//! be missing fields when Tuxsuite itself failed part of the batch, so every
//! field is read optionally.

use crate::cache::entry::{BuildStatus, EntryUpdate};
use crate::error::{CacheError, CacheResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Completion indicator Tuxsuite reports for a finished build
const COMPLETE: &str = "complete";

/// Status recorded when a completed build reports no status at all
const UNKNOWN_STATUS: &str = "unknown";

#[derive(Debug, Deserialize)]
struct BatchDocument {
    builds: Map<String, Value>,
}

/// One build from the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub tuxbuild_status: Option<String>,
    pub build_status: Option<String>,
    pub git_sha: Option<String>,
    pub compiler_version: Option<String>,
}

impl BuildRecord {
    fn from_value(value: &Value) -> Self {
        let text = |pointer: &str| {
            value
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Self {
            tuxbuild_status: text("/tuxbuild_status"),
            build_status: text("/build_status"),
            git_sha: text("/git_sha"),
            compiler_version: text("/tuxmake_metadata/compiler/version_full"),
        }
    }

    fn is_complete(&self) -> bool {
        self.tuxbuild_status.as_deref() == Some(COMPLETE)
    }

    fn metadata(&self) -> Option<(&str, &str)> {
        Some((self.git_sha.as_deref()?, self.compiler_version.as_deref()?))
    }
}

/// All builds from one Tuxsuite run, in file order
#[derive(Debug, Clone)]
pub struct BuildBatch {
    pub source: PathBuf,
    pub builds: Vec<(String, BuildRecord)>,
    raw: String,
}

impl BuildBatch {
    /// Read a batch file, rejecting missing and zero-sized files
    pub fn load(path: &Path) -> CacheResult<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::BuildsFileMissing(path.to_path_buf()))
            }
            Err(e) => return Err(CacheError::io(format!("reading {}", path.display()), e)),
        };

        if raw.is_empty() {
            return Err(CacheError::BuildsFileEmpty(path.to_path_buf()));
        }

        Self::parse(path, raw)
    }

    pub fn parse(source: &Path, raw: String) -> CacheResult<Self> {
        let document: BatchDocument = serde_json::from_str(&raw)?;
        let builds = document
            .builds
            .iter()
            .map(|(id, value)| (id.clone(), BuildRecord::from_value(value)))
            .collect();

        Ok(Self {
            source: source.to_path_buf(),
            builds,
            raw,
        })
    }
}

/// Cache-worthy summary of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: BuildStatus,
    pub git_sha: String,
    pub clang_version: String,
    /// Ids of builds that carried no sha or compiler metadata
    pub missing_metadata: Vec<String>,
}

impl Classification {
    /// Update carrying this result; the patch hash is left as stored
    pub fn to_update(&self) -> EntryUpdate {
        EntryUpdate {
            linux_sha: Some(self.git_sha.clone()),
            clang_version: Some(self.clang_version.clone()),
            patches_hash: None,
            build_status: Some(self.status.clone()),
        }
    }
}

/// Reduce a batch to a single status plus the identity it was built from.
///
/// Any unfinished build makes the whole batch `badtux`. Otherwise the first
/// non-passing build decides, and only an all-pass batch is `pass`.
pub fn classify(batch: &BuildBatch) -> CacheResult<Classification> {
    if batch.builds.is_empty() {
        return Err(CacheError::EmptyBatch(batch.source.clone()));
    }

    let mut metadata = None;
    let mut missing_metadata = Vec::new();
    for (id, build) in &batch.builds {
        match build.metadata() {
            Some(found) => {
                metadata = Some(found);
                break;
            }
            None => missing_metadata.push(id.clone()),
        }
    }

    let Some((git_sha, clang_version)) = metadata else {
        return Err(CacheError::MetadataExtraction {
            raw: batch.raw.clone(),
        });
    };

    let status = if let Some((id, _)) = batch.builds.iter().find(|(_, b)| !b.is_complete()) {
        debug!("Build {} did not complete", id);
        BuildStatus::InfraFailure
    } else {
        batch
            .builds
            .iter()
            .find_map(|(id, b)| match b.build_status.as_deref() {
                Some("pass") => None,
                Some(other) => {
                    debug!("Build {} finished with {}", id, other);
                    Some(BuildStatus::from(other))
                }
                None => Some(BuildStatus::from(UNKNOWN_STATUS)),
            })
            .unwrap_or(BuildStatus::Pass)
    };

    Ok(Classification {
        status,
        git_sha: git_sha.to_string(),
        clang_version: clang_version.to_string(),
        missing_metadata,
    })
}
