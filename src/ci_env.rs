//! GitHub Actions environment file
//!
//! Lines of the form `NAME=value` appended to the file named by
//! `$GITHUB_ENV` become environment variables of later steps in the job.

use crate::error::{CacheError, CacheResult};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Environment variable naming the file
pub const GITHUB_ENV: &str = "GITHUB_ENV";

/// Append-only handle on the job's environment file
pub struct EnvFile {
    path: Option<PathBuf>,
}

impl EnvFile {
    /// Use the file named by `$GITHUB_ENV`, if any
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os(GITHUB_ENV)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Export `name=value` to later steps.
    ///
    /// Returns whether anything was written; outside a workflow there is no
    /// file and the call does nothing.
    pub async fn export(&self, name: &str, value: &str) -> CacheResult<bool> {
        let Some(path) = &self.path else {
            debug!("{} not set, not exporting {}", GITHUB_ENV, name);
            return Ok(false);
        };

        if value.contains('\n') {
            return Err(CacheError::Internal(format!(
                "refusing to export multi-line value for {}",
                name
            )));
        }

        let line = format!("{}={}\n", name, value);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| CacheError::io(format!("opening {}", path.display()), e))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| CacheError::io(format!("writing {}", path.display()), e))?;
        file.flush()
            .await
            .map_err(|e| CacheError::io(format!("flushing {}", path.display()), e))?;

        debug!("Exported {}={} to {}", name, value, path.display());
        Ok(true)
    }
}
