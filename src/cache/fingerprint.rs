//! Build fingerprints
//!
//! A fingerprint pins what a workflow would build right now: the commit the
//! tree's ref points at, the toolchain in the current container, and the
//! patch series applied on top. Changing the digest algorithm invalidates
//! every stored entry.

use crate::config::schema::FingerprintConfig;
use crate::error::{CacheError, CacheResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Pattern a resolved object id must match, shown in resolution errors
const SHA_PATTERN: &str = "^[0-9a-f]{40}([0-9a-f]{24})?\\s";

/// Identity of the build a workflow would run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub linux_sha: String,
    pub clang_version: String,
    pub patches_hash: String,
}

/// Computes fingerprints using local git, the local compiler, and the
/// checked-out patch directories
pub struct FingerprintBuilder {
    git: String,
    compiler: String,
    patches_dir: PathBuf,
}

impl FingerprintBuilder {
    pub fn new(config: &FingerprintConfig) -> Self {
        Self {
            git: config.git.clone(),
            compiler: config.compiler.clone(),
            patches_dir: config.patches_dir.clone(),
        }
    }

    /// Fingerprint `tree` as built from `git_ref` of `git_repo`
    pub async fn build(&self, tree: &str, git_repo: &str, git_ref: &str) -> CacheResult<Fingerprint> {
        let linux_sha = self.resolve_ref(git_repo, git_ref).await?;
        let clang_version = self.compiler_version().await?;
        let patches_hash = hash_patch_series(&self.patches_dir.join(tree))?;

        Ok(Fingerprint {
            linux_sha,
            clang_version,
            patches_hash,
        })
    }

    /// Resolve a ref on a remote repository to the commit it points at
    pub async fn resolve_ref(&self, git_repo: &str, git_ref: &str) -> CacheResult<String> {
        debug!("Resolving {} at {}", git_repo, git_ref);

        let stdout = self
            .capture(&self.git, &["ls-remote", git_repo, git_ref])
            .await?;
        parse_ls_remote(&stdout, git_repo, git_ref)
    }

    /// First line of the compiler's version report
    pub async fn compiler_version(&self) -> CacheResult<String> {
        let stdout = self.capture(&self.compiler, &["--version"]).await?;
        first_line(&stdout).ok_or_else(|| CacheError::CompilerVersion {
            compiler: self.compiler.clone(),
        })
    }

    async fn capture(&self, program: &str, args: &[&str]) -> CacheResult<String> {
        let display = format!("{} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CacheError::command_failed(&display, e))?;

        if !output.status.success() {
            return Err(CacheError::command_exec(
                display,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extract the object id from `git ls-remote` output.
///
/// Only the first line is considered; a ref can match several remote refs.
pub fn parse_ls_remote(stdout: &str, git_repo: &str, git_ref: &str) -> CacheResult<String> {
    let token = stdout
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .unwrap_or_default();

    let is_object_id = matches!(token.len(), 40 | 64)
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

    if !is_object_id {
        return Err(CacheError::RefResolution {
            repo: git_repo.to_string(),
            git_ref: git_ref.to_string(),
            pattern: SHA_PATTERN.to_string(),
            output: stdout.to_string(),
        });
    }

    Ok(token.to_string())
}

fn first_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

/// SHA-256 over every file in `dir`, concatenated in filename order.
///
/// A missing directory hashes like an empty series.
pub fn hash_patch_series(dir: &Path) -> CacheResult<String> {
    let mut hasher = Sha256::new();

    if dir.is_dir() {
        let mut files = Vec::new();
        let entries = fs::read_dir(dir)
            .map_err(|e| CacheError::io(format!("listing patches in {}", dir.display()), e))?;
        for entry in entries {
            let entry = entry
                .map_err(|e| CacheError::io(format!("listing patches in {}", dir.display()), e))?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in &files {
            let contents = fs::read(path)
                .map_err(|e| CacheError::io(format!("reading patch {}", path.display()), e))?;
            hasher.update(&contents);
        }
        debug!("Hashed {} patches in {}", files.len(), dir.display());
    } else {
        debug!("No patch directory at {}", dir.display());
    }

    Ok(hex::encode(hasher.finalize()))
}
