//! Update command - record a finished Tuxsuite batch
//!
//! Any build that Tuxsuite did not finish marks the batch `badtux`, which
//! the pre-flight check never trusts, so the next run rebuilds.

use crate::cache::{classify, BuildBatch, CacheEntry, CacheKey, Classification, UpdatePolicy};
use crate::cli::args::UpdateArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::store::{CacheStore, GithubVariables, VariableStore};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

/// Setting this variable to anything, even empty, selects the mock batch
pub const MOCK_ENV: &str = "MOCK";

/// Execute the update command
pub async fn execute(args: UpdateArgs, config: &Config) -> CacheResult<ExitCode> {
    let store = CacheStore::new(Box::new(GithubVariables::new(
        &config.github,
        args.token.clone(),
    )));
    run(&store, &args, config).await.map(ExitCode::from)
}

/// Classify the batch and record it, returning the exit status.
///
/// The batch is validated before the store is touched.
pub async fn run<S: VariableStore + ?Sized>(
    store: &CacheStore<S>,
    args: &UpdateArgs,
    config: &Config,
) -> CacheResult<u8> {
    let path = batch_path(args, config);

    println!("Reading {}", path.display());
    let batch = BuildBatch::load(&path)?;
    let classification = classify(&batch)?;

    if !classification.missing_metadata.is_empty() {
        warn!(
            "Some builds in {} are missing metadata: {:?}",
            path.display(),
            classification.missing_metadata
        );
    }

    println!(
        "Tuxsuite git_sha = {} | clang_version = {}",
        classification.git_sha, classification.clang_version
    );

    let policy = if args.allow_fail_to_pass {
        UpdatePolicy::permissive()
    } else {
        UpdatePolicy::anti_regression()
    };

    let key = CacheKey::from_workflow_name(&args.workflow_name);
    let entry = record(store, &key, &classification, policy).await?;

    println!(
        "{} {} is now {}",
        style("Cache updated:").green().bold(),
        key,
        entry.build_status
    );
    Ok(0)
}

/// Persist a classified batch under `key`
pub async fn record<S: VariableStore + ?Sized>(
    store: &CacheStore<S>,
    key: &CacheKey,
    classification: &Classification,
    policy: UpdatePolicy,
) -> CacheResult<CacheEntry> {
    println!("Trying to update cache with status: {}", classification.status);
    store.update(key, &classification.to_update(), policy).await
}

fn batch_path(args: &UpdateArgs, config: &Config) -> PathBuf {
    match &args.builds_file {
        Some(path) => path.clone(),
        None => config.results.builds_path(mock_mode(args.mock)),
    }
}

fn mock_mode(flag: bool) -> bool {
    flag || std::env::var_os(MOCK_ENV).is_some()
}
