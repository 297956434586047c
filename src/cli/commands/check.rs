//! Check command - pre-flight cache check
//!
//! Exit 0 tells the workflow to skip its Tuxsuite jobs; exit 1 runs them.

use crate::cache::{decide, tree_name, CacheKey, Decision, Fingerprint, FingerprintBuilder, MissReason};
use crate::ci_env::EnvFile;
use crate::cli::args::CheckArgs;
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::store::{CacheStore, GithubVariables, VariableStore};
use console::style;
use std::process::ExitCode;
use tracing::info;

/// Execute the check command
pub async fn execute(args: CheckArgs, config: &Config) -> CacheResult<ExitCode> {
    let store = CacheStore::new(Box::new(GithubVariables::new(
        &config.github,
        args.github_token.clone(),
    )));
    run(&store, args, config, &EnvFile::from_env())
        .await
        .map(ExitCode::from)
}

/// Purge or pre-flight check against `store`, returning the exit status
pub async fn run<S: VariableStore + ?Sized>(
    store: &CacheStore<S>,
    args: CheckArgs,
    config: &Config,
    env: &EnvFile,
) -> CacheResult<u8> {
    if args.purge_cache {
        return purge(store).await;
    }

    let workflow_name = required(args.workflow_name, "--workflow-name")?;
    let git_repo = required(args.git_repo, "--git-repo")?;
    let git_ref = required(args.git_ref, "--git-ref")?;

    let key = CacheKey::from_workflow_name(&workflow_name);
    let fingerprint = FingerprintBuilder::new(&config.fingerprint)
        .build(tree_name(&workflow_name), &git_repo, &git_ref)
        .await?;

    println!("Current sha: {}", fingerprint.linux_sha);
    println!("Current clang version: {}", fingerprint.clang_version);
    println!("Current patches hash: {}", fingerprint.patches_hash);

    let decision = check(store, &key, &fingerprint, env, &config.results.env_var).await?;
    report(&workflow_name, &key, &fingerprint, &decision);

    Ok(decision.exit_code())
}

/// Delete every cache entry. Always 1: a purge never justifies skipping work.
pub async fn purge<S: VariableStore + ?Sized>(store: &CacheStore<S>) -> CacheResult<u8> {
    let purged = store.purge().await?;
    for key in &purged {
        println!("  {} {}", style("•").red(), key);
    }
    println!("{} ({} entries)", style("CACHE CLEARED").bold(), purged.len());
    Ok(1)
}

/// Decide, and on a hit export the cached status for later steps
pub async fn check<S: VariableStore + ?Sized>(
    store: &CacheStore<S>,
    key: &CacheKey,
    fingerprint: &Fingerprint,
    env: &EnvFile,
    env_var: &str,
) -> CacheResult<Decision> {
    let decision = decide(store, key, fingerprint).await?;
    info!("{} for {}", decision, key);

    if let Decision::Hit(status) = &decision {
        env.export(env_var, status.as_str()).await?;
    }

    Ok(decision)
}

fn required(value: Option<String>, flag: &str) -> CacheResult<String> {
    value.ok_or_else(|| CacheError::MissingInput(flag.to_string()))
}

fn report(workflow_name: &str, key: &CacheKey, current: &Fingerprint, decision: &Decision) {
    match decision {
        Decision::Hit(status) => {
            println!(
                "{} The linux_sha, clang_version, and patches hash match",
                style("CACHE HIT:").green().bold()
            );
            println!("Not running {} as it would be redundant.", workflow_name);
            println!("CACHED STATUS: {}", status);
        }
        Decision::Miss(MissReason::NoEntry) => {
            println!(
                "{} Did not find repository variable {} for workflow {}. Created it.",
                style("CACHE MISS:").yellow().bold(),
                key,
                workflow_name
            );
        }
        Decision::Miss(MissReason::FingerprintMismatch { stored }) => {
            println!(
                "{} {} has a stale cache entry under {}. Reset it to presuite.",
                style("CACHE MISS:").yellow().bold(),
                workflow_name,
                key
            );
            println!(
                "CACHE:  {} | {} | {}",
                stored.linux_sha, stored.clang_version, stored.patches_hash
            );
            println!(
                "ACTUAL: {} | {} | {}",
                current.linux_sha, current.clang_version, current.patches_hash
            );
        }
        Decision::Miss(MissReason::UntrustedStatus(status)) => {
            println!(
                "{} The fingerprint matches, but the cached build status ({}) is not pass or fail.",
                style("CACHE HIT:").yellow().bold(),
                status
            );
            println!("Running the Tuxsuite builds.");
        }
    }
}
