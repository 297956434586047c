//! Show command - print a workflow's cache entry

use crate::cache::CacheKey;
use crate::cli::args::ShowArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::store::{CacheStore, GithubVariables};
use console::style;
use std::process::ExitCode;

/// Execute the show command
pub async fn execute(args: ShowArgs, config: &Config) -> CacheResult<ExitCode> {
    let store = CacheStore::new(Box::new(GithubVariables::new(
        &config.github,
        args.github_token,
    )));
    let key = CacheKey::from_workflow_name(&args.workflow_name);

    println!("{} {}", style("Key:").bold(), key);

    match store.fetch(&key).await? {
        Some(entry) => {
            let trust = if entry.build_status.is_trusted() {
                style("trusted").green()
            } else {
                style("untrusted").yellow()
            };
            println!("{} {} ({})", style("Status:").bold(), entry.build_status, trust);
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        None => println!("No cache entry for {}", args.workflow_name),
    }

    Ok(ExitCode::SUCCESS)
}
