//! Key command - print the cache key for a workflow name

use crate::cache::CacheKey;
use crate::cli::args::KeyArgs;
use crate::error::CacheResult;
use std::process::ExitCode;

/// Execute the key command
pub fn execute(args: KeyArgs) -> CacheResult<ExitCode> {
    println!("{}", CacheKey::from_workflow_name(&args.workflow_name));
    Ok(ExitCode::SUCCESS)
}
