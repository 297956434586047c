//! tuxcache - build-result cache for ClangBuiltLinux CI
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tuxcache::cli::{Cli, Commands};
use tuxcache::config::ConfigManager;
use tuxcache::error::CacheResult;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CacheResult<ExitCode> {
    let cli = Cli::parse();

    // Key command is pure and doesn't need config loading
    if let Commands::Key(args) = cli.command {
        return tuxcache::cli::commands::key(args);
    }

    let config_manager = ConfigManager::resolve(cli.config);
    let (config, origin) = config_manager.load().await?;

    init_logging(cli.verbose, &config.general.log_format);
    config_manager.report(origin);

    match cli.command {
        Commands::Key(_) => unreachable!("Key handled above"),
        Commands::Check(args) => tuxcache::cli::commands::check(args, &config).await,
        Commands::Update(args) => tuxcache::cli::commands::update(args, &config).await,
        Commands::Show(args) => tuxcache::cli::commands::show(args, &config).await,
        Commands::Config(args) => {
            tuxcache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; RUST_LOG takes precedence
fn init_logging(verbose: u8, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("tuxcache=warn"),
        1 => EnvFilter::new("tuxcache=info"),
        _ => EnvFilter::new("tuxcache=debug"),
    });

    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .init();
    }
}
