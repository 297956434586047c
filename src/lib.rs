//! tuxcache - build-result cache for ClangBuiltLinux CI
//!
//! Memoizes Tuxsuite build outcomes in GitHub repository variables so that
//! workflows whose tree, toolchain, and patches have not changed skip their
//! builds.

pub mod cache;
pub mod ci_env;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;

pub use error::{CacheError, CacheResult};
