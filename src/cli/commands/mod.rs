//! CLI command implementations

pub mod check;
pub mod config;
pub mod key;
pub mod show;
pub mod update;

pub use check::execute as check;
pub use config::execute as config;
pub use key::execute as key;
pub use show::execute as show;
pub use update::execute as update;
