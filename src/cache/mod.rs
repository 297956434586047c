//! Build-result cache
//!
//! Memoizes the outcome of a workflow's Tuxsuite builds, keyed on the
//! fingerprint of what would be built: tree commit, compiler version, and
//! patch series.
//!
//! # Entry States
//!
//! | Status | Trusted | Meaning |
//! |--------|---------|---------|
//! | presuite | no | Created or reset, builds not finished |
//! | pass | yes | All builds completed and passed |
//! | fail | yes | All builds completed, at least one failed |
//! | badtux | no | Tuxsuite did not finish (timeout, crash) |
//! | other | no | Anything else the build service reported |
//!
//! Only trusted statuses with a matching fingerprint skip the builds. A
//! stored `fail` is never replaced by `pass` unless explicitly allowed.

pub mod classify;
pub mod decision;
pub mod entry;
pub mod fingerprint;
pub mod key;

pub use classify::{classify, BuildBatch, BuildRecord, Classification};
pub use decision::{decide, Decision, MissReason};
pub use entry::{BuildStatus, CacheEntry, EntryDecodeError, EntryUpdate, StatusTransition, UpdatePolicy};
pub use fingerprint::{Fingerprint, FingerprintBuilder};
pub use key::{tree_name, CacheKey, KEY_PREFIX};
