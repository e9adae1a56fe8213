//! Synthetic collector and mock filesystem.
//!
//! `MockCollector` produces values without touching the host, and `MockFs`
//! lets procfs collectors run against canned `/proc` contents.

mod filesystem;
mod generator;

pub use filesystem::MockFs;
pub use generator::{MockCollector, register};
