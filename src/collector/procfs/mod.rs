//! Collectors for the Linux `/proc` filesystem.

pub mod load;
pub mod parser;
pub mod stat;

use std::path::Path;

use crate::collector::registry::CollectorRegistry;
use crate::collector::traits::FileSystem;
use crate::ring::ValueRingFactory;

pub use load::LoadCollector;
pub use parser::ParseError;
pub use stat::{CpuTicks, StatCollector};

/// Registers every procfs collector reading from `proc_path`.
pub fn register<F>(
    registry: &mut CollectorRegistry,
    factory: &ValueRingFactory,
    fs: F,
    proc_path: &Path,
) where
    F: FileSystem + Clone + 'static,
{
    registry.register(StatCollector::new(fs.clone(), proc_path, factory));
    registry.register(LoadCollector::new(fs, proc_path, factory));
}
