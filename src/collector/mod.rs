//! Metric sources and their lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     CollectorRegistry                        │
//! │  ┌───────────────┐  ┌───────────────┐  ┌──────────────────┐  │
//! │  │ MockCollector │  │ StatCollector │  │  LoadCollector   │  │
//! │  │  generator    │  │  /proc/stat   │  │  /proc/loadavg   │  │
//! │  └───────┬───────┘  └───────┬───────┘  └────────┬─────────┘  │
//! │          │ ValueRing        │ ValueRing         │ ValueRing  │
//! │          │                  └─────────┬─────────┘            │
//! │          │                     ┌──────▼──────┐               │
//! │          │                     │  FileSystem │ (trait)       │
//! │          │                     └──────┬──────┘               │
//! └──────────┼────────────────────────────┼──────────────────────┘
//!            │                    ┌───────┴───────┐
//!      MetricReaders              │               │
//!                           ┌─────▼─────┐   ┌─────▼─────┐
//!                           │  RealFs   │   │  MockFs   │
//!                           └───────────┘   └───────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use flowmon::collector::{Collector, MockFs, StatCollector};
//! use flowmon::ring::ValueRingFactory;
//!
//! let factory = ValueRingFactory::default();
//! let mut collector = StatCollector::new(MockFs::typical_system(), "/proc", &factory);
//! collector.init().unwrap();
//! collector.update().unwrap();
//! assert_eq!(collector.readers().read("procs/running"), Some(2.0));
//! ```

pub mod lifecycle;
pub mod mock;
pub mod procfs;
pub mod registry;
pub mod traits;

pub use lifecycle::{CollectError, Collector, CollectorState, MetricReader, MetricReaders};
pub use mock::{MockCollector, MockFs};
pub use procfs::{LoadCollector, StatCollector};
pub use registry::CollectorRegistry;
pub use traits::{FileSystem, RealFs};
