//! Collector lifecycle shared by every metric source.
//!
//! A collector goes through three states:
//!
//! 1. constructed - created and registered, nothing read yet;
//! 2. initialized - [`Collector::init`] succeeded, readers are registered and
//!    any background task has been started;
//! 3. active - [`Collector::update`] is called on every collection cycle.
//!
//! All I/O happens in `update`. Readers only look at rings and must never
//! block on the source.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::ring::{SampleValue, ValueRing};

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading the source.
    Io(std::io::Error),
    /// Source data could not be parsed.
    Parse(String),
    /// Collector cannot be set up; it will not be scheduled.
    Init(String),
    /// Source-specific failure during an update.
    Source(String),
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::Init(msg) => write!(f, "init failed: {}", msg),
            CollectError::Source(msg) => write!(f, "source error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// Zero-argument callable producing the current value of one metric.
pub type MetricReader = Arc<dyn Fn() -> SampleValue + Send + Sync>;

/// Readers exposed by a collector, keyed by metric name.
#[derive(Clone, Default)]
pub struct MetricReaders {
    readers: BTreeMap<String, MetricReader>,
}

impl MetricReaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `reader` under `name`, replacing an earlier reader with the
    /// same name.
    pub fn insert<R>(&mut self, name: impl Into<String>, reader: R)
    where
        R: Fn() -> SampleValue + Send + Sync + 'static,
    {
        let name = name.into();
        if self.readers.insert(name.clone(), Arc::new(reader)).is_some() {
            warn!("Metric reader '{}' registered twice, keeping the latest", name);
        }
    }

    /// Registers a reader reporting the rate of change of `ring`.
    pub fn rate(&mut self, name: impl Into<String>, ring: &ValueRing) {
        let reader = ring.reader();
        self.insert(name, move || reader.get_diff());
    }

    /// Registers a reader reporting the newest scalar value of `ring`.
    pub fn gauge(&mut self, name: impl Into<String>, ring: &ValueRing) {
        let reader = ring.reader();
        self.insert(name, move || reader.get_head_scalar());
    }

    pub fn get(&self, name: &str) -> Option<&MetricReader> {
        self.readers.get(name)
    }

    /// Invokes the reader registered under `name`.
    pub fn read(&self, name: &str) -> Option<SampleValue> {
        self.readers.get(name).map(|reader| reader())
    }

    /// Metric names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.readers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricReader)> {
        self.readers.iter().map(|(name, reader)| (name.as_str(), reader))
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}

impl fmt::Debug for MetricReaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.readers.keys()).finish()
    }
}

/// Lifecycle state of a collector, tracked by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Constructed,
    Initialized,
    Active,
}

/// A pluggable source of metric values.
///
/// The scheduler calls [`init`](Collector::init) once at startup and
/// [`update`](Collector::update) on every collection cycle from a single
/// thread. Readers returned by [`readers`](Collector::readers) may be
/// invoked concurrently from other threads.
pub trait Collector: Send {
    /// Collector name, used for logging.
    fn name(&self) -> &str;

    /// Registers readers and starts background work.
    ///
    /// Must be idempotent: a second call re-registers readers but never
    /// starts a second background task.
    ///
    /// # Errors
    ///
    /// An error excludes the collector from scheduling for the rest of the
    /// process lifetime.
    fn init(&mut self) -> Result<(), CollectError>;

    /// Reads the source and pushes fresh values into the collector's rings.
    ///
    /// # Errors
    ///
    /// Errors are transient: the collector stays scheduled and is retried on
    /// the next cycle.
    fn update(&mut self) -> Result<(), CollectError>;

    /// Readers registered by the last successful `init`.
    fn readers(&self) -> &MetricReaders;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::{ManualClock, ValueRingFactory};
    use std::time::Duration;

    #[test]
    fn test_insert_and_read() {
        let mut readers = MetricReaders::new();
        readers.insert("answer", || 42.0);
        readers.insert("zero", || 0.0);

        assert_eq!(readers.len(), 2);
        assert_eq!(readers.read("answer"), Some(42.0));
        assert_eq!(readers.read("missing"), None);
        assert_eq!(readers.names().collect::<Vec<_>>(), vec!["answer", "zero"]);
    }

    #[test]
    fn test_duplicate_name_replaces_reader() {
        let mut readers = MetricReaders::new();
        readers.insert("m", || 1.0);
        readers.insert("m", || 2.0);
        assert_eq!(readers.len(), 1);
        assert_eq!(readers.read("m"), Some(2.0));
    }

    #[test]
    fn test_ring_readers() {
        let clock = Arc::new(ManualClock::new());
        let factory = ValueRingFactory::with_length(4, Duration::from_secs(1)).with_clock(clock.clone());
        let mut ring = factory.new_ring();

        let mut readers = MetricReaders::new();
        readers.rate("bytes", &ring);
        readers.gauge("bytes/total", &ring);

        ring.add(100.0);
        clock.advance(Duration::from_secs(1));
        ring.add(300.0);

        assert_eq!(readers.read("bytes"), Some(200.0));
        assert_eq!(readers.read("bytes/total"), Some(300.0));
    }

    #[test]
    fn test_collect_error_display() {
        let err = CollectError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "I/O error: gone");
        assert!(std::error::Error::source(&err).is_some());

        assert_eq!(CollectError::Parse("bad line".into()).to_string(), "parse error: bad line");
        assert_eq!(CollectError::Init("x".into()).to_string(), "init failed: x");
    }
}
