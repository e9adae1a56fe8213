//! Synthetic collector producing a sawtooth counter.
//!
//! A background thread increments the counter every tick and wraps it back
//! to a small value once it reaches the maximum, so the reported rate is
//! mostly positive with a periodic counter reset.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::collector::lifecycle::{CollectError, Collector, MetricReaders};
use crate::collector::registry::CollectorRegistry;
use crate::ring::{ValueRing, ValueRingFactory};

/// Value at which the counter wraps.
const MAX_MOCK_VALUE: u64 = 15;
/// Value the counter restarts from after wrapping.
const MOCK_RESET_VALUE: u64 = 2;
/// Default generator cadence.
const MOCK_TICK: Duration = Duration::from_millis(333);

/// Registers a mock collector that exposes the `mock` metric.
pub fn register(registry: &mut CollectorRegistry, factory: &ValueRingFactory) {
    registry.register(MockCollector::new(factory));
}

/// Collector backed by an in-process counter.
pub struct MockCollector {
    ring: ValueRing,
    value: Arc<AtomicU64>,
    readers: MetricReaders,
    tick: Duration,
    /// Set once the generator thread is running.
    generator: Option<JoinHandle<()>>,
}

impl MockCollector {
    pub fn new(factory: &ValueRingFactory) -> Self {
        Self {
            ring: factory.new_ring(),
            value: Arc::new(AtomicU64::new(0)),
            readers: MetricReaders::new(),
            tick: MOCK_TICK,
            generator: None,
        }
    }

    /// Overrides the generator cadence.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Current counter value.
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    fn start_generator(&mut self) -> Result<(), CollectError> {
        if self.generator.is_some() {
            return Ok(());
        }
        let value = Arc::downgrade(&self.value);
        let tick = self.tick;
        let handle = thread::Builder::new()
            .name("mock-generator".into())
            .spawn(move || run_generator(value, tick))
            .map_err(|e| CollectError::Init(format!("cannot start generator: {}", e)))?;
        self.generator = Some(handle);
        Ok(())
    }
}

/// Advances the counter until its collector is dropped.
fn run_generator(value: Weak<AtomicU64>, tick: Duration) {
    loop {
        thread::sleep(tick);
        let Some(value) = value.upgrade() else {
            debug!("Mock collector dropped, stopping generator");
            return;
        };
        step(&value);
    }
}

/// Advances the counter by one. Only the generator thread writes it.
fn step(value: &AtomicU64) {
    let next = value.load(Ordering::Relaxed) + 1;
    let next = if next >= MAX_MOCK_VALUE {
        MOCK_RESET_VALUE
    } else {
        next
    };
    value.store(next, Ordering::Relaxed);
}

impl Collector for MockCollector {
    fn name(&self) -> &str {
        "mock"
    }

    fn init(&mut self) -> Result<(), CollectError> {
        let mut readers = MetricReaders::new();
        readers.rate("mock", &self.ring);
        self.readers = readers;
        self.start_generator()
    }

    fn update(&mut self) -> Result<(), CollectError> {
        self.ring.add(self.value() as f64);
        Ok(())
    }

    fn readers(&self) -> &MetricReaders {
        &self.readers
    }
}
