//! Owned list of collectors assembled at startup.

use crate::collector::lifecycle::Collector;

/// Collectors registered during startup, in registration order.
///
/// Append-only: collectors are never removed. Initialization and scheduling
/// happen later in [`CollectorSource`](crate::source::CollectorSource).
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a collector. No deduplication is performed.
    pub fn register(&mut self, collector: impl Collector + 'static) {
        self.register_boxed(Box::new(collector));
    }

    pub fn register_boxed(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Collector names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Hands the collectors over to the scheduler.
    pub fn into_collectors(self) -> Vec<Box<dyn Collector>> {
        self.collectors
    }
}
