//! Drives registered collectors and emits their metrics as samples.
//!
//! The source is the boundary between the collectors and the downstream
//! pipeline:
//!
//! - [`ActiveCollectors::init`] initializes every registered collector once and
//!   keeps only those whose `init` succeeded.
//! - [`ActiveCollectors::update_all`] runs one collection cycle. Failing
//!   collectors are logged and retried on the next cycle.
//! - [`Emitter`] polls the metric readers and builds [`Sample`]s.
//! - [`CollectorSource::run`] wires both loops together: updates on a
//!   background thread every `collect_interval`, samples on the calling
//!   thread every `sink_interval`.

pub mod filter;
pub mod sink;

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::collector::{Collector, CollectorRegistry, CollectorState, MetricReader};

pub use filter::MetricFilter;
pub use sink::{ConsoleSink, Header, MemorySink, Sample, SampleSink};

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub updated: usize,
    pub failed: usize,
}

/// Collectors that passed initialization, with their lifecycle state.
pub struct ActiveCollectors {
    collectors: Vec<(Box<dyn Collector>, CollectorState)>,
    cycles: Arc<AtomicU64>,
}

impl ActiveCollectors {
    /// Initializes the registered collectors in registration order.
    ///
    /// Collectors whose `init` fails are dropped for the rest of the process
    /// lifetime.
    pub fn init(registry: CollectorRegistry) -> Self {
        let mut collectors = Vec::new();
        for mut collector in registry.into_collectors() {
            match collector.init() {
                Ok(()) => {
                    debug!(
                        "Collector {}: initialized with {} metrics",
                        collector.name(),
                        collector.readers().len()
                    );
                    collectors.push((collector, CollectorState::Initialized));
                }
                Err(e) => {
                    warn!("Collector {}: disabled ({})", collector.name(), e);
                }
            }
        }
        Self {
            collectors,
            cycles: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Runs `update` on every collector and signals that fresh values are
    /// available to readers.
    pub fn update_all(&mut self) -> UpdateReport {
        let mut report = UpdateReport::default();
        for (collector, state) in &mut self.collectors {
            match collector.update() {
                Ok(()) => {
                    *state = CollectorState::Active;
                    report.updated += 1;
                }
                Err(e) => {
                    warn!("Collector {}: update failed ({})", collector.name(), e);
                    report.failed += 1;
                }
            }
        }
        self.cycles.fetch_add(1, Ordering::Release);
        report
    }

    /// Number of completed collection cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Names and states of the active collectors.
    pub fn states(&self) -> Vec<(&str, CollectorState)> {
        self.collectors
            .iter()
            .map(|(c, state)| (c.name(), *state))
            .collect()
    }

    /// All metric names exposed by the active collectors.
    pub fn metric_names(&self) -> Vec<String> {
        self.collectors
            .iter()
            .flat_map(|(c, _)| c.readers().names().map(str::to_string))
            .collect()
    }

    /// Builds an emitter for the metrics accepted by `filter`.
    ///
    /// A metric name exposed by more than one collector is emitted once,
    /// from the collector registered first.
    pub fn emitter(&self, filter: &MetricFilter) -> Emitter {
        let mut fields: Vec<String> = Vec::new();
        let mut readers = Vec::new();
        for (collector, _) in &self.collectors {
            for (name, reader) in collector.readers().iter() {
                if !filter.accepts(name) {
                    continue;
                }
                if fields.iter().any(|f| f == name) {
                    warn!(
                        "Metric {} of collector {} is already provided, skipping",
                        name,
                        collector.name()
                    );
                    continue;
                }
                fields.push(name.to_string());
                readers.push(Arc::clone(reader));
            }
        }
        Emitter {
            header: Header { fields },
            readers,
            cycles: Arc::clone(&self.cycles),
        }
    }
}

/// Reads the selected metrics into samples.
#[derive(Clone)]
pub struct Emitter {
    header: Header,
    readers: Vec<MetricReader>,
    cycles: Arc<AtomicU64>,
}

impl Emitter {
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Reads every metric now. Returns `None` until the first collection
    /// cycle has completed.
    pub fn sample(&self) -> Option<Sample> {
        if self.cycles.load(Ordering::Acquire) == 0 {
            return None;
        }
        Some(Sample {
            time: Utc::now(),
            values: self.readers.iter().map(|read| read()).collect(),
        })
    }
}

/// Collector scheduling configuration.
pub struct CollectorSource {
    registry: CollectorRegistry,
    collect_interval: Duration,
    sink_interval: Duration,
    filter: MetricFilter,
}

impl CollectorSource {
    pub fn new(
        registry: CollectorRegistry,
        collect_interval: Duration,
        sink_interval: Duration,
    ) -> Self {
        Self {
            registry,
            collect_interval,
            sink_interval,
            filter: MetricFilter::with_defaults(),
        }
    }

    pub fn with_filter(mut self, filter: MetricFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Initializes the collectors and writes the names of the metrics that
    /// would be emitted, one per line.
    pub fn print_metrics(self, out: &mut impl Write) -> io::Result<()> {
        let active = ActiveCollectors::init(self.registry);
        let emitter = active.emitter(&self.filter);
        for field in &emitter.header().fields {
            writeln!(out, "{}", field)?;
        }
        Ok(())
    }

    /// Collects and emits samples until `running` is cleared.
    ///
    /// Sink errors are logged and do not stop collection.
    pub fn run(self, sink: &mut dyn SampleSink, running: Arc<AtomicBool>) -> io::Result<()> {
        let mut active = ActiveCollectors::init(self.registry);
        let emitter = active.emitter(&self.filter);
        info!(
            "Collecting {} metrics from {} collectors",
            emitter.header().fields.len(),
            active.len()
        );
        if emitter.header().fields.is_empty() {
            warn!("No metrics selected for output");
        }

        let collect_interval = self.collect_interval;
        let updates_running = Arc::clone(&running);
        let updater = thread::Builder::new()
            .name("collector-updates".into())
            .spawn(move || {
                while updates_running.load(Ordering::SeqCst) {
                    let report = active.update_all();
                    debug!(
                        "Cycle {}: {} updated, {} failed",
                        active.cycles(),
                        report.updated,
                        report.failed
                    );
                    sleep_while_running(collect_interval, &updates_running);
                }
            })?;

        while running.load(Ordering::SeqCst) {
            if let Some(sample) = emitter.sample()
                && let Err(e) = sink.sink(emitter.header(), &sample)
            {
                error!("Failed to write sample: {}", e);
            }
            sleep_while_running(self.sink_interval, &running);
        }

        if updater.join().is_err() {
            error!("Collector update thread panicked");
        }
        Ok(())
    }
}

/// Sleeps for `duration` in short slices, returning early on shutdown.
fn sleep_while_running(duration: Duration, running: &AtomicBool) {
    let slice = Duration::from_millis(100);
    let mut remaining = duration;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let sleep_time = remaining.min(slice);
        thread::sleep(sleep_time);
        remaining = remaining.saturating_sub(sleep_time);
    }
}
