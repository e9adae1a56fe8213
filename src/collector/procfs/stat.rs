//! Collector for `/proc/stat`: CPU utilization, context switches and forks.

use std::path::PathBuf;
use std::time::Duration;

use crate::collector::lifecycle::{CollectError, Collector, MetricReaders};
use crate::collector::procfs::parser::{CpuStat, parse_global_stat};
use crate::collector::traits::FileSystem;
use crate::ring::{Cumulative, SampleValue, Value, ValueRing, ValueRingFactory};

/// Busy and total CPU ticks, summed over one or more cores.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTicks {
    pub busy: u64,
    pub total: u64,
}

impl From<&CpuStat> for CpuTicks {
    fn from(cpu: &CpuStat) -> Self {
        let total = cpu.total_ticks();
        Self {
            busy: total.saturating_sub(cpu.idle_ticks()),
            total,
        }
    }
}

impl Cumulative for CpuTicks {
    /// Busy share of the elapsed ticks, in percent. A counter that went
    /// backwards yields a negative value.
    fn diff(&self, previous: &Self, _interval: Duration) -> SampleValue {
        let total = self.total as f64 - previous.total as f64;
        if total <= 0.0 {
            return total;
        }
        let busy = self.busy as f64 - previous.busy as f64;
        busy / total * 100.0
    }

    fn add(&self, other: &Self) -> Self {
        Self {
            busy: self.busy + other.busy,
            total: self.total + other.total,
        }
    }
}

/// Collects system-wide counters from `<proc>/stat`.
///
/// Readers:
/// - `cpu` - busy CPU percent over the ring window, all cores combined
/// - `ctxt` - context switches per second
/// - `procs/forks` - processes created per second
/// - `procs/running`, `procs/blocked` - current process counts
pub struct StatCollector<F: FileSystem> {
    fs: F,
    path: PathBuf,
    cpu: ValueRing,
    ctxt: ValueRing,
    forks: ValueRing,
    running: ValueRing,
    blocked: ValueRing,
    readers: MetricReaders,
}

impl<F: FileSystem> StatCollector<F> {
    /// Creates a new stat collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `factory` - Ring sizing shared with the other collectors
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, factory: &ValueRingFactory) -> Self {
        Self {
            fs,
            path: proc_path.into().join("stat"),
            cpu: factory.new_ring(),
            ctxt: factory.new_ring(),
            forks: factory.new_ring(),
            running: factory.new_ring(),
            blocked: factory.new_ring(),
            readers: MetricReaders::new(),
        }
    }
}

impl<F: FileSystem> Collector for StatCollector<F> {
    fn name(&self) -> &str {
        "stat"
    }

    fn init(&mut self) -> Result<(), CollectError> {
        if !self.fs.exists(&self.path) {
            return Err(CollectError::Init(format!(
                "{} not found",
                self.path.display()
            )));
        }
        let mut readers = MetricReaders::new();
        readers.rate("cpu", &self.cpu);
        readers.rate("ctxt", &self.ctxt);
        readers.rate("procs/forks", &self.forks);
        readers.gauge("procs/running", &self.running);
        readers.gauge("procs/blocked", &self.blocked);
        self.readers = readers;
        Ok(())
    }

    fn update(&mut self) -> Result<(), CollectError> {
        let content = self.fs.read_to_string(&self.path)?;
        let stat = parse_global_stat(&content)?;

        // Fold the per-core counters into one sample. Kernels without
        // per-core lines only report the aggregate.
        let mut cores = 0;
        for cpu in stat.per_cpu() {
            self.cpu.add_to_head(Value::cumulative(CpuTicks::from(cpu)));
            cores += 1;
        }
        if cores == 0
            && let Some(total) = stat.total_cpu()
        {
            self.cpu.add_to_head(Value::cumulative(CpuTicks::from(total)));
        }
        self.cpu.flush_head();

        self.ctxt.add(stat.ctxt as f64);
        self.forks.add(stat.processes as f64);
        self.running.add(stat.procs_running as f64);
        self.blocked.add(stat.procs_blocked as f64);
        Ok(())
    }

    fn readers(&self) -> &MetricReaders {
        &self.readers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::ring::ManualClock;
    use std::sync::Arc;

    fn stat(user: u64, idle: u64, ctxt: u64, processes: u64) -> String {
        format!(
            "cpu  {u2} 0 0 {i2} 0 0 0 0 0 0\n\
             cpu0 {user} 0 0 {idle} 0 0 0 0 0 0\n\
             cpu1 {user} 0 0 {idle} 0 0 0 0 0 0\n\
             ctxt {ctxt}\n\
             processes {processes}\n\
             procs_running 3\n\
             procs_blocked 1\n",
            u2 = user * 2,
            i2 = idle * 2,
        )
    }

    fn setup() -> (StatCollector<MockFs>, MockFs, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let factory =
            ValueRingFactory::with_length(6, Duration::from_secs(1)).with_clock(clock.clone());
        let fs = MockFs::new();
        fs.add_file("/proc/stat", stat(100, 900, 1000, 50));
        let collector = StatCollector::new(fs.clone(), "/proc", &factory);
        (collector, fs, clock)
    }

    #[test]
    fn test_cpu_ticks_diff() {
        let prev = CpuTicks { busy: 100, total: 1000 };
        let cur = CpuTicks { busy: 150, total: 1100 };
        assert_eq!(cur.diff(&prev, Duration::from_secs(1)), 50.0);
        assert_eq!(prev.diff(&prev, Duration::from_secs(1)), 0.0);
        assert!(prev.diff(&cur, Duration::from_secs(1)) < 0.0);
    }

    #[test]
    fn test_cpu_ticks_from_stat() {
        let cpu = CpuStat {
            user: 10,
            system: 5,
            idle: 80,
            iowait: 5,
            ..Default::default()
        };
        assert_eq!(CpuTicks::from(&cpu), CpuTicks { busy: 15, total: 100 });
    }

    #[test]
    fn test_init_requires_stat_file() {
        let factory = ValueRingFactory::default();
        let mut collector = StatCollector::new(MockFs::new(), "/proc", &factory);
        assert!(matches!(collector.init(), Err(CollectError::Init(_))));
    }

    #[test]
    fn test_readers() {
        let (mut collector, _fs, _clock) = setup();
        collector.init().unwrap();
        let names: Vec<_> = collector.readers().names().collect();
        assert_eq!(
            names,
            vec!["cpu", "ctxt", "procs/blocked", "procs/forks", "procs/running"]
        );
    }

    #[test]
    fn test_rates() {
        let (mut collector, fs, clock) = setup();
        collector.init().unwrap();
        collector.update().unwrap();

        clock.advance(Duration::from_secs(1));
        fs.add_file("/proc/stat", stat(130, 970, 1500, 60));
        collector.update().unwrap();

        let readers = collector.readers();
        assert_eq!(readers.read("cpu"), Some(30.0));
        assert_eq!(readers.read("ctxt"), Some(500.0));
        assert_eq!(readers.read("procs/forks"), Some(10.0));
        assert_eq!(readers.read("procs/running"), Some(3.0));
        assert_eq!(readers.read("procs/blocked"), Some(1.0));
    }

    #[test]
    fn test_per_core_ticks_are_summed() {
        let (mut collector, _fs, _clock) = setup();
        collector.init().unwrap();
        collector.update().unwrap();

        let head = collector.cpu.get_head().unwrap();
        assert_eq!(
            head.downcast_ref::<CpuTicks>(),
            Some(&CpuTicks {
                busy: 200,
                total: 2000
            })
        );
    }

    #[test]
    fn test_aggregate_only_stat() {
        let (mut collector, fs, _clock) = setup();
        fs.add_file("/proc/stat", "cpu 10 0 0 90 0 0 0 0\nctxt 1\n");
        collector.init().unwrap();
        collector.update().unwrap();

        let head = collector.cpu.get_head().unwrap();
        assert_eq!(
            head.downcast_ref::<CpuTicks>(),
            Some(&CpuTicks {
                busy: 10,
                total: 100
            })
        );
    }

    #[test]
    fn test_update_failure_is_reported() {
        let (mut collector, fs, _clock) = setup();
        collector.init().unwrap();

        fs.remove_file("/proc/stat");
        assert!(matches!(collector.update(), Err(CollectError::Io(_))));

        fs.add_file("/proc/stat", "garbage\n");
        assert!(matches!(collector.update(), Err(CollectError::Parse(_))));

        fs.add_file("/proc/stat", stat(100, 900, 1000, 50));
        assert!(collector.update().is_ok());
    }
}
