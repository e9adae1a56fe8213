//! Collector for `/proc/loadavg`.

use std::path::PathBuf;

use crate::collector::lifecycle::{CollectError, Collector, MetricReaders};
use crate::collector::procfs::parser::parse_loadavg;
use crate::collector::traits::FileSystem;
use crate::ring::{ValueRing, ValueRingFactory};

/// Reports the kernel load averages as gauges (`load/1`, `load/5`, `load/15`).
pub struct LoadCollector<F: FileSystem> {
    fs: F,
    path: PathBuf,
    load1: ValueRing,
    load5: ValueRing,
    load15: ValueRing,
    readers: MetricReaders,
}

impl<F: FileSystem> LoadCollector<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, factory: &ValueRingFactory) -> Self {
        Self {
            fs,
            path: proc_path.into().join("loadavg"),
            load1: factory.new_ring(),
            load5: factory.new_ring(),
            load15: factory.new_ring(),
            readers: MetricReaders::new(),
        }
    }
}

impl<F: FileSystem> Collector for LoadCollector<F> {
    fn name(&self) -> &str {
        "load"
    }

    fn init(&mut self) -> Result<(), CollectError> {
        if !self.fs.exists(&self.path) {
            return Err(CollectError::Init(format!(
                "{} not found",
                self.path.display()
            )));
        }
        let mut readers = MetricReaders::new();
        readers.gauge("load/1", &self.load1);
        readers.gauge("load/5", &self.load5);
        readers.gauge("load/15", &self.load15);
        self.readers = readers;
        Ok(())
    }

    fn update(&mut self) -> Result<(), CollectError> {
        let content = self.fs.read_to_string(&self.path)?;
        let load = parse_loadavg(&content)?;
        self.load1.add(load.load1);
        self.load5.add(load.load5);
        self.load15.add(load.load15);
        Ok(())
    }

    fn readers(&self) -> &MetricReaders {
        &self.readers
    }
}
