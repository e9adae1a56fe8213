//! Samples handed to the downstream pipeline, and the sinks receiving them.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ring::SampleValue;

/// Metric names of the samples produced by one emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub fields: Vec<String>,
}

/// One row of metric values, in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub values: Vec<SampleValue>,
}

/// Consumer of emitted samples.
pub trait SampleSink {
    fn sink(&mut self, header: &Header, sample: &Sample) -> io::Result<()>;
}

/// JSON form of one sample: `time` plus one key per metric.
#[derive(Serialize)]
struct Record<'a> {
    time: &'a DateTime<Utc>,
    #[serde(flatten)]
    values: BTreeMap<&'a str, SampleValue>,
}

impl<'a> Record<'a> {
    fn new(header: &'a Header, sample: &'a Sample) -> Self {
        let values = header
            .fields
            .iter()
            .map(String::as_str)
            .zip(sample.values.iter().copied())
            .collect();
        Self {
            time: &sample.time,
            values,
        }
    }
}

/// Writes one JSON object per sample, keyed by metric name.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> SampleSink for ConsoleSink<W> {
    fn sink(&mut self, header: &Header, sample: &Sample) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, &Record::new(header, sample))?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Keeps every sample in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Arc<Mutex<Vec<(Header, Sample)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<(Header, Sample)> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleSink for MemorySink {
    fn sink(&mut self, header: &Header, sample: &Sample) -> io::Result<()> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((header.clone(), sample.clone()));
        Ok(())
    }
}
