//! Fixed-capacity ring of timestamped values with windowed rate lookup.
//!
//! The ring is split into a writer and any number of readers:
//!
//! - [`ValueRing`] is owned by the collector that produces the values. All
//!   mutating operations take `&mut self`, so there is exactly one writer per
//!   ring. Values merged with [`ValueRing::add_to_head`] stay in a private
//!   accumulator until [`ValueRing::flush_head`] commits them.
//! - [`RingReader`] is a cheap clonable handle used by metric readers on other
//!   threads. It only sees committed samples.
//!
//! Committed storage is guarded by one mutex shared by `flush_head`,
//! `get_diff` and `get_head`, so readers never observe a half-written slot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::ring::clock::Clock;
use crate::ring::value::{SampleValue, Value};

/// One slot of the ring. `value == None` marks a slot with no sample.
#[derive(Debug, Clone)]
struct TimedValue {
    timestamp: Instant,
    value: Option<Value>,
}

/// Committed part of a ring, shared between the writer and its readers.
#[derive(Debug)]
struct RingState {
    values: Vec<TimedValue>,
    /// Index of the next slot to write (one past the newest sample).
    head: usize,
    window: Duration,
    /// Last non-negative rate, reused while recovering from a counter reset.
    previous_diff: SampleValue,
    /// Set after a counter reset until the history spans a window again.
    recovering: bool,
}

impl RingState {
    fn capacity(&self) -> usize {
        self.values.len()
    }

    fn newest_index(&self) -> usize {
        (self.head + self.capacity() - 1) % self.capacity()
    }

    fn newest(&self) -> &TimedValue {
        &self.values[self.newest_index()]
    }

    /// Walks backward from the newest slot and returns the first sample
    /// strictly older than `before`. If an empty slot (or the end of the ring)
    /// is reached first, returns the oldest sample seen on the way.
    fn get(&self, before: Option<Instant>) -> Option<&TimedValue> {
        let cap = self.capacity();
        let mut result = None;
        for step in 1..=cap {
            let slot = &self.values[(self.head + cap - step) % cap];
            if slot.value.is_none() {
                break;
            }
            result = Some(slot);
            if before.is_some_and(|before| slot.timestamp < before) {
                break;
            }
        }
        result
    }

    /// Rate between the head and the sample at the start of the window, or
    /// `None` while the history does not cover the window.
    fn diff_over_window(&self) -> Option<SampleValue> {
        let head = self.newest();
        let head_value = head.value.as_ref()?;
        let before = head.timestamp.checked_sub(self.window)?;
        let previous = self.get(Some(before))?;
        let previous_value = previous.value.as_ref()?;
        if previous.timestamp > before {
            return None;
        }
        let interval = head.timestamp.duration_since(previous.timestamp);
        if interval.is_zero() {
            return None;
        }
        Some(head_value.difference(previous_value, interval))
    }

    fn get_diff(&mut self) -> SampleValue {
        match self.diff_over_window() {
            Some(diff) if diff < 0.0 => {
                // A source counter wrapped or was reset. Keep reporting the
                // last good rate and restart the history from the newest
                // sample.
                debug!(
                    "Negative rate {} (counter reset?), keeping previous rate {}",
                    diff, self.previous_diff
                );
                self.flush_history();
                self.recovering = true;
                self.previous_diff
            }
            Some(diff) => {
                self.recovering = false;
                self.previous_diff = diff;
                diff
            }
            None if self.recovering => self.previous_diff,
            None => {
                self.previous_diff = 0.0;
                0.0
            }
        }
    }

    /// Clears every sample older than the newest one, walking backward from
    /// the second newest slot until an empty slot is found.
    fn flush_history(&mut self) {
        let cap = self.capacity();
        let start = (self.head + cap - 2) % cap;
        for step in 0..cap - 1 {
            let slot = &mut self.values[(start + cap - step) % cap];
            if slot.value.is_none() {
                return;
            }
            slot.value = None;
        }
    }

    fn commit(&mut self, timestamp: Instant, value: Option<Value>) {
        let head = self.head;
        self.values[head] = TimedValue { timestamp, value };
        self.head = (head + 1) % self.capacity();
    }

    fn history(&self) -> Vec<Value> {
        let cap = self.capacity();
        (1..=cap)
            .map(|step| &self.values[(self.head + cap - step) % cap])
            .map_while(|slot| slot.value.clone())
            .collect()
    }
}

fn lock(shared: &Mutex<RingState>) -> MutexGuard<'_, RingState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writer side of a value ring.
///
/// Created by [`ValueRingFactory::new_ring`](crate::ring::ValueRingFactory::new_ring).
pub struct ValueRing {
    shared: Arc<Mutex<RingState>>,
    aggregator: Option<Value>,
    clock: Arc<dyn Clock>,
}

impl ValueRing {
    pub(crate) fn new(capacity: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let created = clock.now();
        let state = RingState {
            values: vec![
                TimedValue {
                    timestamp: created,
                    value: None,
                };
                capacity
            ],
            head: 0,
            window,
            previous_diff: 0.0,
            recovering: false,
        };
        Self {
            shared: Arc::new(Mutex::new(state)),
            aggregator: None,
            clock,
        }
    }

    /// Returns a read-only handle to the committed samples.
    pub fn reader(&self) -> RingReader {
        RingReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Merges `value` into the pending sample without committing it.
    pub fn add_to_head(&mut self, value: impl Into<Value>) {
        let value = value.into();
        self.aggregator = Some(match self.aggregator.take() {
            Some(pending) => pending.accumulate(&value),
            None => value,
        });
    }

    /// Commits the pending sample (or an empty slot if nothing was added)
    /// with the current timestamp and advances the head.
    pub fn flush_head(&mut self) {
        let value = self.aggregator.take();
        let timestamp = self.clock.now();
        lock(&self.shared).commit(timestamp, value);
    }

    /// Records one sample now.
    pub fn add(&mut self, value: impl Into<Value>) {
        self.add_to_head(value);
        self.flush_head();
    }

    /// Adds `delta` to the newest committed value and records the sum now.
    pub fn increment(&mut self, delta: impl Into<Value>) {
        let delta = delta.into();
        let value = match self.get_head() {
            Some(current) => current.accumulate(&delta),
            None => delta,
        };
        self.add(value);
    }

    /// Average rate of change over the configured window.
    pub fn get_diff(&self) -> SampleValue {
        lock(&self.shared).get_diff()
    }

    /// Most recently committed value, if any.
    pub fn get_head(&self) -> Option<Value> {
        lock(&self.shared).newest().value.clone()
    }

    pub fn capacity(&self) -> usize {
        lock(&self.shared).capacity()
    }

    pub fn window(&self) -> Duration {
        lock(&self.shared).window
    }
}

/// Read-only handle to a ring's committed samples.
#[derive(Clone)]
pub struct RingReader {
    shared: Arc<Mutex<RingState>>,
}

impl RingReader {
    /// Average rate of change over the configured window.
    ///
    /// A negative rate is treated as a counter reset: older samples are
    /// dropped and the previous rate is returned instead.
    pub fn get_diff(&self) -> SampleValue {
        lock(&self.shared).get_diff()
    }

    /// Most recently committed value, if any.
    pub fn get_head(&self) -> Option<Value> {
        lock(&self.shared).newest().value.clone()
    }

    /// Newest committed value as a scalar, `0` if absent or not a scalar.
    pub fn get_head_scalar(&self) -> SampleValue {
        self.get_head()
            .and_then(|v| v.as_scalar())
            .unwrap_or(0.0)
    }

    /// Contiguous committed values, newest first.
    pub fn history(&self) -> Vec<Value> {
        lock(&self.shared).history()
    }
}
