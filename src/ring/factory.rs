//! Central sizing policy for value rings.

use std::sync::Arc;
use std::time::Duration;

use crate::ring::clock::{Clock, SystemClock};
use crate::ring::value_ring::ValueRing;

/// Builds rings that share one capacity, window and clock.
///
/// One factory is shared by all collectors so that the buffering policy is
/// decided in a single place.
#[derive(Clone)]
pub struct ValueRingFactory {
    length: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl ValueRingFactory {
    /// Smallest usable ring: the newest sample plus one to diff against.
    pub const MIN_LENGTH: usize = 2;

    /// Sizes rings to hold three windows worth of samples taken every
    /// `collect_interval`, leaving headroom for scheduling jitter.
    pub fn new(window: Duration, collect_interval: Duration) -> Self {
        let per_window = if collect_interval.is_zero() {
            0
        } else {
            (window.as_nanos() / collect_interval.as_nanos()) as usize
        };
        Self::with_length(per_window.saturating_mul(3), window)
    }

    /// Uses an explicit ring capacity.
    pub fn with_length(length: usize, window: Duration) -> Self {
        Self {
            length: length.max(Self::MIN_LENGTH),
            window,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used to timestamp samples of rings built afterwards.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Allocates a new, empty ring.
    pub fn new_ring(&self) -> ValueRing {
        ValueRing::new(self.length, self.window, Arc::clone(&self.clock))
    }
}

impl Default for ValueRingFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::clock::ManualClock;

    #[test]
    fn test_length_from_intervals() {
        let factory = ValueRingFactory::new(Duration::from_secs(1), Duration::from_millis(500));
        assert_eq!(factory.length(), 6);
        assert_eq!(factory.window(), Duration::from_secs(1));

        let factory = ValueRingFactory::new(Duration::from_secs(10), Duration::from_secs(1));
        assert_eq!(factory.length(), 30);
    }

    #[test]
    fn test_minimum_length() {
        let factory = ValueRingFactory::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(factory.length(), ValueRingFactory::MIN_LENGTH);

        let factory = ValueRingFactory::new(Duration::from_secs(1), Duration::ZERO);
        assert_eq!(factory.length(), ValueRingFactory::MIN_LENGTH);

        let factory = ValueRingFactory::with_length(0, Duration::from_secs(1));
        assert_eq!(factory.length(), ValueRingFactory::MIN_LENGTH);
    }

    #[test]
    fn test_new_ring_uses_factory_settings() {
        let clock = Arc::new(ManualClock::new());
        let factory = ValueRingFactory::with_length(5, Duration::from_secs(2)).with_clock(clock.clone());

        let mut ring = factory.new_ring();
        assert_eq!(ring.capacity(), 5);
        assert_eq!(ring.window(), Duration::from_secs(2));

        ring.add(0.0);
        clock.advance(Duration::from_secs(2));
        ring.add(8.0);
        assert_eq!(ring.get_diff(), 4.0);
    }

    #[test]
    fn test_rings_are_independent() {
        let factory = ValueRingFactory::default();
        let mut a = factory.new_ring();
        let b = factory.new_ring();
        a.add(1.0);
        assert!(b.get_head().is_none());
    }
}
