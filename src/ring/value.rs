//! Sample values stored in a value ring.
//!
//! A [`Value`] is either a plain scalar or a source-defined cumulative state
//! (for example a set of CPU tick counters). Both variants support the two
//! operations the ring needs: rate of change over an interval and
//! accumulation with another value of the same kind.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;

/// Numeric type of every metric surfaced to the emission layer.
pub type SampleValue = f64;

/// Stateful value defined by a metric source.
///
/// Implementors only ever see values of their own type: the ring refuses to
/// combine two different cumulative types and logs the mismatch instead.
pub trait Cumulative: fmt::Debug + Send + Sync + 'static {
    /// Rate of change from `previous` to `self` over `interval`.
    ///
    /// `interval` is never zero.
    fn diff(&self, previous: &Self, interval: Duration) -> SampleValue;

    /// Sum of `self` and `other`.
    fn add(&self, other: &Self) -> Self
    where
        Self: Sized;
}

/// Object-safe form of [`Cumulative`], implemented for every `Cumulative` type.
///
/// Returns `None` when the other operand is of a different concrete type.
pub trait DynCumulative: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
    fn dyn_diff(&self, previous: &dyn DynCumulative, interval: Duration) -> Option<SampleValue>;
    fn dyn_add(&self, other: &dyn DynCumulative) -> Option<Arc<dyn DynCumulative>>;
}

impl<T: Cumulative> DynCumulative for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn dyn_diff(&self, previous: &dyn DynCumulative, interval: Duration) -> Option<SampleValue> {
        let previous = previous.as_any().downcast_ref::<T>()?;
        Some(self.diff(previous, interval))
    }

    fn dyn_add(&self, other: &dyn DynCumulative) -> Option<Arc<dyn DynCumulative>> {
        let other = other.as_any().downcast_ref::<T>()?;
        let sum: Arc<dyn DynCumulative> = Arc::new(self.add(other));
        Some(sum)
    }
}

/// A value recorded in a ring.
#[derive(Clone)]
pub enum Value {
    /// Plain numeric magnitude.
    Scalar(SampleValue),
    /// Opaque source-defined state.
    Cumulative(Arc<dyn DynCumulative>),
}

impl Value {
    /// Wraps a source-defined cumulative value.
    pub fn cumulative<T: Cumulative>(value: T) -> Self {
        Value::Cumulative(Arc::new(value))
    }

    /// Returns the scalar magnitude, or `None` for cumulative values.
    pub fn as_scalar(&self) -> Option<SampleValue> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Cumulative(_) => None,
        }
    }

    /// Returns the cumulative state downcast to `T`, if it is one.
    pub fn downcast_ref<T: Cumulative>(&self) -> Option<&T> {
        match self {
            Value::Scalar(_) => None,
            Value::Cumulative(c) => c.as_any().downcast_ref::<T>(),
        }
    }

    /// Rate of change from `previous` to `self` over `interval`.
    ///
    /// A zero interval yields `0`. Values of different kinds cannot be
    /// compared: the mismatch is logged and `0` is returned.
    pub fn difference(&self, previous: &Value, interval: Duration) -> SampleValue {
        if interval.is_zero() {
            return 0.0;
        }
        let result = match (self, previous) {
            (Value::Scalar(cur), Value::Scalar(prev)) => Some((cur - prev) / interval.as_secs_f64()),
            (Value::Cumulative(cur), Value::Cumulative(prev)) => {
                cur.dyn_diff(&**prev, interval)
            }
            _ => None,
        };
        result.unwrap_or_else(|| {
            error!("Cannot diff {:?} and {:?}", self, previous);
            0.0
        })
    }

    /// Sum of `self` and `other`.
    ///
    /// Values of different kinds cannot be added: the mismatch is logged and
    /// a zero scalar is returned.
    pub fn accumulate(&self, other: &Value) -> Value {
        let result = match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Some(Value::Scalar(a + b)),
            (Value::Cumulative(a), Value::Cumulative(b)) => {
                a.dyn_add(&**b).map(Value::Cumulative)
            }
            _ => None,
        };
        result.unwrap_or_else(|| {
            error!("Cannot add {:?} and {:?}", self, other);
            Value::Scalar(0.0)
        })
    }
}

impl From<SampleValue> for Value {
    fn from(v: SampleValue) -> Self {
        Value::Scalar(v)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "Scalar({})", v),
            Value::Cumulative(c) => write!(f, "Cumulative<{}>({:?})", c.type_name(), c),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::Cumulative(a), Value::Cumulative(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Bytes {
        read: u64,
        written: u64,
    }

    impl Cumulative for Bytes {
        fn diff(&self, previous: &Self, interval: Duration) -> SampleValue {
            let total = (self.read + self.written) as f64 - (previous.read + previous.written) as f64;
            total / interval.as_secs_f64()
        }

        fn add(&self, other: &Self) -> Self {
            Bytes {
                read: self.read + other.read,
                written: self.written + other.written,
            }
        }
    }

    #[derive(Debug)]
    struct Other;

    impl Cumulative for Other {
        fn diff(&self, _previous: &Self, _interval: Duration) -> SampleValue {
            1.0
        }

        fn add(&self, _other: &Self) -> Self {
            Other
        }
    }

    #[test]
    fn test_scalar_difference() {
        let cur = Value::Scalar(200.0);
        let prev = Value::Scalar(100.0);
        assert_eq!(cur.difference(&prev, Duration::from_secs(2)), 50.0);
        assert_eq!(cur.difference(&prev, Duration::from_millis(500)), 200.0);
    }

    #[test]
    fn test_zero_interval_yields_zero() {
        let cur = Value::Scalar(200.0);
        let prev = Value::Scalar(100.0);
        assert_eq!(cur.difference(&prev, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_scalar_accumulate() {
        let sum = Value::Scalar(1.5).accumulate(&Value::Scalar(2.5));
        assert_eq!(sum, Value::Scalar(4.0));
    }

    #[test]
    fn test_cumulative_operations() {
        let a = Value::cumulative(Bytes { read: 10, written: 5 });
        let b = Value::cumulative(Bytes { read: 30, written: 25 });

        assert_eq!(b.difference(&a, Duration::from_secs(4)), 10.0);

        let sum = a.accumulate(&b);
        assert_eq!(
            sum.downcast_ref::<Bytes>(),
            Some(&Bytes {
                read: 40,
                written: 30
            })
        );
    }

    #[test]
    fn test_mismatched_variants() {
        let scalar = Value::Scalar(5.0);
        let bytes = Value::cumulative(Bytes { read: 1, written: 1 });

        assert_eq!(scalar.difference(&bytes, Duration::from_secs(1)), 0.0);
        assert_eq!(bytes.difference(&scalar, Duration::from_secs(1)), 0.0);
        assert_eq!(scalar.accumulate(&bytes), Value::Scalar(0.0));
        assert_eq!(bytes.accumulate(&scalar), Value::Scalar(0.0));
    }

    #[test]
    fn test_mismatched_cumulative_types() {
        let bytes = Value::cumulative(Bytes { read: 1, written: 1 });
        let other = Value::cumulative(Other);

        assert_eq!(bytes.difference(&other, Duration::from_secs(1)), 0.0);
        assert_eq!(other.accumulate(&bytes), Value::Scalar(0.0));
    }

    #[test]
    fn test_as_scalar() {
        assert_eq!(Value::from(3.0).as_scalar(), Some(3.0));
        assert_eq!(Value::cumulative(Other).as_scalar(), None);
    }
}
