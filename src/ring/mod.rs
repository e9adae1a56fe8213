//! Rate computation over a bounded history of samples.
//!
//! # Architecture
//!
//! ```text
//!   collector (writer)            metric readers (any thread)
//!         │                                │
//!   add / add_to_head / increment     get_diff / get_head
//!         │                                │
//!   ┌─────▼──────┐   flush_head   ┌────────▼────────┐
//!   │ ValueRing  │ ─────────────► │ shared storage  │ ◄── RingReader
//!   │ aggregator │    (locked)    │ head, window    │
//!   └────────────┘                └─────────────────┘
//! ```
//!
//! Rings are allocated by a [`ValueRingFactory`] that owns the capacity and
//! window policy, and timestamped by a [`Clock`].

pub mod clock;
pub mod factory;
pub mod value;
pub mod value_ring;

pub use clock::{Clock, ManualClock, SystemClock};
pub use factory::ValueRingFactory;
pub use value::{Cumulative, DynCumulative, SampleValue, Value};
pub use value_ring::{RingReader, ValueRing};
