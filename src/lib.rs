//! flowmon - sampling core of a metrics collection agent.
//!
//! This library provides:
//! - `ring` - fixed-size rings of timestamped samples answering "what was the
//!   average rate of change over the last N seconds"
//! - `collector` - the collector lifecycle, registry and built-in collectors
//! - `source` - scheduling of collector updates and emission of samples
//!
//! The `flowmond` daemon wires these together.

pub mod collector;
pub mod ring;
pub mod source;
