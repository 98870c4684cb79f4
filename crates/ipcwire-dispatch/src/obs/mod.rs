//! In-process metrics rendered in Prometheus text format.
//!
//! Stored as atomics behind `DashMap`; the host decides where to expose the
//! rendered text.

pub mod metrics;

pub use metrics::{CounterVec, DispatchMetrics, GaugeVec, HistogramVec};
