//! Rolling analytics over the time-ordered indices.

pub mod aggregator;

pub use aggregator::{Analytics, Snapshot, Totals, TrendPoint, WindowCounts};
