//! # lambdastat collector
//!
//! Pulls per-resource metric statistics from a monitoring API, merges the
//! series of every tracked metric into one event per timestamp and forwards
//! the events to a sink.
//!
//! ## Architecture
//!
//! - **`range`**: time windows, sampling intervals and the partitioning of long
//!   windows into queries the API can answer
//! - **`api`**: the [`MetricsApi`] seam and its HTTP client
//! - **`fetcher`**: one sorted [`MetricSeries`] per (resource, metric, range)
//! - **`aligner`**: positional merge of the series of one resource
//! - **`emitter`** and **`sinks`**: event delivery (console, file, ClickHouse)
//! - **`scheduler`**: periodic and backfill collection driven by a ticker
//! - **`report`**: per-cycle tallies, printed as a table or logged as JSON

#[macro_use]
extern crate tracing;

pub mod aligner;
pub mod api;
pub mod clock;
pub mod emitter;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod range;
pub mod report;
pub mod scheduler;
pub mod sinks;

#[cfg(test)]
mod testing;

pub use aligner::SeriesAligner;
pub use api::{
    HttpMetricsApi,
    MetricsApi,
};
pub use clock::{
    Clock,
    SystemClock,
};
pub use emitter::EventEmitter;
pub use error::{
    CollectError,
    Result,
};
pub use fetcher::SeriesFetcher;
pub use metrics::*;
pub use range::{
    SamplingInterval,
    TimeRange,
    MAX_DATAPOINTS,
};
pub use report::{
    CycleReport,
    ResourceTally,
};
pub use scheduler::{
    CollectionMode,
    CollectionScheduler,
    CollectionState,
    Outcome,
    Phase,
};
pub use sinks::Sink;
