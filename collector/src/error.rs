use crate::TimeRange;
use chrono::{
    DateTime,
    Utc,
};

pub type Result<T> = std::result::Result<T, CollectError>;

#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    #[error("Querying {metric} for {resource} over {range} failed: {report}")]
    RemoteQuery {
        resource: String,
        metric: String,
        range: TimeRange,
        report: eyre::Report,
    },
    #[error("Publishing the {resource} event at {timestamp} to the {sink} sink failed: {report}")]
    Sink {
        resource: String,
        timestamp: DateTime<Utc>,
        sink: &'static str,
        report: eyre::Report,
    },
    #[error("Series of {resource} cannot be aligned: {detail}")]
    AlignmentInconsistency { resource: String, detail: String },
    #[error("Time range starts at {start} after its end {end}")]
    InvalidRange { start: DateTime<Utc>, end: DateTime<Utc> },
    #[error("Sampling interval must be a positive multiple of 60 seconds, got {0}")]
    InvalidInterval(u64),
    #[error("At least one {0} must be tracked")]
    EmptySelection(&'static str),
    #[error("The collection scheduler has terminated")]
    Terminated,
}
