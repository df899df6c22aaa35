use crate::SinkKind;

/// Invalid or missing configuration. Always fatal at startup.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("Interval must be a positive multiple of 60 seconds, got {0}")]
    InvalidInterval(u64),
    #[error("Invalid backfill date '{value}': {reason}")]
    InvalidBackfillDate { value: String, reason: String },
    #[error("Must provide a region")]
    MissingRegion,
    #[error("Must provide the endpoint of the metrics API")]
    MissingEndpoint,
    #[error("Invalid URL for {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("The {0} sink requires '{1}' to be set")]
    IncompleteSink(SinkKind, &'static str),
    #[error("No resources configured and none could be discovered")]
    NoResources,
}
