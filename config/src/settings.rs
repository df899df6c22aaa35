use crate::AlignmentPolicy;
use chrono::{
    DateTime,
    Utc,
};
use std::{
    path::PathBuf,
    time::Duration,
};
use url::Url;

/// Validated configuration, produced by [`crate::Config::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub period: Duration,
    pub interval_seconds: u64,
    /// Empty means "discover via the resource listing".
    pub resources: Vec<String>,
    pub metrics: Vec<String>,
    pub backfill_from: Option<DateTime<Utc>>,
    pub region: String,
    pub endpoint: Url,
    pub namespace: String,
    pub dimension: String,
    pub alignment: AlignmentPolicy,
    pub request_timeout: Duration,
    pub sink: SinkSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkSettings {
    Console,
    File {
        path: PathBuf,
    },
    ClickHouse {
        url: Url,
        user: String,
        password: Option<String>,
        database: Option<String>,
        table: String,
    },
}
