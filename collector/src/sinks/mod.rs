//! # Event Sinks
//!
//! Destinations for merged events. Every sink publishes one event at a time
//! and reports failures to the caller; none of them retries.

mod clickhouse;
mod json_lines;

pub use self::clickhouse::ClickHouseSink;
pub use json_lines::JsonLinesSink;

use crate::metrics::MergedEvent;
use eyre::Result;
use lambdastat_config::SinkSettings;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
};

pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub trait Sink: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Publish one event
    fn publish<'a>(&'a self, event: &'a MergedEvent) -> SinkFuture<'a>;
}

/// Builds the sink selected in the settings.
pub async fn from_settings(settings: &SinkSettings) -> Result<Arc<dyn Sink>> {
    let sink: Arc<dyn Sink> = match settings {
        SinkSettings::Console => Arc::new(JsonLinesSink::stdout()),
        SinkSettings::File { path } => Arc::new(JsonLinesSink::append_to(path).await?),
        SinkSettings::ClickHouse {
            url,
            user,
            password,
            database,
            table,
        } => Arc::new(ClickHouseSink::new(
            url,
            user,
            password.as_deref(),
            database.as_deref(),
            table,
        )),
    };

    info!(sink = sink.name(), "Event sink ready");
    Ok(sink)
}
