use super::{
    Sink,
    SinkFuture,
};
use crate::metrics::MergedEvent;
use clickhouse::{
    Client,
    Row,
};
use eyre::Result;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Inserts one row per metric of an event into a table shaped like:
///
/// ```sql
/// CREATE TABLE lambda_metrics (
///     ts DateTime64(3, 'UTC'),
///     resource LowCardinality(String),
///     metric LowCardinality(String),
///     average Float64,
///     maximum Float64,
///     minimum Float64,
///     sum Float64,
///     sample_count Float64,
///     unit LowCardinality(String),
///     metadata Array(Tuple(String, String))
/// ) ENGINE = MergeTree ORDER BY (resource, metric, ts)
/// ```
pub struct ClickHouseSink {
    client: Client,
    table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Row)]
struct MetricRow {
    /// Milliseconds since the epoch
    ts: i64,
    resource: String,
    metric: String,
    average: f64,
    maximum: f64,
    minimum: f64,
    sum: f64,
    sample_count: f64,
    unit: String,
    metadata: Vec<(String, String)>,
}

impl ClickHouseSink {
    pub fn new(url: &Url, user: &str, password: Option<&str>, database: Option<&str>, table: &str) -> Self {
        let mut client = Client::default().with_url(url.as_str()).with_user(user);

        if let Some(password) = password {
            client = client.with_password(password);
        }
        if let Some(database) = database {
            client = client.with_database(database);
        }

        Self {
            client,
            table: table.to_string(),
        }
    }

    async fn insert(&self, event: &MergedEvent) -> Result<()> {
        let mut insert = self.client.insert::<MetricRow>(&self.table)?;
        for row in rows_for(event) {
            insert.write(&row).await?;
        }
        insert.end().await?;
        Ok(())
    }
}

impl Sink for ClickHouseSink {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn publish<'a>(&'a self, event: &'a MergedEvent) -> SinkFuture<'a> {
        Box::pin(self.insert(event))
    }
}

fn rows_for(event: &MergedEvent) -> Vec<MetricRow> {
    let metadata: Vec<(String, String)> = event
        .metadata
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect();

    event
        .metrics
        .iter()
        .map(|(metric, statistics)| MetricRow {
            ts: event.timestamp.timestamp_millis(),
            resource: event.resource.clone(),
            metric: metric.clone(),
            average: statistics.average,
            maximum: statistics.maximum,
            minimum: statistics.minimum,
            sum: statistics.sum,
            sample_count: statistics.sample_count,
            unit: statistics.unit.clone(),
            metadata: metadata.clone(),
        })
        .collect()
}
