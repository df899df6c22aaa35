//! # Metrics API
//!
//! The remote monitoring service the collector pulls from. [`MetricsApi`] is the
//! seam the core depends on; [`HttpMetricsApi`] is the production client.

mod http;

pub use http::HttpMetricsApi;

use crate::metrics::{
    Datapoint,
    ResourceMetadata,
    Statistic,
};
use chrono::{
    DateTime,
    Utc,
};
use eyre::Result;
use serde::Serialize;
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
};

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// One statistics request: a metric of one resource over `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatisticsQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "Period")]
    pub period_seconds: i64,
    pub statistics: Vec<Statistic>,
}

/// One page of the resource listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePage {
    pub resources: Vec<String>,
    /// Continuation token, `None` on the last page.
    pub next_marker: Option<String>,
}

/// Remote metrics service.
///
/// Contract relied on by the aligner: for a given range and period, every
/// metric of a resource yields one datapoint per interval, without gaps.
pub trait MetricsApi: Send + Sync {
    /// Datapoints for the query, in any order.
    fn get_statistics(&self, query: StatisticsQuery) -> ApiFuture<'_, Vec<Datapoint>>;

    /// One page of resource names, starting at `marker`.
    fn list_resources(&self, marker: Option<String>) -> ApiFuture<'_, ResourcePage>;

    /// Descriptive fields of a resource.
    fn describe_resource(&self, resource: String) -> ApiFuture<'_, ResourceMetadata>;
}

/// Follows the continuation marker until every resource is listed.
pub async fn list_all_resources(api: &dyn MetricsApi) -> Result<Vec<String>> {
    let mut resources = Vec::new();
    let mut marker = None;

    loop {
        let page = api.list_resources(marker).await?;
        debug!(count = page.resources.len(), more = page.next_marker.is_some(), "Listed resource page");
        resources.extend(page.resources);

        match page.next_marker {
            Some(next) if !next.is_empty() => marker = Some(next),
            _ => break,
        }
    }

    Ok(resources)
}

/// Looks up the metadata of every resource once.
pub async fn describe_resources(
    api: &dyn MetricsApi,
    resources: &[String],
) -> Result<HashMap<String, ResourceMetadata>> {
    let mut described = HashMap::with_capacity(resources.len());
    for resource in resources {
        let metadata = api
            .describe_resource(resource.clone())
            .await
            .map_err(|e| e.wrap_err(format!("Failed to describe resource {resource}")))?;
        described.insert(resource.clone(), metadata);
    }
    Ok(described)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubApi;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn listing_follows_markers_until_exhausted() {
        let api = StubApi::default().with_resource_pages(vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
            vec!["d".to_string()],
        ]);

        let resources = list_all_resources(&api).await.unwrap();

        assert_eq!(resources, vec!["a", "b", "c", "d"]);
        assert_eq!(api.listing_markers(), vec![None, Some("1".to_string()), Some("2".to_string())]);
    }

    #[tokio::test]
    async fn describing_collects_every_resource() {
        let api = StubApi::default()
            .with_metadata("a", ResourceMetadata::from([("runtime".to_string(), json!("java21"))]));

        let described = describe_resources(&api, &["a".to_string(), "b".to_string()]).await.unwrap();

        assert_eq!(described["a"]["runtime"], json!("java21"));
        assert!(described["b"].is_empty());
    }
}
