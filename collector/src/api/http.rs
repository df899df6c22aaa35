use super::{
    ApiFuture,
    MetricsApi,
    ResourcePage,
    StatisticsQuery,
};
use crate::metrics::{
    Datapoint,
    ResourceMetadata,
};
use chrono::{
    DateTime,
    Utc,
};
use eyre::{
    eyre,
    Result,
};
use reqwest::Client as HttpClient;
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;
use url::Url;

const REGION_HEADER: &str = "X-Region";

/// JSON client for a monitoring gateway.
///
/// - `POST {endpoint}/statistics` answers a [`StatisticsQuery`]
/// - `GET {endpoint}/resources?marker=..` pages through resource names
/// - `GET {endpoint}/resources/{name}` describes one resource
///
/// Field names are PascalCase in both directions.
#[derive(Debug, Clone)]
pub struct HttpMetricsApi {
    http_client: HttpClient,
    endpoint: Url,
    region: String,
}

impl HttpMetricsApi {
    pub fn new(endpoint: Url, region: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            endpoint: with_trailing_slash(endpoint),
            region: region.into(),
        })
    }

    fn statistics_url(&self) -> Result<Url> {
        Ok(self.endpoint.join("statistics")?)
    }

    fn resources_url(&self) -> Result<Url> {
        Ok(self.endpoint.join("resources")?)
    }

    fn resource_url(&self, resource: &str) -> Result<Url> {
        let mut url = self.resources_url()?;
        url.path_segments_mut()
            .map_err(|_| eyre!("Endpoint {} cannot be a base URL", self.endpoint))?
            .push(resource);
        Ok(url)
    }

    async fn query_statistics(&self, query: StatisticsQuery) -> Result<Vec<Datapoint>> {
        let request = StatisticsRequest {
            region: &self.region,
            query: &query,
        };
        let response: StatisticsResponse = self
            .http_client
            .post(self.statistics_url()?)
            .header(REGION_HEADER, &self.region)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.datapoints.into_iter().map(Datapoint::from).collect())
    }

    async fn fetch_resource_page(&self, marker: Option<String>) -> Result<ResourcePage> {
        let mut request = self
            .http_client
            .get(self.resources_url()?)
            .header(REGION_HEADER, &self.region);
        if let Some(marker) = &marker {
            request = request.query(&[("marker", marker)]);
        }

        let response: ListResourcesResponse = request.send().await?.error_for_status()?.json().await?;

        Ok(ResourcePage {
            resources: response.resources,
            next_marker: response.next_marker,
        })
    }

    async fn fetch_metadata(&self, resource: String) -> Result<ResourceMetadata> {
        let metadata: serde_json::Map<String, serde_json::Value> = self
            .http_client
            .get(self.resource_url(&resource)?)
            .header(REGION_HEADER, &self.region)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(metadata.into_iter().collect())
    }
}

impl MetricsApi for HttpMetricsApi {
    fn get_statistics(&self, query: StatisticsQuery) -> ApiFuture<'_, Vec<Datapoint>> {
        Box::pin(self.query_statistics(query))
    }

    fn list_resources(&self, marker: Option<String>) -> ApiFuture<'_, ResourcePage> {
        Box::pin(self.fetch_resource_page(marker))
    }

    fn describe_resource(&self, resource: String) -> ApiFuture<'_, ResourceMetadata> {
        Box::pin(self.fetch_metadata(resource))
    }
}

/// `Url::join` replaces the last segment unless the base ends with a slash.
fn with_trailing_slash(mut endpoint: Url) -> Url {
    if !endpoint.path().ends_with('/') {
        let path = format!("{}/", endpoint.path());
        endpoint.set_path(&path);
    }
    endpoint
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StatisticsRequest<'a> {
    region: &'a str,
    #[serde(flatten)]
    query: &'a StatisticsQuery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatisticsResponse {
    #[serde(default)]
    datapoints: Vec<WireDatapoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireDatapoint {
    timestamp: DateTime<Utc>,
    average: Option<f64>,
    maximum: Option<f64>,
    minimum: Option<f64>,
    sum: Option<f64>,
    sample_count: Option<f64>,
    unit: Option<String>,
}

impl From<WireDatapoint> for Datapoint {
    fn from(wire: WireDatapoint) -> Self {
        Self {
            timestamp: wire.timestamp,
            average: wire.average.unwrap_or_default(),
            maximum: wire.maximum.unwrap_or_default(),
            minimum: wire.minimum.unwrap_or_default(),
            sum: wire.sum.unwrap_or_default(),
            sample_count: wire.sample_count.unwrap_or_default(),
            unit: wire.unit.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListResourcesResponse {
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    next_marker: Option<String>,
}
