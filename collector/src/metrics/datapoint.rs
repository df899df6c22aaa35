use crate::TimeRange;
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
    IntoEnumIterator,
};

/// Statistics requested for every metric.
#[derive(Debug, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Statistic {
    Average,
    Maximum,
    Minimum,
    Sum,
    SampleCount,
}

impl Statistic {
    /// The five statistics every query asks for.
    pub fn standard() -> Vec<Statistic> {
        Statistic::iter().collect()
    }
}

/// One statistical sample of a metric at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub average: f64,
    #[serde(default)]
    pub maximum: f64,
    #[serde(default)]
    pub minimum: f64,
    #[serde(default)]
    pub sum: f64,
    #[serde(default)]
    pub sample_count: f64,
    #[serde(default)]
    pub unit: String,
}

/// Datapoints of one (resource, metric) pair over one range, ascending by
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub resource: String,
    pub metric: String,
    pub range: TimeRange,
    datapoints: Vec<Datapoint>,
}

impl MetricSeries {
    /// Builds a series, sorting the datapoints since the API does not
    /// guarantee their order.
    pub fn new(
        resource: impl Into<String>,
        metric: impl Into<String>,
        range: TimeRange,
        mut datapoints: Vec<Datapoint>,
    ) -> Self {
        datapoints.sort_by_key(|d| d.timestamp);
        Self {
            resource: resource.into(),
            metric: metric.into(),
            range,
            datapoints,
        }
    }

    pub fn datapoints(&self) -> &[Datapoint] {
        &self.datapoints
    }

    pub fn len(&self) -> usize {
        self.datapoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datapoints.is_empty()
    }
}
