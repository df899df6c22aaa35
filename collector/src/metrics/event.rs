use crate::metrics::Datapoint;
use chrono::{
    DateTime,
    SecondsFormat,
    Utc,
};
use serde::Serialize;
use serde_json::{
    Map,
    Value,
};
use std::collections::BTreeMap;

/// Event fields that resource metadata may not replace.
const RESERVED_FIELDS: [&str; 3] = ["@timestamp", "type", "resource"];

/// Descriptive fields attached to every event of a resource.
pub type ResourceMetadata = BTreeMap<String, Value>;

/// Statistic set of one metric within a [`MergedEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStatistics {
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub sum: f64,
    pub sample_count: f64,
    pub unit: String,
}

impl From<&Datapoint> for MetricStatistics {
    fn from(datapoint: &Datapoint) -> Self {
        Self {
            average: datapoint.average,
            maximum: datapoint.maximum,
            minimum: datapoint.minimum,
            sum: datapoint.sum,
            sample_count: datapoint.sample_count,
            unit: datapoint.unit.clone(),
        }
    }
}

/// One record per timestamp and resource, carrying every tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedEvent {
    pub timestamp: DateTime<Utc>,
    pub resource: String,
    pub metadata: ResourceMetadata,
    /// In tracked-metric order.
    pub metrics: Vec<(String, MetricStatistics)>,
}

impl MergedEvent {
    pub fn metric(&self, name: &str) -> Option<&MetricStatistics> {
        self.metrics
            .iter()
            .find(|(metric, _)| metric == name)
            .map(|(_, statistics)| statistics)
    }

    /// Flat document as published downstream:
    ///
    /// ```json
    /// { "@timestamp": "...", "type": "metric", "resource": "checkout",
    ///   "runtime": "...", "invocations-average": 1.0, "invocations-unit": "Count", ... }
    /// ```
    pub fn to_document(&self) -> Value {
        let mut document = Map::new();
        document.insert(
            "@timestamp".to_string(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        document.insert("type".to_string(), "metric".into());
        document.insert("resource".to_string(), self.resource.clone().into());

        for (key, value) in &self.metadata {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                warn!(
                    resource = %self.resource,
                    field = %key,
                    "Dropping metadata field that collides with an event field"
                );
                continue;
            }
            document.insert(key.clone(), value.clone());
        }

        for (metric, statistics) in &self.metrics {
            let prefix = field_prefix(metric);
            document.insert(format!("{prefix}-average"), statistics.average.into());
            document.insert(format!("{prefix}-maximum"), statistics.maximum.into());
            document.insert(format!("{prefix}-minimum"), statistics.minimum.into());
            document.insert(format!("{prefix}-sum"), statistics.sum.into());
            document.insert(format!("{prefix}-sample-count"), statistics.sample_count.into());
            document.insert(format!("{prefix}-unit"), statistics.unit.clone().into());
        }

        Value::Object(document)
    }
}

/// `ConcurrentExecutions` -> `concurrent-executions`
fn field_prefix(metric: &str) -> String {
    let mut prefix = String::with_capacity(metric.len() + 4);
    let mut previous: Option<char> = None;
    for c in metric.chars() {
        if !c.is_alphanumeric() {
            if !prefix.is_empty() && !prefix.ends_with('-') {
                prefix.push('-');
            }
        } else {
            if c.is_uppercase() && previous.is_some_and(|p| p.is_lowercase() || p.is_numeric()) {
                prefix.push('-');
            }
            prefix.extend(c.to_lowercase());
        }
        previous = Some(c);
    }
    prefix.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn metric_names_become_kebab_case_prefixes() {
        assert_eq!(field_prefix("Invocations"), "invocations");
        assert_eq!(field_prefix("ConcurrentExecutions"), "concurrent-executions");
        assert_eq!(field_prefix("IteratorAge"), "iterator-age");
        assert_eq!(field_prefix("Duration p99"), "duration-p99");
        assert_eq!(field_prefix("errors"), "errors");
    }

    #[test]
    fn document_flattens_metadata_and_statistics() {
        let event = MergedEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap(),
            resource: "checkout".to_string(),
            metadata: ResourceMetadata::from([
                ("runtime".to_string(), json!("provided.al2023")),
                ("memory-size".to_string(), json!(512)),
            ]),
            metrics: vec![(
                "Invocations".to_string(),
                MetricStatistics {
                    average: 1.0,
                    maximum: 2.0,
                    minimum: 0.0,
                    sum: 12.0,
                    sample_count: 12.0,
                    unit: "Count".to_string(),
                },
            )],
        };

        assert_eq!(
            event.to_document(),
            json!({
                "@timestamp": "2024-01-01T00:05:00.000Z",
                "type": "metric",
                "resource": "checkout",
                "runtime": "provided.al2023",
                "memory-size": 512,
                "invocations-average": 1.0,
                "invocations-maximum": 2.0,
                "invocations-minimum": 0.0,
                "invocations-sum": 12.0,
                "invocations-sample-count": 12.0,
                "invocations-unit": "Count",
            })
        );
        assert_eq!(event.metric("Invocations").map(|s| s.sum), Some(12.0));
        assert!(event.metric("Errors").is_none());
    }

    #[test]
    fn metadata_cannot_replace_event_identity_fields() {
        let event = MergedEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap(),
            resource: "checkout".to_string(),
            metadata: ResourceMetadata::from([
                ("@timestamp".to_string(), json!("1970-01-01T00:00:00Z")),
                ("type".to_string(), json!("function")),
                ("resource".to_string(), json!("arn:aws:lambda:fn")),
                ("handler".to_string(), json!("index.handler")),
            ]),
            metrics: Vec::new(),
        };

        let document = event.to_document();

        assert_eq!(document["@timestamp"], "2024-01-01T00:05:00.000Z");
        assert_eq!(document["type"], "metric");
        assert_eq!(document["resource"], "checkout");
        assert_eq!(document["handler"], "index.handler");
        assert_eq!(document.as_object().map(|o| o.len()), Some(4));
    }
}
