//! Test doubles for the collaborators of the collection core.

use crate::{
    api::{
        ApiFuture,
        MetricsApi,
        ResourcePage,
        StatisticsQuery,
    },
    clock::Clock,
    metrics::{
        Datapoint,
        MergedEvent,
        ResourceMetadata,
    },
    sinks::{
        Sink,
        SinkFuture,
    },
};
use chrono::{
    DateTime,
    TimeDelta,
    TimeZone,
    Utc,
};
use eyre::eyre;
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::Mutex,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// `count` one-minute datapoints from `start`, newest first. The average
/// holds the minute offset so tests can tell samples apart.
pub fn minutes(start: DateTime<Utc>, count: i64) -> Vec<Datapoint> {
    (0..count)
        .rev()
        .map(|i| Datapoint {
            timestamp: start + TimeDelta::minutes(i),
            average: i as f64,
            maximum: i as f64 + 0.5,
            minimum: 0.0,
            sum: i as f64 * 2.0,
            sample_count: 2.0,
            unit: "Count".to_string(),
        })
        .collect()
}

#[derive(Default)]
pub struct StubApi {
    series: HashMap<(String, String), Vec<Datapoint>>,
    failures: HashSet<(String, String)>,
    pages: Vec<Vec<String>>,
    metadata: HashMap<String, ResourceMetadata>,
    queries: Mutex<Vec<StatisticsQuery>>,
    markers: Mutex<Vec<Option<String>>>,
}

impl StubApi {
    pub fn with_series(mut self, resource: &str, metric: &str, datapoints: Vec<Datapoint>) -> Self {
        self.series
            .insert((resource.to_string(), metric.to_string()), datapoints);
        self
    }

    pub fn failing(mut self, resource: &str, metric: &str) -> Self {
        self.failures.insert((resource.to_string(), metric.to_string()));
        self
    }

    pub fn with_resource_pages(mut self, pages: Vec<Vec<String>>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_metadata(mut self, resource: &str, metadata: ResourceMetadata) -> Self {
        self.metadata.insert(resource.to_string(), metadata);
        self
    }

    pub fn queries(&self) -> Vec<StatisticsQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn listing_markers(&self) -> Vec<Option<String>> {
        self.markers.lock().unwrap().clone()
    }
}

impl MetricsApi for StubApi {
    fn get_statistics(&self, query: StatisticsQuery) -> ApiFuture<'_, Vec<Datapoint>> {
        Box::pin(async move {
            self.queries.lock().unwrap().push(query.clone());
            let resource = query
                .dimensions
                .first()
                .map(|d| d.value.clone())
                .unwrap_or_default();
            let key = (resource, query.metric_name.clone());

            if self.failures.contains(&key) {
                return Err(eyre!("Rate exceeded"));
            }

            Ok(self
                .series
                .get(&key)
                .map(|datapoints| {
                    datapoints
                        .iter()
                        .filter(|d| d.timestamp >= query.start_time && d.timestamp < query.end_time)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn list_resources(&self, marker: Option<String>) -> ApiFuture<'_, ResourcePage> {
        Box::pin(async move {
            self.markers.lock().unwrap().push(marker.clone());
            let index = marker.and_then(|m| m.parse::<usize>().ok()).unwrap_or(0);
            Ok(ResourcePage {
                resources: self.pages.get(index).cloned().unwrap_or_default(),
                next_marker: (index + 1 < self.pages.len()).then(|| (index + 1).to_string()),
            })
        })
    }

    fn describe_resource(&self, resource: String) -> ApiFuture<'_, ResourceMetadata> {
        Box::pin(async move { Ok(self.metadata.get(&resource).cloned().unwrap_or_default()) })
    }
}

/// Keeps published events in memory; rejects all of them when `failing`.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<MergedEvent>>,
    failing: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<MergedEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn publish<'a>(&'a self, event: &'a MergedEvent) -> SinkFuture<'a> {
        Box::pin(async move {
            if self.failing {
                return Err(eyre!("connection reset by peer"));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        })
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Wall time that follows tokio's (pausable) clock, starting at `origin`.
pub struct TokioClock {
    origin: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.origin + TimeDelta::from_std(self.started.elapsed()).unwrap()
    }
}
