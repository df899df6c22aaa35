//! # Series Alignment
//!
//! Merges the series of every tracked metric of one resource into one
//! [`MergedEvent`] per sample. Series are joined by ordinal position, not by
//! timestamp: sample `i` of each series lands in event `i`, stamped with the
//! timestamp of the first (anchor) series.
//!
//! Positional joining is only correct when all series cover the same range at
//! the same interval and the API returns one datapoint per interval without
//! gaps. That is a contract of the [`crate::api::MetricsApi`] implementation.
//! Its violations cannot be detected here and shift samples silently.

use crate::{
    error::{
        CollectError,
        Result,
    },
    metrics::{
        MergedEvent,
        MetricSeries,
        MetricStatistics,
        ResourceMetadata,
    },
};
use lambdastat_config::AlignmentPolicy;

#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesAligner {
    policy: AlignmentPolicy,
}

impl SeriesAligner {
    pub fn new(policy: AlignmentPolicy) -> Self {
        Self { policy }
    }

    /// One event per shared sample index, in anchor time order.
    ///
    /// `series` is in tracked-metric order; the first entry is the anchor.
    pub fn merge(
        &self,
        resource: &str,
        metadata: &ResourceMetadata,
        series: &[MetricSeries],
    ) -> Result<Vec<MergedEvent>> {
        let Some(anchor) = series.first() else {
            return Ok(Vec::new());
        };

        let shortest = series.iter().min_by_key(|s| s.len()).unwrap_or(anchor);
        let longest = series.iter().max_by_key(|s| s.len()).unwrap_or(anchor);

        if longest.is_empty() {
            return Ok(Vec::new());
        }

        if shortest.is_empty() {
            return Err(CollectError::AlignmentInconsistency {
                resource: resource.to_string(),
                detail: format!(
                    "{} returned no datapoints while {} returned {}",
                    shortest.metric,
                    longest.metric,
                    longest.len()
                ),
            });
        }

        if shortest.len() != longest.len() {
            let lengths = series
                .iter()
                .map(|s| format!("{}={}", s.metric, s.len()))
                .collect::<Vec<_>>()
                .join(", ");
            match self.policy {
                AlignmentPolicy::Strict => {
                    return Err(CollectError::AlignmentInconsistency {
                        resource: resource.to_string(),
                        detail: format!("series lengths differ ({lengths})"),
                    });
                }
                AlignmentPolicy::Truncate => {
                    warn!(
                        resource,
                        %lengths,
                        kept = shortest.len(),
                        "Series lengths differ, dropping samples beyond the shortest series"
                    );
                }
            }
        }

        let events = (0..shortest.len())
            .map(|i| MergedEvent {
                timestamp: anchor.datapoints()[i].timestamp,
                resource: resource.to_string(),
                metadata: metadata.clone(),
                metrics: series
                    .iter()
                    .map(|s| (s.metric.clone(), MetricStatistics::from(&s.datapoints()[i])))
                    .collect(),
            })
            .collect();

        Ok(events)
    }
}
