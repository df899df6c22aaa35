use crate::{
    api::{
        Dimension,
        MetricsApi,
        StatisticsQuery,
    },
    error::{
        CollectError,
        Result,
    },
    metrics::{
        MetricSeries,
        Statistic,
    },
    SamplingInterval,
    TimeRange,
};
use std::sync::Arc;

/// Retrieves one metric series per call. No retries; the scheduler decides
/// what a failure means for the cycle.
#[derive(Clone)]
pub struct SeriesFetcher {
    api: Arc<dyn MetricsApi>,
    namespace: String,
    dimension: String,
    interval: SamplingInterval,
    statistics: Vec<Statistic>,
}

impl SeriesFetcher {
    pub fn new(
        api: Arc<dyn MetricsApi>,
        namespace: impl Into<String>,
        dimension: impl Into<String>,
        interval: SamplingInterval,
    ) -> Self {
        Self {
            api,
            namespace: namespace.into(),
            dimension: dimension.into(),
            interval,
            statistics: Statistic::standard(),
        }
    }

    fn query(&self, resource: &str, metric: &str, range: TimeRange) -> StatisticsQuery {
        StatisticsQuery {
            namespace: self.namespace.clone(),
            metric_name: metric.to_string(),
            dimensions: vec![Dimension {
                name: self.dimension.clone(),
                value: resource.to_string(),
            }],
            start_time: range.start(),
            end_time: range.end(),
            period_seconds: self.interval.as_secs(),
            statistics: self.statistics.clone(),
        }
    }

    /// Datapoints of `metric` for `resource` over `range`, ascending by
    /// timestamp whatever order the API answered in.
    pub async fn fetch(&self, resource: &str, metric: &str, range: TimeRange) -> Result<MetricSeries> {
        let datapoints = self
            .api
            .get_statistics(self.query(resource, metric, range))
            .await
            .map_err(|report| CollectError::RemoteQuery {
                resource: resource.to_string(),
                metric: metric.to_string(),
                range,
                report,
            })?;

        debug!(resource, metric, %range, datapoints = datapoints.len(), "Fetched metric series");
        Ok(MetricSeries::new(resource, metric, range, datapoints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        minutes,
        t0,
        StubApi,
    };
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    fn fetcher(api: Arc<StubApi>) -> SeriesFetcher {
        SeriesFetcher::new(api, "AWS/Lambda", "FunctionName", SamplingInterval::new(60).unwrap())
    }

    #[tokio::test]
    async fn fetched_series_are_sorted_and_scoped_to_the_range() {
        let api = Arc::new(StubApi::default().with_series("checkout", "Invocations", minutes(t0(), 10)));
        let range = TimeRange::new(t0() + TimeDelta::minutes(2), t0() + TimeDelta::minutes(5)).unwrap();

        let series = fetcher(api.clone()).fetch("checkout", "Invocations", range).await.unwrap();

        let timestamps: Vec<_> = series.datapoints().iter().map(|d| d.timestamp).collect();
        assert_eq!(
            timestamps,
            vec![
                t0() + TimeDelta::minutes(2),
                t0() + TimeDelta::minutes(3),
                t0() + TimeDelta::minutes(4),
            ]
        );
        assert_eq!(series.resource, "checkout");
        assert_eq!(series.metric, "Invocations");
        assert_eq!(series.range, range);
    }

    #[tokio::test]
    async fn queries_carry_dimension_period_and_statistics() {
        let api = Arc::new(StubApi::default());
        let range = TimeRange::new(t0(), t0() + TimeDelta::hours(1)).unwrap();

        fetcher(api.clone()).fetch("billing", "Errors", range).await.unwrap();

        let queries = api.queries();
        assert_eq!(queries.len(), 1);
        let query = &queries[0];
        assert_eq!(query.namespace, "AWS/Lambda");
        assert_eq!(query.metric_name, "Errors");
        assert_eq!(
            query.dimensions,
            vec![Dimension {
                name: "FunctionName".to_string(),
                value: "billing".to_string()
            }]
        );
        assert_eq!(query.start_time, range.start());
        assert_eq!(query.end_time, range.end());
        assert_eq!(query.period_seconds, 60);
        assert_eq!(query.statistics, Statistic::standard());
    }

    #[tokio::test]
    async fn api_failures_become_remote_query_errors() {
        let api = Arc::new(StubApi::default().failing("checkout", "Throttles"));
        let range = TimeRange::new(t0(), t0() + TimeDelta::hours(1)).unwrap();

        let err = fetcher(api).fetch("checkout", "Throttles", range).await.unwrap_err();

        match err {
            CollectError::RemoteQuery {
                resource,
                metric,
                range: failed,
                ..
            } => {
                assert_eq!(resource, "checkout");
                assert_eq!(metric, "Throttles");
                assert_eq!(failed, range);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
