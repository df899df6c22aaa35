use crate::SinkKind;
use clap::Parser;
use std::path::PathBuf;

/// Collects function statistics from a monitoring API and forwards one
/// merged event per timestamp to a sink.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Configuration file. Defaults to `config.yaml` in the config directory.
    #[clap(long, short, value_name = "FILE", env = "LAMBDASTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// How often to collect, e.g. "300s" or "5m".
    #[clap(long, value_name = "DURATION")]
    pub period: Option<String>,

    /// Sampling granularity in seconds. Must be a multiple of 60.
    #[clap(long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Resource to collect. Repeat for several. Lists all resources if none
    /// are configured anywhere.
    #[clap(long = "resource", value_name = "NAME")]
    pub resources: Vec<String>,

    /// Metric to collect. Repeat for several. The first one anchors the event
    /// timestamps.
    #[clap(long = "metric", value_name = "NAME")]
    pub metrics: Vec<String>,

    /// Collect history starting at this RFC 3339 timestamp, then exit.
    #[clap(long, value_name = "TIMESTAMP")]
    pub backfill_date: Option<String>,

    /// Region of the monitored resources.
    #[clap(long, env = "LAMBDASTAT_REGION")]
    pub region: Option<String>,

    /// Base URL of the metrics API.
    #[clap(long, value_name = "URL", env = "LAMBDASTAT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Where merged events are delivered.
    #[clap(long, value_name = "KIND")]
    pub sink: Option<SinkKind>,

    /// Enables debug logging.
    #[clap(long, short, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(period) = &self.period {
                cache.insert("period".to_string(), period.clone().into());
            }
            if let Some(interval) = self.interval {
                cache.insert("interval".to_string(), interval.into());
            }
            if !self.resources.is_empty() {
                cache.insert("resources".to_string(), self.resources.clone().into());
            }
            if !self.metrics.is_empty() {
                cache.insert("metrics".to_string(), self.metrics.clone().into());
            }
            if let Some(backfill_date) = &self.backfill_date {
                cache.insert("backfill_date".to_string(), backfill_date.clone().into());
            }
            if let Some(region) = &self.region {
                cache.insert("region".to_string(), region.clone().into());
            }
            if let Some(endpoint) = &self.endpoint {
                cache.insert("endpoint".to_string(), endpoint.clone().into());
            }
            if let Some(sink) = self.sink {
                cache.insert("sink.kind".to_string(), sink.to_string().into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "\
{version}

Authors: {author}

Config directory: {config_dir_path}",
        version = clap::crate_version!(),
    )
}
