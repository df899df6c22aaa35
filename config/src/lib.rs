#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod error;
mod settings;

pub use app_config::{
    env_prefix,
    get_config_dir,
};
pub use args::Args;
pub use error::ConfigError;
use serde::{
    Deserialize,
    Serialize,
};
pub use settings::{
    SinkSettings,
    Settings,
};
use std::{
    path::PathBuf,
    time::Duration,
};
use strum::{
    Display,
    EnumString,
};

/// Metrics collected when the configuration names none.
pub const DEFAULT_METRICS: [&str; 4] = ["Invocations", "Errors", "Duration", "Throttles"];

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

/// How the aligner treats metric series of different lengths.
#[derive(Debug, Default, Clone, Copy, Display, EnumString, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlignmentPolicy {
    /// Merge up to the shortest series and drop the excess.
    #[default]
    Truncate,
    /// Refuse to merge series of different lengths.
    Strict,
}

#[derive(Debug, Default, Clone, Copy, Display, EnumString, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Console,
    File,
    ClickHouse,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickhouse_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickhouse_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickhouse_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickhouse_database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickhouse_table: Option<String>,
}

/// Raw configuration as merged from defaults, file, environment and
/// command-line arguments. Call [`Config::validate`] before use.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub period: String,
    pub interval: u64,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfill_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub namespace: String,
    pub dimension: String,
    #[serde(default)]
    pub alignment: AlignmentPolicy,
    pub request_timeout: String,
    #[serde(default)]
    pub sink: SinkConfig,
}

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    pub fn new(args: &Args) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        builder = match &args.config {
            Some(path) => builder.add_source(config::File::from(path.clone()).format(config::FileFormat::Yaml)),
            None => builder.add_source(
                config::File::from(get_config_dir().join("config.yaml"))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            ),
        };

        builder = builder
            .add_source(
                config::Environment::with_prefix(env_prefix())
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("resources")
                    .with_list_parse_key("metrics")
                    .try_parsing(true),
            )
            .add_source(args.clone());

        let cfg: Self = builder.build()?.try_deserialize()?;
        debug!(file = ?args.config, "Configuration loaded");

        Ok(cfg)
    }

    /// Checks every constraint and converts the raw values into [`Settings`].
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let period = parse_duration("period", &self.period)?;
        let request_timeout = parse_duration("request_timeout", &self.request_timeout)?;

        if self.interval == 0 || self.interval % 60 != 0 {
            return Err(ConfigError::InvalidInterval(self.interval));
        }

        let region = non_empty(self.region.as_deref())
            .ok_or(ConfigError::MissingRegion)?
            .to_string();
        let endpoint = non_empty(self.endpoint.as_deref()).ok_or(ConfigError::MissingEndpoint)?;
        let endpoint = parse_url("endpoint", endpoint)?;

        let backfill_from = match non_empty(self.backfill_date.as_deref()) {
            None => None,
            Some(value) => Some(
                chrono::DateTime::parse_from_rfc3339(value)
                    .map_err(|e| ConfigError::InvalidBackfillDate {
                        value: value.to_string(),
                        reason: e.to_string(),
                    })?
                    .with_timezone(&chrono::Utc),
            ),
        };

        let mut metrics = dedup(&self.metrics);
        if metrics.is_empty() {
            info!(metrics = ?DEFAULT_METRICS, "No metrics configured, using defaults");
            metrics = DEFAULT_METRICS.iter().map(ToString::to_string).collect();
        }

        Ok(Settings {
            period,
            interval_seconds: self.interval,
            resources: dedup(&self.resources),
            metrics,
            backfill_from,
            region,
            endpoint,
            namespace: self.namespace.clone(),
            dimension: self.dimension.clone(),
            alignment: self.alignment,
            request_timeout,
            sink: self.sink.validate()?,
        })
    }
}

impl SinkConfig {
    fn validate(&self) -> Result<SinkSettings, ConfigError> {
        match self.kind {
            SinkKind::Console => Ok(SinkSettings::Console),
            SinkKind::File => {
                let path = self
                    .path
                    .clone()
                    .ok_or(ConfigError::IncompleteSink(self.kind, "path"))?;
                Ok(SinkSettings::File { path })
            }
            SinkKind::ClickHouse => {
                let url = non_empty(self.clickhouse_url.as_deref())
                    .ok_or(ConfigError::IncompleteSink(self.kind, "clickhouse_url"))?;
                Ok(SinkSettings::ClickHouse {
                    url: parse_url("clickhouse_url", url)?,
                    user: non_empty(self.clickhouse_user.as_deref())
                        .unwrap_or("default")
                        .to_string(),
                    password: self.clickhouse_password.clone(),
                    database: non_empty(self.clickhouse_database.as_deref()).map(ToString::to_string),
                    table: non_empty(self.clickhouse_table.as_deref())
                        .ok_or(ConfigError::IncompleteSink(self.kind, "clickhouse_table"))?
                        .to_string(),
                })
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        reason,
    };
    let duration = humantime::parse_duration(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if duration.is_zero() {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(duration)
}

fn parse_url(field: &'static str, value: &str) -> Result<url::Url, ConfigError> {
    url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Trims names and drops blanks and repeats, keeping the first occurrence.
fn dedup(values: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !seen.iter().any(|s: &String| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
