use chrono::Utc;
use eyre::Result;
use lambdastat_collector::{
    api::{
        describe_resources,
        list_all_resources,
    },
    sinks,
    CollectionMode,
    CollectionScheduler,
    CollectionState,
    EventEmitter,
    HttpMetricsApi,
    MetricsApi,
    Outcome,
    SamplingInterval,
    SeriesAligner,
    SeriesFetcher,
};
use lambdastat_config::{
    Args,
    Config,
    ConfigError,
    Settings,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct App {
    settings: Settings,
}

impl App {
    /// Loads and validates the configuration. Fails before anything is
    /// contacted when it is incomplete.
    pub fn new(args: Args) -> Result<Self> {
        let settings = Config::new(&args)?.validate()?;
        Ok(Self { settings })
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.settings;
        let interval = SamplingInterval::new(settings.interval_seconds)?;

        info!(
            region = %settings.region,
            endpoint = %settings.endpoint,
            namespace = %settings.namespace,
            "Starting lambdastat"
        );

        let api: Arc<dyn MetricsApi> = Arc::new(HttpMetricsApi::new(
            settings.endpoint.clone(),
            &settings.region,
            settings.request_timeout,
        )?);

        let resources = if settings.resources.is_empty() {
            let listed = list_all_resources(api.as_ref()).await?;
            info!(count = listed.len(), "Discovered resources");
            listed
        } else {
            settings.resources.clone()
        };
        if resources.is_empty() {
            return Err(ConfigError::NoResources.into());
        }

        let metadata = describe_resources(api.as_ref(), &resources).await?;
        let sink = sinks::from_settings(&settings.sink).await?;

        let mode = match settings.backfill_from {
            Some(from) => CollectionMode::Backfill { from },
            None => CollectionMode::Periodic,
        };
        let state = CollectionState::new(mode, Utc::now(), resources, settings.metrics.clone(), interval)?;
        let fetcher = SeriesFetcher::new(api, &settings.namespace, &settings.dimension, interval);

        let cancellation_token = CancellationToken::new();
        tokio::spawn({
            let cancellation_token = cancellation_token.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, stopping collection");
                    cancellation_token.cancel();
                }
            }
        });

        let mut scheduler = CollectionScheduler::new(
            state,
            settings.period,
            fetcher,
            SeriesAligner::new(settings.alignment),
            EventEmitter::new(sink),
        )
        .with_metadata(metadata)
        .with_cancellation(cancellation_token);

        match scheduler.run().await? {
            Outcome::Terminated => {
                if let Some(report) = scheduler.last_report() {
                    eprintln!("{}", report.format());
                }
                info!(ranges = scheduler.cycles_completed(), "Backfill complete");
            }
            Outcome::Cancelled => {
                info!(
                    ranges = scheduler.cycles_completed(),
                    watermark = %scheduler.state().watermark(),
                    "Collection stopped"
                );
            }
        }

        Ok(())
    }
}
