//! # Collection Scheduler
//!
//! Drives collection cycles. In periodic mode every tick collects
//! `[watermark, now)` and moves the watermark to `now`. In backfill mode the
//! first tick walks the partitioned history from the backfill start up to
//! `now`, then the scheduler terminates.
//!
//! A cycle is fully sequential: resources in configured order, metrics in
//! tracked order, one outbound request at a time. Failures of one resource
//! are tallied in the [`CycleReport`] and never abort the cycle.

use crate::{
    aligner::SeriesAligner,
    clock::{
        Clock,
        SystemClock,
    },
    emitter::EventEmitter,
    error::{
        CollectError,
        Result,
    },
    fetcher::SeriesFetcher,
    metrics::ResourceMetadata,
    range::{
        partition,
        query_ranges,
    },
    report::CycleReport,
    SamplingInterval,
    TimeRange,
};
use chrono::{
    DateTime,
    Utc,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};
use tokio::time::{
    interval_at,
    Instant,
    MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMode {
    Periodic,
    Backfill { from: DateTime<Utc> },
}

impl CollectionMode {
    pub fn label(&self) -> &'static str {
        match self {
            CollectionMode::Periodic => "periodic",
            CollectionMode::Backfill { .. } => "backfill",
        }
    }
}

/// Everything a cycle needs to know. A cycle never mutates it; the
/// scheduler swaps in the successor returned by [`CollectionState::with_watermark`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState {
    watermark: DateTime<Utc>,
    mode: CollectionMode,
    resources: Vec<String>,
    metrics: Vec<String>,
    interval: SamplingInterval,
}

impl CollectionState {
    /// Periodic collection starts at `now`, backfill at its start instant.
    pub fn new(
        mode: CollectionMode,
        now: DateTime<Utc>,
        resources: Vec<String>,
        metrics: Vec<String>,
        interval: SamplingInterval,
    ) -> Result<Self> {
        if resources.is_empty() {
            return Err(CollectError::EmptySelection("resource"));
        }
        if metrics.is_empty() {
            return Err(CollectError::EmptySelection("metric"));
        }

        let watermark = match mode {
            CollectionMode::Periodic => now,
            CollectionMode::Backfill { from } => from,
        };

        Ok(Self {
            watermark,
            mode,
            resources,
            metrics,
            interval,
        })
    }

    /// Exclusive lower bound of the next window.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    pub fn mode(&self) -> CollectionMode {
        self.mode
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Tracked metrics; the first one anchors event timestamps.
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn interval(&self) -> SamplingInterval {
        self.interval
    }

    /// Successor state with the watermark moved forward. A watermark in the
    /// past of the current one is ignored.
    pub fn with_watermark(&self, watermark: DateTime<Utc>) -> Self {
        Self {
            watermark: self.watermark.max(watermark),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    Terminated,
}

/// Why [`CollectionScheduler::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Cancelled,
    /// Backfill exhausted its ranges.
    Terminated,
}

pub struct CollectionScheduler {
    state: CollectionState,
    phase: Phase,
    period: Duration,
    fetcher: SeriesFetcher,
    aligner: SeriesAligner,
    emitter: EventEmitter,
    metadata: HashMap<String, ResourceMetadata>,
    clock: Arc<dyn Clock>,
    cancellation_token: CancellationToken,
    cycles_completed: usize,
    last_report: Option<CycleReport>,
}

impl CollectionScheduler {
    pub fn new(
        state: CollectionState,
        period: Duration,
        fetcher: SeriesFetcher,
        aligner: SeriesAligner,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            state,
            phase: Phase::Idle,
            period,
            fetcher,
            aligner,
            emitter,
            metadata: HashMap::new(),
            clock: Arc::new(SystemClock),
            cancellation_token: CancellationToken::new(),
            cycles_completed: 0,
            last_report: None,
        }
    }

    /// Metadata attached to every event of a resource.
    pub fn with_metadata(mut self, metadata: HashMap<String, ResourceMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancellation(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of ranges collected so far.
    pub fn cycles_completed(&self) -> usize {
        self.cycles_completed
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Ticks every `period`, the first tick one period after the start, until
    /// cancelled or until a backfill is done.
    pub async fn run(&mut self) -> Result<Outcome> {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            mode = self.state.mode().label(),
            period = ?self.period,
            interval = %self.state.interval(),
            resources = self.state.resources().len(),
            metrics = ?self.state.metrics(),
            "Collection scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!(watermark = %self.state.watermark(), "Collection cancelled");
                    return Ok(Outcome::Cancelled);
                },
                _ = ticker.tick() => {},
            }

            if self.tick().await? == Phase::Terminated {
                if self.cancellation_token.is_cancelled() {
                    return Ok(Outcome::Cancelled);
                }
                return Ok(Outcome::Terminated);
            }
        }
    }

    /// Runs one cycle and returns the phase the scheduler is left in.
    pub async fn tick(&mut self) -> Result<Phase> {
        if self.phase == Phase::Terminated {
            return Err(CollectError::Terminated);
        }

        self.phase = Phase::Collecting;
        let now = self.clock.now();

        self.phase = match self.state.mode() {
            CollectionMode::Periodic => {
                self.collect_periodic(now).await;
                Phase::Idle
            }
            CollectionMode::Backfill { from } => {
                self.collect_backfill(from, now).await;
                Phase::Terminated
            }
        };

        Ok(self.phase)
    }

    async fn collect_periodic(&mut self, now: DateTime<Utc>) {
        let watermark = self.state.watermark();
        let window = TimeRange::new(watermark, now.max(watermark)).unwrap_or(TimeRange::empty_at(watermark));
        let ranges = query_ranges(window, self.state.interval());
        if ranges.len() > 1 {
            warn!(%window, ranges = ranges.len(), "Window exceeds the datapoint limit, splitting it");
        }

        let mut report = CycleReport::new(self.state.mode().label(), window, self.state.resources());
        for range in ranges {
            if self.cancellation_token.is_cancelled() {
                break;
            }
            self.collect_range(range, &mut report).await;
            report.ranges.push(range);
            self.cycles_completed += 1;
        }

        self.state = self.state.with_watermark(window.end());

        debug!(summary = %report.summary(), "Periodic cycle complete");
        info!(
            %window,
            events = report.total_events(),
            failures = report.total_failures(),
            "Collected window"
        );
        self.last_report = Some(report);
    }

    async fn collect_backfill(&mut self, from: DateTime<Utc>, now: DateTime<Utc>) {
        let ranges = partition(from, now, self.state.interval());
        let window = TimeRange::new(from, now.max(from)).unwrap_or(TimeRange::empty_at(from));
        if ranges.is_empty() {
            warn!(%from, %now, "Backfill start is not in the past, nothing to collect");
        }
        info!(%window, ranges = ranges.len(), "Starting backfill");

        let mut report = CycleReport::new(self.state.mode().label(), window, self.state.resources());
        for (index, range) in ranges.into_iter().enumerate() {
            if self.cancellation_token.is_cancelled() {
                warn!(watermark = %self.state.watermark(), "Backfill cancelled before completion");
                break;
            }

            self.state = self.state.with_watermark(range.start());
            let range = range.clamp_end(now);
            info!(%range, index, "Backfilling range");

            self.collect_range(range, &mut report).await;
            report.ranges.push(range);
            self.cycles_completed += 1;
        }

        info!(
            ranges = report.ranges.len(),
            events = report.total_events(),
            failures = report.total_failures(),
            "Backfill finished"
        );
        self.last_report = Some(report);
    }

    /// Fetch, align and emit one range for every resource.
    async fn collect_range(&self, range: TimeRange, report: &mut CycleReport) {
        let no_metadata = ResourceMetadata::new();

        'resources: for resource in self.state.resources() {
            let mut series = Vec::with_capacity(self.state.metrics().len());
            for metric in self.state.metrics() {
                match self.fetcher.fetch(resource, metric, range).await {
                    Ok(fetched) => series.push(fetched),
                    Err(e) => {
                        error!(%resource, %metric, %range, "{e}");
                        report.tally_mut(resource).fetch_failures += 1;
                        continue 'resources;
                    }
                }
            }

            let metadata = self.metadata.get(resource).unwrap_or(&no_metadata);
            let events = match self.aligner.merge(resource, metadata, &series) {
                Ok(events) => events,
                Err(e) => {
                    warn!(%resource, %range, "{e}");
                    report.tally_mut(resource).alignment_failures += 1;
                    continue;
                }
            };

            for event in &events {
                match self.emitter.emit(event).await {
                    Ok(()) => report.tally_mut(resource).events_emitted += 1,
                    Err(e) => {
                        error!(%resource, "{e}");
                        report.tally_mut(resource).sink_failures += 1;
                    }
                }
            }
        }
    }
}
