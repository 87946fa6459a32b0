//! Core collector loop for gridlog
//!
//! One poll cycle takes a sample, appends it to the timeseries and publishes
//! it as the current state. Sink failures are logged and counted; they never
//! stop the loop.

use crate::logging::{StructuredLogger, get_logger};
use crate::persistence::{StateDocument, StatePublisher};
use crate::sampler::{Sample, Sampler};
use crate::scheduler::{Scheduler, SchedulerStats, Tick};
use crate::session::DeviceApi;
use crate::timeseries::TimeseriesSink;
use tokio::sync::watch;

mod types;

pub use types::{DriverCounters, DriverState};

/// Main collector driver
pub struct TelemetryDriver {
    /// Gateway connection used for every tick
    api: Box<dyn DeviceApi>,

    sampler: Sampler,

    sink: TimeseriesSink,

    /// Disabled when no state file is configured
    publisher: Option<StatePublisher>,

    state: watch::Sender<DriverState>,

    counters: DriverCounters,

    last_sample: Option<Sample>,

    logger: StructuredLogger,
}

impl TelemetryDriver {
    pub fn new(
        api: Box<dyn DeviceApi>,
        sink: TimeseriesSink,
        publisher: Option<StatePublisher>,
    ) -> Self {
        let (state, _) = watch::channel(DriverState::Initializing);
        let logger = get_logger("driver");
        logger.info(&format!(
            "Writing timeseries to {}, state file {}",
            sink.destination(),
            publisher
                .as_ref()
                .map(|p| p.path().display().to_string())
                .unwrap_or_else(|| "disabled".to_string())
        ));
        Self {
            api,
            sampler: Sampler::new(),
            sink,
            publisher,
            state,
            counters: DriverCounters::default(),
            last_sample: None,
            logger,
        }
    }

    /// Watch driver state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    pub fn counters(&self) -> DriverCounters {
        self.counters
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.last_sample.as_ref()
    }

    /// Execute one sample, append, publish sequence
    pub async fn poll_cycle(&mut self) -> Sample {
        let sample = self.sampler.sample(self.api.as_ref()).await;
        self.counters.total_polls = self.counters.total_polls.saturating_add(1);

        if let Err(e) = self.sink.append(&sample) {
            self.counters.append_failures += 1;
            self.logger
                .error(&format!("Timeseries append failed: {}", e));
        }

        if let Some(publisher) = &self.publisher
            && let Err(e) = publisher.publish(&StateDocument::from(&sample))
        {
            self.counters.publish_failures += 1;
            self.logger.error(&format!("State publish failed: {}", e));
        }

        self.last_sample = Some(sample.clone());
        sample
    }

    /// Run poll cycles on the scheduler's cadence until `shutdown` turns true
    pub async fn run(
        &mut self,
        scheduler: &Scheduler,
        shutdown: watch::Receiver<bool>,
    ) -> SchedulerStats {
        self.state.send_replace(DriverState::Running);
        let stats = scheduler.run(&mut *self, shutdown).await;
        self.state.send_replace(DriverState::Stopped);

        let counters = self.counters;
        self.logger.info(&format!(
            "Driver stopped: {} polls, {} overruns, {} append failures, {} publish failures",
            counters.total_polls,
            stats.overruns,
            counters.append_failures,
            counters.publish_failures
        ));
        stats
    }
}

#[async_trait::async_trait]
impl Tick for TelemetryDriver {
    async fn tick(&mut self) {
        self.poll_cycle().await;
    }
}
