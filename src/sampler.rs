//! Sample assembly from the three gateway metric endpoints

use crate::logging::{StructuredLogger, get_logger};
use crate::session::{AGGREGATES_PATH, DeviceApi, FetchOutcome, GRID_STATUS_PATH, SOE_PATH};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;

/// `grid_status` value reported while the utility grid is connected
pub const GRID_CONNECTED: &str = "SystemGridConnected";

/// One normalized reading of the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    /// Battery state of charge, one decimal place
    pub percentage: Option<f64>,
    pub grid_up: bool,
    pub grid_watts: Option<i64>,
    pub solar_watts: Option<i64>,
    pub powerwall_watts: Option<i64>,
    pub home_watts: Option<i64>,
}

/// Instantaneous power per meter, whole watts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerFlows {
    pub grid: Option<i64>,
    pub solar: Option<i64>,
    pub powerwall: Option<i64>,
    pub home: Option<i64>,
}

impl Sample {
    /// Assemble a sample from the three fetch outcomes of one tick
    pub fn from_responses(
        timestamp: DateTime<Local>,
        grid_status: &FetchOutcome,
        soe: &FetchOutcome,
        aggregates: &FetchOutcome,
    ) -> Self {
        let grid_up = parse_grid_up(grid_status.data());
        let percentage = parse_percentage(soe.data());
        let flows = parse_flows(aggregates.data());

        Self {
            timestamp,
            percentage,
            grid_up,
            // Grid flow is meaningless while disconnected
            grid_watts: if grid_up { flows.grid } else { Some(0) },
            solar_watts: flows.solar,
            powerwall_watts: flows.powerwall,
            home_watts: flows.home,
        }
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// Round to one decimal place, halves away from zero
pub fn round_percentage(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to the nearest whole watt; non-finite readings are unknown
pub fn round_watts(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.round() as i64)
}

pub fn parse_grid_up(doc: Option<&Value>) -> bool {
    doc.and_then(|d| d.get("grid_status"))
        .and_then(Value::as_str)
        .is_some_and(|s| s == GRID_CONNECTED)
}

pub fn parse_percentage(doc: Option<&Value>) -> Option<f64> {
    doc.and_then(|d| d.get("percentage"))
        .and_then(Value::as_f64)
        .filter(|p| p.is_finite())
        .map(round_percentage)
}

/// Extract the four meters from an aggregates document independently
pub fn parse_flows(doc: Option<&Value>) -> PowerFlows {
    let meter = |name: &str| {
        doc.and_then(|d| d.get(name))
            .and_then(|m| m.get("instant_power"))
            .and_then(Value::as_f64)
            .and_then(round_watts)
    };
    PowerFlows {
        grid: meter("site"),
        solar: meter("solar"),
        powerwall: meter("battery"),
        home: meter("load"),
    }
}

/// Issues the per-tick metric fetches
pub struct Sampler {
    logger: StructuredLogger,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler {
    pub fn new() -> Self {
        Self {
            logger: get_logger("sampler"),
        }
    }

    /// Take one sample; exactly three upstream calls, no retries
    pub async fn sample(&self, api: &dyn DeviceApi) -> Sample {
        let timestamp = Local::now();
        let grid_status = api.fetch_json(GRID_STATUS_PATH, None).await;
        let soe = api.fetch_json(SOE_PATH, None).await;
        let aggregates = api.fetch_json(AGGREGATES_PATH, None).await;

        let sample = Sample::from_responses(timestamp, &grid_status, &soe, &aggregates);
        self.logger.debug(&format!(
            "Sample grid_up={} percentage={:?} grid={:?} solar={:?} powerwall={:?} home={:?}",
            sample.grid_up,
            sample.percentage,
            sample.grid_watts,
            sample.solar_watts,
            sample.powerwall_watts,
            sample.home_watts
        ));
        sample
    }
}
