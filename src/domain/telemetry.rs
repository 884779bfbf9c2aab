// Telemetry data domain models
use super::device::DeviceKind;
use super::reading::Reading;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Most recent readings kept per device
pub const HISTORY_CAPACITY: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Simulated,
    Live,
}

impl SourceMode {
    pub fn toggled(self) -> Self {
        match self {
            SourceMode::Simulated => SourceMode::Live,
            SourceMode::Live => SourceMode::Simulated,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryState {
    pub kind: DeviceKind,
    pub connected: bool,
    pub source_mode: SourceMode,
    pub latest: Reading,
    /// Arrival order, oldest first
    pub history: VecDeque<Reading>,
}

impl TelemetryState {
    pub fn new(kind: DeviceKind, source_mode: SourceMode) -> Self {
        Self {
            kind,
            connected: false,
            source_mode,
            latest: kind.baseline_reading(Utc::now()),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Numeric series of one field over the history, in arrival order
    pub fn series(&self, field: &str) -> Vec<TimeSeriesPoint> {
        self.history
            .iter()
            .filter_map(|r| {
                r.number(field)
                    .map(|value| TimeSeriesPoint::new(r.timestamp().timestamp_millis(), value))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TileData {
    pub id: String,
    pub title: String,
    pub unit: String,
    pub value: f64,
    pub precision: usize,
    /// Value rounded to `precision` with its unit, e.g. "22.5 °C"
    pub display: String,
}

impl TileData {
    pub fn new(id: String, title: String, unit: String, value: f64, precision: usize) -> Self {
        let display = format_value(value, &unit, precision);
        Self {
            id,
            title,
            unit,
            value,
            precision,
            display,
        }
    }
}

fn format_value(value: f64, unit: &str, precision: usize) -> String {
    let value = format!("{:.*}", precision, value);
    match unit {
        "" => value,
        "%" | "°" => format!("{}{}", value, unit),
        unit => format!("{} {}", value, unit),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesData {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub points: Vec<TimeSeriesPoint>,
}

impl SeriesData {
    pub fn new(id: String, name: String, unit: String, points: Vec<TimeSeriesPoint>) -> Self {
        Self {
            id,
            name,
            unit,
            points,
        }
    }
}
