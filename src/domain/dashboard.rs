// Dashboard domain model
use super::condition::Condition;
use super::telemetry::{SeriesData, SourceMode, TileData};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub connected: bool,
    pub source_mode: SourceMode,
    pub condition: Condition,
    pub updated_at: DateTime<Utc>,
    pub tiles: Vec<TileData>,
    pub series: Vec<SeriesData>,
}

/// Cross-device overview. Condition counts and averages cover online
/// devices only; an average is `None` when no online device reports it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    pub total_devices: usize,
    pub online_devices: usize,
    pub optimal_devices: usize,
    pub warning_devices: usize,
    pub critical_devices: usize,
    pub average_temperature: Option<f64>,
    pub average_humidity: Option<f64>,
}
