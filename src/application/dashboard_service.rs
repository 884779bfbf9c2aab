// Dashboard service - Use case for summarizing device telemetry
use crate::application::device_registry::DeviceRegistry;
use crate::domain::condition::{Condition, ConditionThresholds, classify};
use crate::domain::dashboard::{Dashboard, FleetSummary};
use crate::domain::device::{DeviceKind, FieldKind, FieldSpec};
use crate::domain::telemetry::{SeriesData, TelemetryState, TileData};

#[derive(Clone, Copy)]
pub struct DashboardService {
    registry: &'static DeviceRegistry,
}

impl DashboardService {
    pub fn new(registry: &'static DeviceRegistry) -> Self {
        Self { registry }
    }

    pub fn dashboard(&self, kind: DeviceKind) -> Dashboard {
        build_dashboard(
            &self.registry.store(kind).snapshot(),
            &self.registry.thresholds(kind),
        )
    }

    /// Overview across every device kind
    pub fn summary(&self) -> FleetSummary {
        let devices: Vec<_> = DeviceKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    self.registry.store(kind).snapshot(),
                    self.registry.thresholds(kind),
                )
            })
            .collect();
        build_summary(&devices)
    }

    /// `None` when the device has no such field
    pub fn series(&self, kind: DeviceKind, field: &str) -> Option<SeriesData> {
        let spec = kind.field(field)?;
        let state = self.registry.store(kind).snapshot();
        Some(SeriesData::new(
            spec.name.to_string(),
            field_title(spec.name),
            spec.unit.to_string(),
            state.series(spec.name),
        ))
    }
}

fn condition_of(state: &TelemetryState, thresholds: &ConditionThresholds) -> Condition {
    if state.connected {
        classify(state.kind, &state.latest, thresholds)
    } else {
        Condition::Offline
    }
}

pub fn build_dashboard(state: &TelemetryState, thresholds: &ConditionThresholds) -> Dashboard {
    let condition = condition_of(state, thresholds);

    let tiles = state
        .kind
        .schema()
        .iter()
        .filter_map(|spec| {
            state.latest.number(spec.name).map(|value| {
                TileData::new(
                    spec.name.to_string(),
                    field_title(spec.name),
                    spec.unit.to_string(),
                    value,
                    spec.precision,
                )
            })
        })
        .collect();

    // Flags make poor line charts
    let series = state
        .kind
        .schema()
        .iter()
        .filter(|spec| spec.kind != FieldKind::Flag)
        .map(|spec: &FieldSpec| {
            SeriesData::new(
                spec.name.to_string(),
                field_title(spec.name),
                spec.unit.to_string(),
                state.series(spec.name),
            )
        })
        .collect();

    Dashboard {
        title: state.kind.title().to_string(),
        connected: state.connected,
        source_mode: state.source_mode,
        condition,
        updated_at: state.latest.timestamp(),
        tiles,
        series,
    }
}

pub fn build_summary(devices: &[(TelemetryState, ConditionThresholds)]) -> FleetSummary {
    let online: Vec<_> = devices
        .iter()
        .filter(|(state, _)| state.connected)
        .map(|(state, thresholds)| (state, condition_of(state, thresholds)))
        .collect();
    let count = |wanted: Condition| online.iter().filter(|(_, c)| *c == wanted).count();

    FleetSummary {
        total_devices: devices.len(),
        online_devices: online.len(),
        optimal_devices: count(Condition::Optimal),
        warning_devices: count(Condition::Warning),
        critical_devices: count(Condition::Critical),
        average_temperature: average(online.iter().filter_map(|(s, _)| s.latest.number("temperature"))),
        average_humidity: average(online.iter().filter_map(|(s, _)| s.latest.number("humidity"))),
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// "soil_moisture" -> "Soil Moisture"
fn field_title(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
