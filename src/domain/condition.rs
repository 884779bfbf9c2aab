// Gauge-band classification of readings
use super::device::DeviceKind;
use super::reading::Reading;
use serde::Serialize;

/// Ordered from best to worst so that `max` picks the worst condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Optimal,
    Warning,
    Critical,
    Offline,
}

/// Inclusive optimal range nested inside an inclusive warning range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeBand {
    pub optimal: (f64, f64),
    pub warning: (f64, f64),
}

impl GaugeBand {
    pub const fn new(optimal: (f64, f64), warning: (f64, f64)) -> Self {
        Self { optimal, warning }
    }

    pub fn classify(&self, value: f64) -> Condition {
        let within = |(min, max): (f64, f64)| value >= min && value <= max;
        if within(self.optimal) {
            Condition::Optimal
        } else if within(self.warning) {
            Condition::Warning
        } else {
            Condition::Critical
        }
    }
}

pub const SOIL_TEMPERATURE_BAND: GaugeBand = GaugeBand::new((18.0, 24.0), (15.0, 28.0));
pub const SOIL_HUMIDITY_BAND: GaugeBand = GaugeBand::new((30.0, 60.0), (20.0, 75.0));
/// Obstacles closer than this trip the wheelchair alert
pub const OBSTACLE_DISTANCE_CM: f64 = 30.0;

/// Per-device limits used by [`classify`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionThresholds {
    pub temperature: GaugeBand,
    pub humidity: GaugeBand,
    pub obstacle_distance_cm: f64,
}

impl Default for ConditionThresholds {
    fn default() -> Self {
        Self {
            temperature: SOIL_TEMPERATURE_BAND,
            humidity: SOIL_HUMIDITY_BAND,
            obstacle_distance_cm: OBSTACLE_DISTANCE_CM,
        }
    }
}

pub fn classify(kind: DeviceKind, reading: &Reading, thresholds: &ConditionThresholds) -> Condition {
    match kind {
        DeviceKind::Soil => [
            ("temperature", thresholds.temperature),
            ("humidity", thresholds.humidity),
        ]
        .iter()
        .filter_map(|(field, band)| reading.number(field).map(|v| band.classify(v)))
        .max()
        .unwrap_or(Condition::Optimal),
        DeviceKind::Wheelchair => match reading.number("distance") {
            Some(distance) if distance < thresholds.obstacle_distance_cm => Condition::Critical,
            _ => Condition::Optimal,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::FieldValue;
    use chrono::Utc;

    fn soil(temperature: f64, humidity: f64) -> Reading {
        Reading::new(
            Utc::now(),
            [
                ("temperature", FieldValue::Number(temperature)),
                ("humidity", FieldValue::Number(humidity)),
            ],
        )
    }

    #[test]
    fn test_soil_bands() {
        let limits = ConditionThresholds::default();
        assert_eq!(classify(DeviceKind::Soil, &soil(22.5, 45.0), &limits), Condition::Optimal);
        assert_eq!(classify(DeviceKind::Soil, &soil(26.8, 65.0), &limits), Condition::Warning);
        assert_eq!(classify(DeviceKind::Soil, &soil(32.1, 15.0), &limits), Condition::Critical);
        // Worst field wins
        assert_eq!(classify(DeviceKind::Soil, &soil(20.0, 80.0), &limits), Condition::Critical);
    }

    #[test]
    fn test_custom_ideal_range() {
        // A warmth-loving plant: 26.8 °C moves from warning to optimal
        let limits = ConditionThresholds {
            temperature: GaugeBand::new((24.0, 30.0), (20.0, 34.0)),
            ..ConditionThresholds::default()
        };
        assert_eq!(classify(DeviceKind::Soil, &soil(26.8, 45.0), &limits), Condition::Optimal);
        assert_eq!(classify(DeviceKind::Soil, &soil(22.5, 45.0), &limits), Condition::Warning);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        assert_eq!(SOIL_TEMPERATURE_BAND.classify(18.0), Condition::Optimal);
        assert_eq!(SOIL_TEMPERATURE_BAND.classify(28.0), Condition::Warning);
        assert_eq!(SOIL_TEMPERATURE_BAND.classify(28.1), Condition::Critical);
    }

    #[test]
    fn test_wheelchair_obstacle() {
        let near = Reading::new(Utc::now(), [("distance", FieldValue::Number(12.0))]);
        let far = Reading::new(Utc::now(), [("distance", FieldValue::Number(55.25))]);
        let limits = ConditionThresholds::default();
        assert_eq!(classify(DeviceKind::Wheelchair, &near, &limits), Condition::Critical);
        assert_eq!(classify(DeviceKind::Wheelchair, &far, &limits), Condition::Optimal);

        let cautious = ConditionThresholds {
            obstacle_distance_cm: 60.0,
            ..limits
        };
        assert_eq!(classify(DeviceKind::Wheelchair, &far, &cautious), Condition::Critical);
    }
}
