// Device kinds and their fixed field schemas
use super::reading::{FieldValue, Reading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Full-scale value of the wheelchair joystick ADC (12 bit)
pub const JOYSTICK_MAX: f64 = 4095.0;
/// Servo sweep the joystick X axis is mapped onto
pub const SERVO_MAX_DEGREES: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Soil,
    Wheelchair,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::Soil, DeviceKind::Wheelchair];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Soil => "soil",
            DeviceKind::Wheelchair => "wheelchair",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DeviceKind::Soil => "Soil Monitoring System",
            DeviceKind::Wheelchair => "Smart Wheelchair",
        }
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            DeviceKind::Soil => SOIL_FIELDS,
            DeviceKind::Wheelchair => WHEELCHAIR_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.schema().iter().find(|f| f.name == name)
    }

    /// Reading made of the schema baselines, stamped `timestamp`
    pub fn baseline_reading(&self, timestamp: DateTime<Utc>) -> Reading {
        Reading::new(timestamp, self.schema().iter().map(|f| (f.name, f.baseline)))
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Float,
    Integer,
    Flag,
}

/// Where a field's value comes from on the live feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// ThingSpeak positional slot, `field1`..`field8`
    Slot(u8),
    /// Servo angle follows the joystick X position
    ServoFromJoystickX,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source: FieldSource,
    pub kind: FieldKind,
    pub baseline: FieldValue,
    /// Multiplier applied to the simulator's jitter fraction
    pub jitter_scale: f64,
    /// Absolute upper bound of simulator noise added to a zero baseline
    pub noise_floor: f64,
    pub unit: &'static str,
    pub precision: usize,
}

impl FieldSpec {
    const fn float(name: &'static str, slot: u8, baseline: f64, jitter_scale: f64, unit: &'static str, precision: usize) -> Self {
        Self {
            name,
            source: FieldSource::Slot(slot),
            kind: FieldKind::Float,
            baseline: FieldValue::Number(baseline),
            jitter_scale,
            noise_floor: 0.0,
            unit,
            precision,
        }
    }

    const fn integer(name: &'static str, slot: u8, baseline: f64, jitter_scale: f64, unit: &'static str) -> Self {
        Self {
            name,
            source: FieldSource::Slot(slot),
            kind: FieldKind::Integer,
            baseline: FieldValue::Number(baseline),
            jitter_scale,
            noise_floor: 0.0,
            unit,
            precision: 0,
        }
    }

    const fn with_noise_floor(mut self, noise_floor: f64) -> Self {
        self.noise_floor = noise_floor;
        self
    }
}

static SOIL_FIELDS: &[FieldSpec] = &[
    FieldSpec::float("temperature", 1, 15.30, 1.0, "°C", 1),
    FieldSpec::float("humidity", 2, 79.0, 1.0, "%", 1),
    FieldSpec::float("soil_moisture", 3, 0.00, 1.0, "%", 2).with_noise_floor(0.5),
    FieldSpec::float("light", 4, 497.043, 1.0, "lx", 0),
];

static WHEELCHAIR_FIELDS: &[FieldSpec] = &[
    FieldSpec::float("temperature", 1, 23.9, 0.1, "°C", 1),
    FieldSpec::float("humidity", 2, 42.3, 0.1, "%", 1),
    FieldSpec::float("distance", 3, 55.25, 0.2, "cm", 1),
    FieldSpec::integer("light_level", 4, 3418.0, 0.05, ""),
    FieldSpec::integer("heart_rate", 5, 75.0, 0.1, "bpm"),
    FieldSpec::integer("joystick_x", 6, 2048.0, 0.1, ""),
    FieldSpec::integer("joystick_y", 7, 2048.0, 0.1, ""),
    FieldSpec {
        name: "joystick_pressed",
        source: FieldSource::Slot(8),
        kind: FieldKind::Flag,
        baseline: FieldValue::Flag(false),
        jitter_scale: 0.0,
        noise_floor: 0.0,
        unit: "",
        precision: 0,
    },
    FieldSpec {
        name: "servo_angle",
        source: FieldSource::ServoFromJoystickX,
        kind: FieldKind::Integer,
        baseline: FieldValue::Number(90.0),
        jitter_scale: 0.05,
        noise_floor: 0.0,
        unit: "°",
        precision: 0,
    },
];

/// Map a raw joystick X position onto the servo sweep, clamped to 0..=180
pub fn servo_angle_from_joystick(joystick_x: f64) -> f64 {
    (joystick_x.clamp(0.0, JOYSTICK_MAX) * SERVO_MAX_DEGREES / JOYSTICK_MAX).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_use_distinct_slots() {
        for kind in DeviceKind::ALL {
            let mut slots: Vec<u8> = kind
                .schema()
                .iter()
                .filter_map(|f| match f.source {
                    FieldSource::Slot(slot) => Some(slot),
                    FieldSource::ServoFromJoystickX => None,
                })
                .collect();
            let total = slots.len();
            slots.sort_unstable();
            slots.dedup();
            assert_eq!(slots.len(), total, "duplicate slot in {} schema", kind);
            assert!(slots.iter().all(|s| (1..=8).contains(s)));
        }
    }

    #[test]
    fn test_baseline_reading() {
        let reading = DeviceKind::Wheelchair.baseline_reading(Utc::now());
        assert_eq!(reading.number("heart_rate"), Some(75.0));
        assert_eq!(reading.flag("joystick_pressed"), Some(false));
        assert_eq!(reading.fields().count(), 9);
    }

    #[test]
    fn test_servo_angle_from_joystick() {
        assert_eq!(servo_angle_from_joystick(0.0), 0.0);
        assert_eq!(servo_angle_from_joystick(2048.0), 90.0);
        assert_eq!(servo_angle_from_joystick(4095.0), 180.0);
        assert_eq!(servo_angle_from_joystick(9000.0), 180.0);
    }

    #[test]
    fn test_kind_parses_lowercase() {
        let kind: DeviceKind = serde_json::from_str("\"wheelchair\"").unwrap();
        assert_eq!(kind, DeviceKind::Wheelchair);
        assert!(DeviceKind::Soil.field("light").is_some());
        assert!(DeviceKind::Soil.field("heart_rate").is_none());
    }
}
