// Mapper from ThingSpeak feed entries to domain readings
use crate::domain::device::{DeviceKind, FieldKind, FieldSource, servo_angle_from_joystick};
use crate::domain::reading::{FieldValue, Reading};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// One entry of a channel feed. Values arrive as strings (`"23.9"`), as
/// numbers, or as null when the device never wrote the slot.
#[derive(Debug, Deserialize)]
pub struct FeedEntry {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub entry_id: Option<u64>,
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelFeed {
    #[serde(default)]
    pub channel: Option<ChannelInfo>,
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelInfo {
    #[serde(default)]
    pub name: Option<String>,
}

/// Missing or unparseable values fall back to zero (false for flags)
/// instead of dropping the whole reading.
pub fn feed_to_reading(kind: DeviceKind, entry: &FeedEntry, received_at: DateTime<Utc>) -> Reading {
    let timestamp = entry
        .created_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(received_at);

    let slot_number = |slot: u8| -> f64 {
        entry
            .fields
            .get(&format!("field{}", slot))
            .and_then(parse_number)
            .unwrap_or(0.0)
    };

    let fields: Vec<_> = kind
        .schema()
        .iter()
        .map(|spec| {
            let raw = match spec.source {
                FieldSource::Slot(slot) => slot_number(slot),
                FieldSource::ServoFromJoystickX => {
                    let joystick_x = kind
                        .schema()
                        .iter()
                        .find(|f| f.name == "joystick_x")
                        .and_then(|f| match f.source {
                            FieldSource::Slot(slot) => Some(slot_number(slot)),
                            FieldSource::ServoFromJoystickX => None,
                        })
                        .unwrap_or(0.0);
                    servo_angle_from_joystick(joystick_x)
                }
            };
            let value = match spec.kind {
                FieldKind::Flag => FieldValue::Flag(raw != 0.0),
                FieldKind::Integer => FieldValue::Number(raw.round()),
                FieldKind::Float => FieldValue::Number(raw),
            };
            (spec.name, value)
        })
        .collect();

    Reading::new(timestamp, fields)
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim() {
            "true" => Some(1.0),
            "false" => Some(0.0),
            other => other.parse::<f64>().ok().filter(|v| v.is_finite()),
        },
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
