// Reading domain model - one immutable snapshot of device telemetry
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A single sensor value. Discrete signals (button state) are flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Flag(bool),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Number(value) => *value,
            FieldValue::Flag(true) => 1.0,
            FieldValue::Flag(false) => 0.0,
        }
    }
}

/// Timestamped set of named field values. There are no setters: a new
/// observation is always a new `Reading`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    timestamp: DateTime<Utc>,
    fields: BTreeMap<&'static str, FieldValue>,
}

impl Reading {
    pub fn new<I>(timestamp: DateTime<Utc>, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, FieldValue)>,
    {
        Self {
            timestamp,
            fields: fields.into_iter().collect(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).copied()
    }

    /// Numeric view of a field; flags read as 0/1
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).map(|v| v.as_f64())
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FieldValue::Flag(flag) => Some(flag),
            FieldValue::Number(value) => Some(value != 0.0),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        self.fields.iter().map(|(name, value)| (*name, *value))
    }
}
