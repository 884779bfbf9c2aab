// Simulated provider - Baseline readings with bounded jitter, no I/O
use crate::application::source_provider::{ProviderError, SourceProvider};
use crate::domain::device::{DeviceKind, FieldKind, FieldSpec};
use crate::domain::reading::{FieldValue, Reading};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Spacing of synthesized history points
const HISTORY_SPACING_SECS: i64 = 30;

pub struct SimulatedProvider {
    fields: Vec<(FieldSpec, FieldValue)>,
    jitter: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedProvider {
    /// `jitter` is the relative half-width of the noise band, e.g. 0.05 = ±5%
    pub fn new(kind: DeviceKind, jitter: f64) -> Self {
        Self {
            fields: kind.schema().iter().map(|f| (*f, f.baseline)).collect(),
            jitter: jitter.abs(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Override numeric baselines by field name; unknown names are ignored
    pub fn with_baseline(mut self, overrides: &HashMap<String, f64>) -> Self {
        for (spec, baseline) in &mut self.fields {
            if let Some(value) = overrides.get(spec.name) {
                *baseline = match spec.kind {
                    FieldKind::Flag => FieldValue::Flag(*value != 0.0),
                    FieldKind::Float | FieldKind::Integer => FieldValue::Number(*value),
                };
            }
        }
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    fn baseline_reading(&self, timestamp: DateTime<Utc>) -> Reading {
        Reading::new(timestamp, self.fields.iter().map(|(spec, value)| (spec.name, *value)))
    }

    fn jittered_reading(&self, timestamp: DateTime<Utc>) -> Reading {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let fields: Vec<_> = self
            .fields
            .iter()
            .map(|(spec, baseline)| (spec.name, self.jitter_value(&mut rng, spec, *baseline)))
            .collect();
        Reading::new(timestamp, fields)
    }

    fn jitter_value(&self, rng: &mut StdRng, spec: &FieldSpec, baseline: FieldValue) -> FieldValue {
        let FieldValue::Number(base) = baseline else {
            return baseline;
        };
        let value = if base == 0.0 && spec.noise_floor > 0.0 && self.jitter > 0.0 {
            // Relative jitter cannot move a zero baseline
            rng.gen_range(0.0..=spec.noise_floor)
        } else {
            let band = self.jitter * spec.jitter_scale;
            let factor = if band > 0.0 { rng.gen_range(-band..=band) } else { 0.0 };
            base + base * factor
        };
        match spec.kind {
            FieldKind::Integer => FieldValue::Number(value.round()),
            FieldKind::Float | FieldKind::Flag => FieldValue::Number(value),
        }
    }
}

#[async_trait]
impl SourceProvider for SimulatedProvider {
    async fn fetch_latest(&self) -> Result<Reading, ProviderError> {
        Ok(self.jittered_reading(Utc::now()))
    }

    /// `count` points 30 s apart ending now; the newest is the exact baseline
    async fn fetch_history(&self, count: usize) -> Result<Vec<Reading>, ProviderError> {
        let now = Utc::now();
        let readings = (0..count)
            .map(|i| {
                let age = (count - 1 - i) as i64;
                let timestamp = now - Duration::seconds(age * HISTORY_SPACING_SECS);
                if i + 1 == count {
                    self.baseline_reading(timestamp)
                } else {
                    self.jittered_reading(timestamp)
                }
            })
            .collect();
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within_band(value: f64, base: f64, band: f64) -> bool {
        let spread = (base * band).abs() + 1e-9;
        value >= base - spread && value <= base + spread
    }

    #[tokio::test]
    async fn test_latest_stays_in_jitter_band() {
        let provider = SimulatedProvider::new(DeviceKind::Soil, 0.1).with_seed(42);
        for _ in 0..200 {
            let reading = provider.fetch_latest().await.unwrap();
            assert!(within_band(reading.number("temperature").unwrap(), 15.30, 0.1));
            assert!(within_band(reading.number("light").unwrap(), 497.043, 0.1));
        }
    }

    #[tokio::test]
    async fn test_zero_baseline_gets_absolute_noise() {
        let provider = SimulatedProvider::new(DeviceKind::Soil, 0.05).with_seed(11);
        let mut moisture = Vec::new();
        for _ in 0..50 {
            let reading = provider.fetch_latest().await.unwrap();
            moisture.push(reading.number("soil_moisture").unwrap());
        }

        assert!(moisture.iter().all(|m| (0.0..=0.5).contains(m)));
        assert!(moisture.iter().any(|m| *m > 0.0), "soil moisture chart stays flat");

        // The pinned history point is still the exact baseline
        let history = provider.fetch_history(5).await.unwrap();
        assert_eq!(history.last().and_then(|r| r.number("soil_moisture")), Some(0.0));

        let still = SimulatedProvider::new(DeviceKind::Soil, 0.0);
        assert_eq!(still.fetch_latest().await.unwrap().number("soil_moisture"), Some(0.0));
    }

    #[tokio::test]
    async fn test_wheelchair_field_shapes() {
        let provider = SimulatedProvider::new(DeviceKind::Wheelchair, 0.05).with_seed(1);
        let reading = provider.fetch_latest().await.unwrap();

        assert_eq!(reading.get("joystick_pressed"), Some(FieldValue::Flag(false)));
        let heart_rate = reading.number("heart_rate").unwrap();
        assert_eq!(heart_rate, heart_rate.round());
        // Scale 0.1 on a 5% jitter keeps heart rate within ±0.5%
        assert!(within_band(heart_rate, 75.0, 0.005 + 0.01));
    }

    #[tokio::test]
    async fn test_history_spacing_and_pinned_latest() {
        let provider = SimulatedProvider::new(DeviceKind::Soil, 0.05).with_seed(3);
        let history = provider.fetch_history(30).await.unwrap();

        assert_eq!(history.len(), 30);
        let newest = history.last().unwrap();
        assert_eq!(newest.number("temperature"), Some(15.30));
        assert_eq!(newest.number("humidity"), Some(79.0));

        for pair in history.windows(2) {
            let gap = pair[1].timestamp() - pair[0].timestamp();
            assert_eq!(gap, Duration::seconds(HISTORY_SPACING_SECS));
        }
    }

    #[tokio::test]
    async fn test_baseline_override_and_zero_jitter() {
        let overrides = HashMap::from([
            ("temperature".to_string(), 22.5),
            ("humidity".to_string(), 45.0),
            ("unknown".to_string(), 1.0),
        ]);
        let provider = SimulatedProvider::new(DeviceKind::Soil, 0.0).with_baseline(&overrides);

        let reading = provider.fetch_latest().await.unwrap();
        assert_eq!(reading.number("temperature"), Some(22.5));
        assert_eq!(reading.number("humidity"), Some(45.0));
        assert_eq!(reading.number("light"), Some(497.043));
        assert!(provider.fetch_history(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_is_deterministic() {
        let a = SimulatedProvider::new(DeviceKind::Soil, 0.1).with_seed(9);
        let b = SimulatedProvider::new(DeviceKind::Soil, 0.1).with_seed(9);
        let ra = a.fetch_latest().await.unwrap();
        let rb = b.fetch_latest().await.unwrap();
        assert_eq!(ra.number("temperature"), rb.number("temperature"));
    }
}
