use crate::application::polling_controller::PollSchedule;
use crate::domain::condition::{ConditionThresholds, GaugeBand};
use crate::domain::device::DeviceKind;
use crate::domain::telemetry::SourceMode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/telemetry";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Used when RUST_LOG is not set
    pub log_level: String,
    pub server: ServerSettings,
    pub thingspeak: ThingSpeakSettings,
    pub devices: DevicesSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            server: ServerSettings::default(),
            thingspeak: ThingSpeakSettings::default(),
            devices: DevicesSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ThingSpeakSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ThingSpeakSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.thingspeak.com".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DevicesSettings {
    pub soil: DeviceSettings,
    pub wheelchair: DeviceSettings,
}

impl Default for DevicesSettings {
    fn default() -> Self {
        Self {
            soil: DeviceSettings::default(),
            wheelchair: DeviceSettings {
                channel_id: "2954859".into(),
                ..DeviceSettings::default()
            },
        }
    }
}

impl DevicesSettings {
    pub fn for_kind(&self, kind: DeviceKind) -> &DeviceSettings {
        match kind {
            DeviceKind::Soil => &self.soil,
            DeviceKind::Wheelchair => &self.wheelchair,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceSettings {
    pub channel_id: String,
    /// Read API key; empty for public channels
    pub api_key: String,
    pub poll_interval_secs: u64,
    pub backfill: usize,
    pub jitter: f64,
    pub initial_mode: SourceMode,
    pub auto_connect: bool,
    /// Simulator baseline overrides by field name
    pub baseline: HashMap<String, f64>,
    pub thresholds: ThresholdSettings,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            api_key: String::new(),
            poll_interval_secs: 15,
            backfill: 30,
            jitter: 0.05,
            initial_mode: SourceMode::Simulated,
            auto_connect: false,
            baseline: HashMap::new(),
            thresholds: ThresholdSettings::default(),
        }
    }
}

impl DeviceSettings {
    pub fn schedule(&self) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            backfill: self.backfill,
        }
    }
}

/// Ideal ranges for the condition gauges. A band is given whole.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ThresholdSettings {
    pub temperature: BandSettings,
    pub humidity: BandSettings,
    pub obstacle_distance_cm: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        let defaults = ConditionThresholds::default();
        Self {
            temperature: defaults.temperature.into(),
            humidity: defaults.humidity.into(),
            obstacle_distance_cm: defaults.obstacle_distance_cm,
        }
    }
}

impl ThresholdSettings {
    pub fn thresholds(&self) -> ConditionThresholds {
        ConditionThresholds {
            temperature: self.temperature.band(),
            humidity: self.humidity.band(),
            obstacle_distance_cm: self.obstacle_distance_cm,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct BandSettings {
    pub ideal_min: f64,
    pub ideal_max: f64,
    pub warning_min: f64,
    pub warning_max: f64,
}

impl BandSettings {
    pub fn band(&self) -> GaugeBand {
        GaugeBand::new((self.ideal_min, self.ideal_max), (self.warning_min, self.warning_max))
    }
}

impl From<GaugeBand> for BandSettings {
    fn from(band: GaugeBand) -> Self {
        Self {
            ideal_min: band.optimal.0,
            ideal_max: band.optimal.1,
            warning_min: band.warning.0,
            warning_max: band.warning.1,
        }
    }
}

/// Optional file at `path` (any format the config crate knows, by
/// extension), overridden by `TELEMETRY__SECTION__KEY` variables.
pub fn load_settings(path: &str) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix("TELEMETRY").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
