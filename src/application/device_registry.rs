// Device registry - The one place that owns each device kind's store and controller
use crate::application::polling_controller::{PollingController, Providers};
use crate::application::telemetry_store::TelemetryStore;
use crate::domain::condition::ConditionThresholds;
use crate::domain::device::DeviceKind;
use crate::infrastructure::config::{DevicesSettings, ThingSpeakSettings};
use crate::infrastructure::simulated_provider::SimulatedProvider;
use crate::infrastructure::thingspeak_provider::ThingSpeakProvider;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<DeviceRegistry> = OnceLock::new();

/// Controllers (and their stores) are built lazily on first access and
/// never rebuilt, so each device kind has at most one of each.
pub struct DeviceRegistry {
    devices: DevicesSettings,
    thingspeak: ThingSpeakSettings,
    client: reqwest::Client,
    soil: OnceLock<Arc<PollingController>>,
    wheelchair: OnceLock<Arc<PollingController>>,
}

impl DeviceRegistry {
    /// Install the process-wide registry. Later calls return the registry
    /// from the first call and ignore their arguments.
    pub fn install(
        devices: DevicesSettings,
        thingspeak: ThingSpeakSettings,
        client: reqwest::Client,
    ) -> &'static DeviceRegistry {
        let mut installed = false;
        let registry = REGISTRY.get_or_init(|| {
            installed = true;
            DeviceRegistry::new(devices, thingspeak, client)
        });
        if !installed {
            tracing::debug!("device registry already installed, keeping existing one");
        }
        registry
    }

    pub fn global() -> Option<&'static DeviceRegistry> {
        REGISTRY.get()
    }

    /// A registry outside the global slot, for handler tests
    #[cfg(test)]
    pub(crate) fn leaked(
        devices: DevicesSettings,
        thingspeak: ThingSpeakSettings,
        client: reqwest::Client,
    ) -> &'static DeviceRegistry {
        Box::leak(Box::new(Self::new(devices, thingspeak, client)))
    }

    fn new(devices: DevicesSettings, thingspeak: ThingSpeakSettings, client: reqwest::Client) -> Self {
        Self {
            devices,
            thingspeak,
            client,
            soil: OnceLock::new(),
            wheelchair: OnceLock::new(),
        }
    }

    pub fn controller(&self, kind: DeviceKind) -> Arc<PollingController> {
        let slot = match kind {
            DeviceKind::Soil => &self.soil,
            DeviceKind::Wheelchair => &self.wheelchair,
        };
        slot.get_or_init(|| Arc::new(self.build_controller(kind))).clone()
    }

    pub fn store(&self, kind: DeviceKind) -> Arc<TelemetryStore> {
        self.controller(kind).store()
    }

    pub fn thresholds(&self, kind: DeviceKind) -> ConditionThresholds {
        self.devices.for_kind(kind).thresholds.thresholds()
    }

    /// Connect every device configured with `auto_connect`
    pub fn connect_configured(&self) {
        for kind in DeviceKind::ALL {
            if self.devices.for_kind(kind).auto_connect {
                self.controller(kind).connect();
            }
        }
    }

    /// Stop polling on every controller built so far
    pub fn disconnect_all(&self) {
        for slot in [&self.soil, &self.wheelchair] {
            if let Some(controller) = slot.get() {
                controller.disconnect();
            }
        }
    }

    fn build_controller(&self, kind: DeviceKind) -> PollingController {
        let settings = self.devices.for_kind(kind);
        tracing::info!(
            device = %kind,
            channel = %settings.channel_id,
            mode = ?settings.initial_mode,
            "creating telemetry controller"
        );

        let simulated = SimulatedProvider::new(kind, settings.jitter).with_baseline(&settings.baseline);
        let live = ThingSpeakProvider::new(
            self.client.clone(),
            kind,
            self.thingspeak.base_url.clone(),
            settings.channel_id.clone(),
            settings.api_key.clone(),
        );

        let store = Arc::new(TelemetryStore::new(kind, settings.initial_mode));
        PollingController::new(
            store,
            Providers {
                simulated: Arc::new(simulated),
                live: Arc::new(live),
            },
            settings.schedule(),
        )
    }
}
