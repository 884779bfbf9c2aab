// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::device_registry::DeviceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: &'static DeviceRegistry,
    pub dashboard_service: DashboardService,
}
