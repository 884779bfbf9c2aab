// Application layer - Telemetry state, polling lifecycle and use cases
pub mod dashboard_service;
pub mod device_registry;
pub mod polling_controller;
pub mod source_provider;
pub mod telemetry_store;
