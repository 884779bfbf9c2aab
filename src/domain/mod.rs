// Domain layer - Device readings and derived views
pub mod condition;
pub mod dashboard;
pub mod device;
pub mod reading;
pub mod telemetry;
