// Presentation layer - HTTP surface over the device registry
pub mod app_state;
pub mod handlers;
