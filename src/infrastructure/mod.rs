// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod feed_mapper;
pub mod simulated_provider;
pub mod thingspeak_provider;
