pub mod api;
pub mod config;
pub mod models;
pub mod reconciler;
pub mod schema;
pub mod store;
pub mod telemetry;
