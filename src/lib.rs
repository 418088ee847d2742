pub mod adapters;
pub mod configuration;
pub mod domain;
pub mod monitoring;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod utils;
