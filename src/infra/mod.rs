//! Adapters behind the engine's external-dependency traits, plus telemetry.

pub mod cache;
pub mod memory;
pub mod telemetry;
