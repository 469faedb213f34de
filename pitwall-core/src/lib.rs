//! Pitwall Core Library
//!
//! This crate provides the telemetry data model, the race-condition metrics
//! analyzer and the rule-based fallback strategy shared by the sources and
//! the server.

pub mod analysis;
pub mod model;
pub mod strategy;
pub mod units;

pub use analysis::analyze;
pub use model::{
    DriverProfile, DrivingStyle, FieldMask, PrecomputedMetrics, RaceMetrics, RawFrame,
    StrategyInsight, TelemetryPoint, TireWear, Weather,
};
pub use strategy::fallback_strategy;
