//! Type-safe wrappers for the physical quantities carried by a telemetry point
//!
//! Values are stored at full precision so that continuity-carrying state
//! (tire wear, brake temperature, fuel) never accumulates rounding error.
//! Rounding happens only on serialization, at the precision the dashboard
//! displays.

use serde::{Deserialize, Serialize};

fn round0<S: serde::Serializer>(val: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f32(val.round())
}

fn round1<S: serde::Serializer>(val: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f32((*val * 10.0).round() / 10.0)
}

fn round2<S: serde::Serializer>(val: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f32((*val * 100.0).round() / 100.0)
}

/// Kilometres per hour
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Kph(#[serde(serialize_with = "round0")] pub f32);

/// Revolutions per minute
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Rpm(#[serde(serialize_with = "round0")] pub f32);

/// Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Celsius(#[serde(serialize_with = "round0")] pub f32);

impl Celsius {
    /// Create a temperature clamped to `[min, max]`
    pub fn clamped(value: f32, min: f32, max: f32) -> Self {
        Self(value.clamp(min, max))
    }
}

/// Kilograms (fuel load)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Kilograms(#[serde(serialize_with = "round2")] pub f32);

/// Seconds (gaps, lap durations)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(#[serde(serialize_with = "round2")] pub f32);

/// Percentage on the 0-100 scale the dashboard uses for pedals and tire life
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round1")] pub f32);

impl Percent {
    /// Create a new percentage, clamping to [0.0, 100.0]
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 100.0))
    }
}
