//! Synthetic frame generator
//!
//! Produces a plausible telemetry point from a metrics snapshot alone, for
//! vehicles with no recorded frames. Variation comes from a deterministic
//! hash of the frame index, so equal inputs always give equal points.

use crate::estimator::DEFAULT_FUEL_CAPACITY_KG;
use pitwall_core::model::{BRAKE_TEMP_MAX, BRAKE_TEMP_MIN, TIRE_TEMP_MAX, TIRE_TEMP_MIN};
use pitwall_core::units::*;
use pitwall_core::{RaceMetrics, TelemetryPoint, TireWear};

/// Lap number the synthetic session starts on
pub const FIRST_LAP: u32 = 12;
/// Frames per synthetic lap (~60 s at 10 Hz)
pub const FRAMES_PER_LAP: u64 = 600;

const SYNTHETIC_POSITION: u32 = 4;

/// Pseudo-random value in [0, 1) from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Jitter in [-amplitude, amplitude)
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

#[derive(Debug, Clone, Copy)]
pub struct SyntheticGenerator {
    fuel_capacity_kg: f32,
}

impl SyntheticGenerator {
    pub fn new(fuel_capacity_kg: f32) -> Self {
        Self {
            fuel_capacity_kg: fuel_capacity_kg.max(0.0),
        }
    }

    /// Build one point for `frame_index` (frames emitted so far this session)
    pub fn generate(
        &self,
        metrics: &RaceMetrics,
        frame_index: u64,
        timestamp_ms: i64,
    ) -> TelemetryPoint {
        let i = frame_index as f64;
        // Each channel gets its own seed offset so they vary independently
        let seed = |channel: f64| i * 7.31 + channel * 101.7;

        let throttle = if metrics.fuel_conservation_mode {
            60.0 + noise(seed(1.0)) * 20.0
        } else {
            70.0 + noise(seed(1.0)) * 30.0
        };
        let brake = if metrics.tire_stress_index > 70 {
            40.0 + noise(seed(2.0)) * 30.0
        } else {
            20.0 + noise(seed(2.0)) * 20.0
        };

        let speed = (120.0 + (throttle / 100.0) * 140.0 + jitter(seed(3.0), 10.0)).clamp(60.0, 260.0);
        let rpm =
            (2000.0 + (speed / 260.0) * 5500.0 + jitter(seed(4.0), 250.0)).clamp(1000.0, 8000.0);
        let gear = (speed / 45.0).floor().clamp(1.0, 6.0) as i8;

        let stress = metrics.tire_stress_index as f64;
        let avg_wear = 100.0 - stress * 0.8;
        let tire_wear = TireWear::new(
            (avg_wear + jitter(seed(5.0), 2.5)) as f32,
            (avg_wear - 1.0 + jitter(seed(6.0), 2.5)) as f32,
            (avg_wear + 2.0 + jitter(seed(7.0), 2.5)) as f32,
            (avg_wear + 1.0 + jitter(seed(8.0), 2.5)) as f32,
        );

        let tire_temp = 70.0 + (stress / 100.0) * 60.0 + jitter(seed(9.0), 5.0);
        let brake_temp = 200.0 + (brake / 100.0) * 500.0 + jitter(seed(10.0), 25.0);

        let fuel_base = if metrics.fuel_conservation_mode { 15.0 } else { 25.0 };
        let fuel = fuel_base - (i / 1000.0) * 2.0 + jitter(seed(11.0), 1.0);

        let gap_ahead = if metrics.attack_window {
            0.8 + noise(seed(12.0)) * 0.4
        } else {
            1.5 + noise(seed(12.0)) * 0.5
        };
        let gap_behind = 3.0 + noise(seed(13.0));

        TelemetryPoint {
            timestamp: timestamp_ms,
            lap: lap_for_frame(frame_index),
            speed: Kph(speed as f32),
            rpm: Rpm(rpm as f32),
            gear,
            throttle: Percent::new(throttle as f32),
            brake: Percent::new(brake as f32),
            tire_wear,
            tire_temp: Celsius::clamped(tire_temp as f32, TIRE_TEMP_MIN, TIRE_TEMP_MAX),
            brake_temp: Celsius::clamped(brake_temp as f32, BRAKE_TEMP_MIN, BRAKE_TEMP_MAX),
            fuel_load: Kilograms((fuel as f32).clamp(0.0, self.fuel_capacity_kg)),
            gap_ahead: Seconds(gap_ahead as f32),
            gap_behind: Seconds(gap_behind as f32),
            position: SYNTHETIC_POSITION,
        }
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_FUEL_CAPACITY_KG)
    }
}

pub fn lap_for_frame(frame_index: u64) -> u32 {
    FIRST_LAP.saturating_add((frame_index / FRAMES_PER_LAP).min(u32::MAX as u64) as u32)
}
