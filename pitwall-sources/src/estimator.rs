//! Physical-state estimator
//!
//! Coarse empirical models for the quantities a recording does not carry:
//! per-corner tire wear, tire and brake temperature, and fuel load. Each
//! step is a pure function of the previous state, one raw frame, the time
//! elapsed since the previous frame and the session weather.

use pitwall_core::model::{BRAKE_TEMP_MAX, BRAKE_TEMP_MIN, TIRE_TEMP_MAX, TIRE_TEMP_MIN};
use pitwall_core::units::*;
use pitwall_core::{RawFrame, TireWear, Weather};

/// Smallest time step the models integrate over (seconds)
pub const MIN_STEP_SECS: f32 = 0.01;
/// Largest time step; longer gaps (a paused stream) count as this much
pub const MAX_STEP_SECS: f32 = 1.0;

/// Default fuel tank size for the series (kg)
pub const DEFAULT_FUEL_CAPACITY_KG: f32 = 35.0;

// Tire wear rate weights per unit of normalized input
const WEAR_BRAKE: f32 = 0.02;
const WEAR_STEERING: f32 = 0.015;
const WEAR_LATERAL: f32 = 0.01;
const FRONT_RIGHT_STEERING_FACTOR: f32 = 1.2;
const REAR_LEFT_BRAKE_FACTOR: f32 = 0.8;
const REAR_RIGHT_BRAKE_FACTOR: f32 = 0.9;

const TRACK_OVER_AMBIENT: f32 = 20.0;
const MAX_SPEED_KPH: f32 = 260.0;

const BRAKE_COOLING_RATE: f32 = 0.02;
const BRAKE_HEATING_RATE: f32 = 50.0;

/// Fuel burned per second at full throttle (kg)
const FUEL_BURN_RATE: f32 = 0.008;

/// Quantities that carry over from one frame to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalState {
    pub tire_wear: TireWear,
    pub brake_temp: Celsius,
    pub fuel_load: Kilograms,
}

impl PhysicalState {
    /// State at the start of a stint
    pub fn initial(fuel_capacity_kg: f32) -> Self {
        Self {
            tire_wear: TireWear::new(95.0, 93.0, 96.0, 94.0),
            brake_temp: Celsius(250.0),
            fuel_load: Kilograms(DEFAULT_FUEL_CAPACITY_KG.min(fuel_capacity_kg)),
        }
    }
}

impl Default for PhysicalState {
    fn default() -> Self {
        Self::initial(DEFAULT_FUEL_CAPACITY_KG)
    }
}

/// Per-frame values computed alongside the state update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReadings {
    pub speed: Kph,
    /// Combined front/rear pressure expressed as a brake percentage
    pub brake: Percent,
    pub tire_temp: Celsius,
}

#[derive(Debug, Clone, Copy)]
pub struct Estimator {
    fuel_capacity_kg: f32,
}

impl Estimator {
    pub fn new(fuel_capacity_kg: f32) -> Self {
        Self {
            fuel_capacity_kg: fuel_capacity_kg.max(0.0),
        }
    }

    pub fn initial_state(&self) -> PhysicalState {
        PhysicalState::initial(self.fuel_capacity_kg)
    }

    /// Advance the physical state across one raw frame
    pub fn step(
        &self,
        state: &PhysicalState,
        frame: &RawFrame,
        elapsed_secs: f32,
        weather: &Weather,
    ) -> (PhysicalState, FrameReadings) {
        let dt = elapsed_secs.clamp(MIN_STEP_SECS, MAX_STEP_SECS);
        let brake_total = frame.combined_brake().max(0.0);
        let steering = frame.steering.abs();
        let lateral_g = frame.accy.abs();
        let speed = frame.speed_kph();

        let wear = &state.tire_wear;
        let tire_wear = TireWear {
            front_left: wear_step(wear.front_left, brake_total, steering, lateral_g, dt),
            front_right: wear_step(
                wear.front_right,
                brake_total,
                steering * FRONT_RIGHT_STEERING_FACTOR,
                lateral_g,
                dt,
            ),
            rear_left: wear_step(
                wear.rear_left,
                brake_total * REAR_LEFT_BRAKE_FACTOR,
                steering,
                lateral_g,
                dt,
            ),
            rear_right: wear_step(
                wear.rear_right,
                brake_total * REAR_RIGHT_BRAKE_FACTOR,
                steering,
                lateral_g,
                dt,
            ),
        };

        let tire_temp = tire_temperature(brake_total, lateral_g, speed.0, weather.air_temp.0);
        let brake_temp = brake_temperature(state.brake_temp.0, brake_total, speed.0, dt);

        let throttle = frame.throttle.clamp(0.0, 100.0);
        let fuel = state.fuel_load.0 - (throttle / 100.0) * FUEL_BURN_RATE * dt;
        let fuel_load = Kilograms(fuel.clamp(0.0, self.fuel_capacity_kg));

        let next = PhysicalState {
            tire_wear,
            brake_temp,
            fuel_load,
        };
        let readings = FrameReadings {
            speed,
            brake: Percent::new(brake_total / 2.0),
            tire_temp,
        };

        (next, readings)
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(DEFAULT_FUEL_CAPACITY_KG)
    }
}

/// Wear never recovers: the rate is floored at zero and so is the result
fn wear_step(current: Percent, brake_total: f32, steering: f32, lateral_g: f32, dt: f32) -> Percent {
    let rate = (brake_total / 100.0) * WEAR_BRAKE
        + (steering / 180.0) * WEAR_STEERING
        + (lateral_g / 2.0) * WEAR_LATERAL;
    Percent::new(current.0 - rate.max(0.0) * dt)
}

fn tire_temperature(brake_total: f32, lateral_g: f32, speed_kph: f32, ambient: f32) -> Celsius {
    let base = ambient + TRACK_OVER_AMBIENT;
    let brake_heat = (brake_total / 100.0) * 15.0;
    let cornering_heat = lateral_g * 5.0;
    let speed_heat = (speed_kph / MAX_SPEED_KPH) * 10.0;
    Celsius::clamped(
        base + brake_heat + cornering_heat + speed_heat,
        TIRE_TEMP_MIN,
        TIRE_TEMP_MAX,
    )
}

fn brake_temperature(current: f32, brake_total: f32, speed_kph: f32, dt: f32) -> Celsius {
    let cooling = (current - BRAKE_TEMP_MIN) * BRAKE_COOLING_RATE * dt;
    let heating = (brake_total / 100.0) * (speed_kph / 100.0) * BRAKE_HEATING_RATE * dt;
    Celsius::clamped(current - cooling + heating, BRAKE_TEMP_MIN, BRAKE_TEMP_MAX)
}
