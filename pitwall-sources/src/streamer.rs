//! Frame streamer
//!
//! Replays the recorded frames of one vehicle in order, looping back to the
//! first frame once the recording is exhausted, and carries the estimated
//! physical state across frames. A streamer is bound to a single vehicle
//! selection; switching vehicles means building a new one.

use crate::estimator::{Estimator, PhysicalState};
use crate::loader::FrameSourceLoader;
use pitwall_core::units::*;
use pitwall_core::{RawFrame, TelemetryPoint, Weather};
use std::sync::Arc;
use tracing::{debug, info};

/// Race position reported for the streamed car; there is no field model
pub const ESTIMATED_POSITION: u32 = 4;

/// Elapsed time assumed for the first frame after construction or reset
const FIRST_FRAME_SECS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamerStatus {
    Uninitialized,
    WithData,
    WithoutData,
}

/// Mutable per-session state of a streamer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamerState {
    /// Index of the next recorded frame to emit
    pub cursor: usize,
    /// Wall-clock time of the previous emission (ms since the Unix epoch)
    pub last_emit_ms: Option<i64>,
    pub physical: PhysicalState,
}

impl StreamerState {
    fn initial(estimator: &Estimator) -> Self {
        Self {
            cursor: 0,
            last_emit_ms: None,
            physical: estimator.initial_state(),
        }
    }
}

pub struct FrameStreamer {
    vehicle_id: String,
    vehicle_number: u32,
    estimator: Estimator,
    status: StreamerStatus,
    frames: Arc<[RawFrame]>,
    lap_times: Arc<[f32]>,
    weather: Weather,
    state: StreamerState,
}

impl FrameStreamer {
    pub fn new(vehicle_id: impl Into<String>, vehicle_number: u32, estimator: Estimator) -> Self {
        let state = StreamerState::initial(&estimator);
        Self {
            vehicle_id: vehicle_id.into(),
            vehicle_number,
            estimator,
            status: StreamerStatus::Uninitialized,
            frames: Arc::from(Vec::new()),
            lap_times: Arc::from(Vec::new()),
            weather: Weather::default(),
            state,
        }
    }

    /// Pull frames, lap times and weather from the loader. Only the first
    /// call does anything.
    pub fn initialize(&mut self, loader: &FrameSourceLoader) {
        if self.status != StreamerStatus::Uninitialized {
            return;
        }

        self.frames = loader.load_frames(&self.vehicle_id);
        self.lap_times = loader.load_lap_times(self.vehicle_number);
        self.weather = loader.load_weather();

        self.status = if self.frames.is_empty() {
            StreamerStatus::WithoutData
        } else {
            StreamerStatus::WithData
        };

        info!(
            "Streamer for {} (#{}) initialized: {} frames, {} lap times",
            self.vehicle_id,
            self.vehicle_number,
            self.frames.len(),
            self.lap_times.len()
        );
    }

    /// Next telemetry point, using `now_ms` as the emission time. Returns
    /// `None` unless the streamer was initialized with recorded frames.
    pub fn next_frame_at(&mut self, now_ms: i64) -> Option<TelemetryPoint> {
        if self.status != StreamerStatus::WithData {
            return None;
        }

        let raw = self.frames.get(self.state.cursor)?;
        let elapsed_secs = match self.state.last_emit_ms {
            Some(last) => (now_ms - last) as f32 / 1000.0,
            None => FIRST_FRAME_SECS,
        };

        let (physical, readings) =
            self.estimator
                .step(&self.state.physical, raw, elapsed_secs, &self.weather);

        let (gap_ahead, gap_behind) = estimated_gaps(now_ms);
        let point = TelemetryPoint {
            timestamp: if raw.timestamp > 0 { raw.timestamp } else { now_ms },
            lap: raw.lap,
            speed: readings.speed,
            rpm: Rpm(raw.rpm.max(0.0)),
            gear: raw.gear,
            throttle: Percent::new(raw.throttle),
            brake: readings.brake,
            tire_wear: physical.tire_wear,
            tire_temp: readings.tire_temp,
            brake_temp: physical.brake_temp,
            fuel_load: physical.fuel_load,
            gap_ahead,
            gap_behind,
            position: ESTIMATED_POSITION,
        };

        self.state.cursor += 1;
        if self.state.cursor >= self.frames.len() {
            debug!("Recording for {} exhausted, looping", self.vehicle_id);
            self.state.cursor = 0;
        }
        self.state.last_emit_ms = Some(now_ms);
        self.state.physical = physical;

        Some(point)
    }

    /// Rewind to the first frame and restore the initial physical state.
    /// Cached frames and lap times are kept.
    pub fn reset(&mut self) {
        self.state = StreamerState::initial(&self.estimator);
    }

    pub fn state(&self) -> &StreamerState {
        &self.state
    }

    pub fn status(&self) -> StreamerStatus {
        self.status
    }

    pub fn has_data(&self) -> bool {
        self.status == StreamerStatus::WithData
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn lap_times(&self) -> &[f32] {
        &self.lap_times
    }

    pub fn weather(&self) -> &Weather {
        &self.weather
    }
}

/// Smooth oscillating gaps to the cars ahead and behind
fn estimated_gaps(now_ms: i64) -> (Seconds, Seconds) {
    let t = now_ms as f64;
    let ahead = 1.5 + (t / 8000.0).sin() * 0.3;
    let behind = 3.2 + (t / 10000.0).cos() * 0.4;
    (Seconds(ahead.max(0.0) as f32), Seconds(behind.max(0.0) as f32))
}
