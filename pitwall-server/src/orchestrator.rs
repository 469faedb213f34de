//! Stream orchestrator
//!
//! One tick produces at most one telemetry point: recorded frames are
//! preferred, synthetic frames are generated from the latest metrics when
//! the selected car has no recording. Every emitted point lands in the
//! bounded history, and metrics are recalculated from it unless precomputed
//! metrics exist for the car.

use crate::history::TelemetryHistory;
use pitwall_core::analysis::{analyze, lap_pace_trend};
use pitwall_core::{DriverProfile, RaceMetrics, TelemetryPoint};
use pitwall_sources::{Estimator, FrameSourceLoader, FrameStreamer, SyntheticGenerator};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the most recent telemetry point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySource {
    None,
    Recorded,
    Synthetic,
}

/// Where the current metrics snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSource {
    None,
    Precomputed,
    Calculated,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub driver: DriverProfile,
    pub telemetry_source: TelemetrySource,
    pub metrics_source: MetricsSource,
    pub recorded_frames: usize,
    pub history_len: usize,
    pub frames_emitted: u64,
}

pub struct StreamOrchestrator {
    loader: Arc<FrameSourceLoader>,
    estimator: Estimator,
    generator: SyntheticGenerator,
    driver: DriverProfile,
    streamer: FrameStreamer,
    history: TelemetryHistory,
    precomputed: Option<RaceMetrics>,
    calculated: Option<RaceMetrics>,
    telemetry_source: TelemetrySource,
    frames_emitted: u64,
}

impl StreamOrchestrator {
    pub fn new(
        loader: Arc<FrameSourceLoader>,
        driver: DriverProfile,
        history_capacity: usize,
        fuel_capacity_kg: f32,
    ) -> Self {
        let estimator = Estimator::new(fuel_capacity_kg);
        let streamer = build_streamer(&loader, &driver, estimator);
        let precomputed = load_precomputed(&loader, &driver);

        Self {
            loader,
            estimator,
            generator: SyntheticGenerator::new(fuel_capacity_kg),
            driver,
            streamer,
            history: TelemetryHistory::new(history_capacity),
            precomputed,
            calculated: None,
            telemetry_source: TelemetrySource::None,
            frames_emitted: 0,
        }
    }

    /// Produce the next telemetry point, stamped `now_ms` when it carries no
    /// recorded timestamp. Returns `None` when there is no recording and no
    /// metrics to synthesize from yet.
    pub fn tick(&mut self, now_ms: i64) -> Option<TelemetryPoint> {
        let point = match self.streamer.next_frame_at(now_ms) {
            Some(point) => {
                self.set_telemetry_source(TelemetrySource::Recorded);
                point
            }
            None => {
                let Some(metrics) = self.metrics() else {
                    debug!("No recording or metrics for {} yet, skipping tick", self.driver.id);
                    return None;
                };
                self.set_telemetry_source(TelemetrySource::Synthetic);
                self.generator.generate(&metrics, self.frames_emitted, now_ms)
            }
        };

        self.frames_emitted += 1;
        self.history.push(point.clone());

        if self.precomputed.is_none() {
            let metrics = analyze(
                self.history.window(),
                self.streamer.lap_times(),
                self.streamer.weather(),
            );
            if self.calculated.is_none() {
                info!("Calculating metrics from telemetry for {}", self.driver.id);
            }
            self.calculated = Some(metrics);
        }

        Some(point)
    }

    /// Precomputed metrics when available, else the latest calculated ones
    pub fn metrics(&self) -> Option<RaceMetrics> {
        self.precomputed.or(self.calculated)
    }

    pub fn metrics_source(&self) -> MetricsSource {
        if self.precomputed.is_some() {
            MetricsSource::Precomputed
        } else if self.calculated.is_some() {
            MetricsSource::Calculated
        } else {
            MetricsSource::None
        }
    }

    pub fn telemetry_source(&self) -> TelemetrySource {
        self.telemetry_source
    }

    /// Discard the current streamer and start over for another car.
    /// Precomputed metrics are looked up again for the new car.
    pub fn select_driver(&mut self, driver: DriverProfile) {
        info!("Switching telemetry to {} ({})", driver.name, driver.id);
        self.streamer = build_streamer(&self.loader, &driver, self.estimator);
        self.precomputed = load_precomputed(&self.loader, &driver);
        self.driver = driver;
        self.history.clear();
        self.calculated = None;
        self.telemetry_source = TelemetrySource::None;
        self.frames_emitted = 0;
    }

    /// Rewind the recording and restore the car's initial physical state
    pub fn reset(&mut self) {
        self.streamer.reset();
        self.history.clear();
        self.frames_emitted = 0;
    }

    pub fn driver(&self) -> &DriverProfile {
        &self.driver
    }

    pub fn latest(&self) -> Option<&TelemetryPoint> {
        self.history.latest()
    }

    pub fn history(&self) -> Vec<TelemetryPoint> {
        self.history.to_vec()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn streamer(&self) -> &FrameStreamer {
        &self.streamer
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            driver: self.driver.clone(),
            telemetry_source: self.telemetry_source,
            metrics_source: self.metrics_source(),
            recorded_frames: self.streamer.frame_count(),
            history_len: self.history.len(),
            frames_emitted: self.frames_emitted,
        }
    }

    fn set_telemetry_source(&mut self, source: TelemetrySource) {
        if self.telemetry_source != source {
            info!(
                "Telemetry source for {} is now {:?}",
                self.driver.id, source
            );
            self.telemetry_source = source;
        }
    }
}

fn build_streamer(
    loader: &FrameSourceLoader,
    driver: &DriverProfile,
    estimator: Estimator,
) -> FrameStreamer {
    let mut streamer = FrameStreamer::new(driver.id.clone(), driver.number, estimator);
    streamer.initialize(loader);
    streamer
}

fn load_precomputed(loader: &FrameSourceLoader, driver: &DriverProfile) -> Option<RaceMetrics> {
    let row = loader.precomputed_for(driver.number)?;
    let trend = lap_pace_trend(&loader.load_lap_times(driver.number));
    info!("Using precomputed metrics for car #{}", driver.number);
    Some(row.to_race_metrics(trend, &loader.load_weather()))
}
