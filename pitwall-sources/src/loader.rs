//! Frame source loader
//!
//! Fetches recorded frames, lap-time history, weather and precomputed
//! metrics from a [`DataStore`] and memoizes every result for the lifetime
//! of the loader. Absence and malformed payloads resolve to empty results or
//! defaults and are logged; nothing here fails the caller.

use crate::store::{DataStore, StoreError};
use parking_lot::Mutex;
use pitwall_core::units::Celsius;
use pitwall_core::{PrecomputedMetrics, RawFrame, Weather};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

pub const TELEMETRY_DIR: &str = "telemetry";
pub const LAP_TIMES_FILE: &str = "lap_times.json";
pub const WEATHER_FILE: &str = "weather.csv";
pub const RACE_METRICS_FILE: &str = "race_metrics.csv";

// Weather CSV column positions (semicolon separated)
const WEATHER_AIR_TEMP_COL: usize = 2;
const WEATHER_TRACK_TEMP_COL: usize = 3;
const WEATHER_HUMIDITY_COL: usize = 4;

/// Relative path of the recorded telemetry for a vehicle
pub fn telemetry_path(vehicle_id: &str) -> String {
    let safe_id = vehicle_id.replace(['/', '\\'], "_");
    format!("{}/{}_telemetry.json", TELEMETRY_DIR, safe_id)
}

pub struct FrameSourceLoader {
    store: Box<dyn DataStore>,
    frames: Mutex<HashMap<String, Arc<[RawFrame]>>>,
    lap_times: Mutex<HashMap<u32, Arc<[f32]>>>,
    weather: OnceLock<Weather>,
    precomputed: OnceLock<Arc<[PrecomputedMetrics]>>,
}

impl FrameSourceLoader {
    pub fn new(store: impl DataStore + 'static) -> Self {
        info!("Reading race data from {}", store.describe());
        Self {
            store: Box::new(store),
            frames: Mutex::new(HashMap::new()),
            lap_times: Mutex::new(HashMap::new()),
            weather: OnceLock::new(),
            precomputed: OnceLock::new(),
        }
    }

    /// Recorded frames for a vehicle, in recording order; empty if none exist
    pub fn load_frames(&self, vehicle_id: &str) -> Arc<[RawFrame]> {
        // The lock is held across the fetch so concurrent callers for the
        // same vehicle never read the store twice.
        let mut cache = self.frames.lock();
        if let Some(frames) = cache.get(vehicle_id) {
            return frames.clone();
        }

        let path = telemetry_path(vehicle_id);
        let frames: Arc<[RawFrame]> = match self.read_json::<Vec<RawFrame>>(&path) {
            Ok(Some(frames)) if !frames.is_empty() => {
                info!(
                    "Using recorded telemetry for {}: {} frames",
                    vehicle_id,
                    frames.len()
                );
                frames.into()
            }
            Ok(Some(_)) => {
                warn!(
                    "Recorded telemetry for {} is empty, frames will be synthesized",
                    vehicle_id
                );
                Arc::from(Vec::new())
            }
            Ok(None) => {
                warn!(
                    "No recorded telemetry for {} in {}, frames will be synthesized",
                    vehicle_id,
                    self.store.describe()
                );
                Arc::from(Vec::new())
            }
            Err(e) => {
                warn!("Could not load telemetry for {}: {}", vehicle_id, e);
                Arc::from(Vec::new())
            }
        };

        cache.insert(vehicle_id.to_string(), frames.clone());
        frames
    }

    /// Lap durations in seconds for a car number; empty if none exist
    pub fn load_lap_times(&self, vehicle_number: u32) -> Arc<[f32]> {
        let mut cache = self.lap_times.lock();
        if let Some(laps) = cache.get(&vehicle_number) {
            return laps.clone();
        }

        let laps: Arc<[f32]> = match self.read_json::<HashMap<String, Vec<f32>>>(LAP_TIMES_FILE) {
            Ok(Some(mut all)) => {
                let laps = all.remove(&vehicle_number.to_string()).unwrap_or_default();
                if laps.is_empty() {
                    warn!("No lap times recorded for car #{}", vehicle_number);
                } else {
                    info!("Using {} recorded lap times for car #{}", laps.len(), vehicle_number);
                }
                laps.into()
            }
            Ok(None) => {
                warn!("Lap times file not found, pace trend stays neutral");
                Arc::from(Vec::new())
            }
            Err(e) => {
                warn!("Could not load lap times: {}", e);
                Arc::from(Vec::new())
            }
        };

        cache.insert(vehicle_number, laps.clone());
        laps
    }

    /// Session weather, or the defaults when no weather record is available
    pub fn load_weather(&self) -> Weather {
        *self.weather.get_or_init(|| match self.read_weather() {
            Ok(Some(weather)) => {
                info!(
                    "Using recorded weather: {:.1}°C, {:.0}% humidity",
                    weather.air_temp.0, weather.humidity
                );
                weather
            }
            Ok(None) => {
                warn!("No weather record, using defaults");
                Weather::default()
            }
            Err(e) => {
                warn!("Could not load weather data, using defaults: {}", e);
                Weather::default()
            }
        })
    }

    /// Every precomputed metrics row; empty if the preprocessing output is absent
    pub fn load_precomputed_metrics(&self) -> Arc<[PrecomputedMetrics]> {
        self.precomputed
            .get_or_init(|| match self.read_precomputed() {
                Ok(Some(rows)) => {
                    info!("Using precomputed metrics for {} drivers", rows.len());
                    rows.into()
                }
                Ok(None) => {
                    info!("No precomputed metrics, metrics will be calculated from telemetry");
                    Arc::from(Vec::new())
                }
                Err(e) => {
                    warn!("Could not load precomputed metrics: {}", e);
                    Arc::from(Vec::new())
                }
            })
            .clone()
    }

    /// Precomputed metrics for one car number
    pub fn precomputed_for(&self, vehicle_number: u32) -> Option<PrecomputedMetrics> {
        self.load_precomputed_metrics()
            .iter()
            .find(|m| m.vehicle_number == vehicle_number)
            .cloned()
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        let text = match self.store.read(path)? {
            Some(text) => text,
            None => return Ok(None),
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    fn read_weather(&self) -> Result<Option<Weather>, StoreError> {
        let text = match self.store.read(WEATHER_FILE)? {
            Some(text) => text,
            None => return Ok(None),
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(text.as_bytes());

        let record = match reader.records().next() {
            Some(record) => record.map_err(|e| StoreError::Malformed {
                path: WEATHER_FILE.to_string(),
                reason: e.to_string(),
            })?,
            None => return Ok(None),
        };

        // Missing, unparseable and zero readings all fall back to defaults
        let reading = |col: usize| {
            record
                .get(col)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .filter(|v| *v != 0.0)
        };

        Ok(Some(Weather {
            air_temp: Celsius(reading(WEATHER_AIR_TEMP_COL).unwrap_or(Weather::DEFAULT_AIR_TEMP)),
            humidity: reading(WEATHER_HUMIDITY_COL).unwrap_or(Weather::DEFAULT_HUMIDITY),
            track_temp: reading(WEATHER_TRACK_TEMP_COL).map(Celsius),
        }))
    }

    fn read_precomputed(&self) -> Result<Option<Vec<PrecomputedMetrics>>, StoreError> {
        let text = match self.store.read(RACE_METRICS_FILE)? {
            Some(text) => text,
            None => return Ok(None),
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for (line, result) in reader.deserialize::<PrecomputedMetrics>().enumerate() {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => warn!("Skipping malformed precomputed metrics row {}: {}", line + 1, e),
            }
        }

        Ok(Some(rows))
    }
}
