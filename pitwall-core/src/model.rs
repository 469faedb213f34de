//! Race telemetry data model
//!
//! `RawFrame` is what the recorded dataset holds; `TelemetryPoint` is what the
//! pipeline emits, uniform regardless of whether it was derived from a
//! recording or synthesized. `RaceMetrics` is the per-tick summary handed to
//! the strategy layer.

use crate::units::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Lower bound of the tire temperature band (°C)
pub const TIRE_TEMP_MIN: f32 = 70.0;
/// Upper bound of the tire temperature band (°C)
pub const TIRE_TEMP_MAX: f32 = 130.0;
/// Brake temperature floor; brakes relax toward this when unused (°C)
pub const BRAKE_TEMP_MIN: f32 = 200.0;
/// Upper bound of the brake temperature band (°C)
pub const BRAKE_TEMP_MAX: f32 = 900.0;

/// One recorded sample for a vehicle, as produced by the preprocessing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Capture time, milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default)]
    pub vehicle_id: String,

    #[serde(default)]
    pub lap: u32,

    /// Accelerator pedal position (0-100)
    #[serde(default)]
    pub throttle: f32,

    /// Front brake line pressure (bar)
    #[serde(default)]
    pub brake_f: f32,

    /// Rear brake line pressure (bar)
    #[serde(default)]
    pub brake_r: f32,

    /// Absolute steering angle (degrees)
    #[serde(default)]
    pub steering: f32,

    /// Longitudinal acceleration (G)
    #[serde(default)]
    pub accx: f32,

    /// Lateral acceleration (G)
    #[serde(default)]
    pub accy: f32,

    #[serde(default)]
    pub gear: i8,

    #[serde(default)]
    pub rpm: f32,

    /// Measured speed in km/h; most recordings do not carry it
    #[serde(default)]
    pub speed: Option<f32>,
}

impl RawFrame {
    /// Front plus rear brake pressure
    pub fn combined_brake(&self) -> f32 {
        self.brake_f + self.brake_r
    }

    /// Measured speed if present and non-zero, else an estimate derived from
    /// longitudinal acceleration
    pub fn speed_kph(&self) -> Kph {
        match self.speed {
            Some(speed) if speed > 0.0 => Kph(speed),
            _ => estimate_speed_from_accel(self.accx),
        }
    }
}

/// Rough speed estimate from longitudinal acceleration, clamped to [80, 260] km/h
pub fn estimate_speed_from_accel(accx: f32) -> Kph {
    Kph((120.0 + accx * 50.0).clamp(80.0, 260.0))
}

/// Remaining tire life per corner (100 = new)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TireWear {
    pub front_left: Percent,
    pub front_right: Percent,
    pub rear_left: Percent,
    pub rear_right: Percent,
}

impl TireWear {
    pub fn new(front_left: f32, front_right: f32, rear_left: f32, rear_right: f32) -> Self {
        Self {
            front_left: Percent::new(front_left),
            front_right: Percent::new(front_right),
            rear_left: Percent::new(rear_left),
            rear_right: Percent::new(rear_right),
        }
    }

    pub fn all_corners(&self) -> [Percent; 4] {
        [
            self.front_left,
            self.front_right,
            self.rear_left,
            self.rear_right,
        ]
    }

    /// Mean remaining life across the four corners
    pub fn average(&self) -> f32 {
        self.all_corners().iter().map(|p| p.0).sum::<f32>() / 4.0
    }
}

/// One emitted telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    pub lap: u32,

    pub speed: Kph,

    pub rpm: Rpm,

    pub gear: i8,

    pub throttle: Percent,

    /// Combined brake usage
    pub brake: Percent,

    pub tire_wear: TireWear,

    /// Clamped to [70, 130]
    pub tire_temp: Celsius,

    /// Clamped to [200, 900]
    pub brake_temp: Celsius,

    /// Clamped to [0, fuel capacity]
    pub fuel_load: Kilograms,

    /// Estimated gap to the car ahead; cosmetic, there is no field model
    pub gap_ahead: Seconds,

    /// Estimated gap to the car behind
    pub gap_behind: Seconds,

    pub position: u32,
}

/// Ambient conditions shared by every streamer in the process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub air_temp: Celsius,
    /// Relative humidity (0-100)
    pub humidity: f32,
    pub track_temp: Option<Celsius>,
}

impl Weather {
    pub const DEFAULT_AIR_TEMP: f32 = 30.0;
    pub const DEFAULT_HUMIDITY: f32 = 55.0;
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            air_temp: Celsius(Self::DEFAULT_AIR_TEMP),
            humidity: Self::DEFAULT_HUMIDITY,
            track_temp: None,
        }
    }
}

/// Race-condition summary derived from a telemetry window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RaceMetrics {
    /// 0-100 composite of wear deficit and overheating
    pub tire_stress_index: u32,
    /// One of the overtake risk ladder values (0, 10, 50, 85)
    pub overtake_risk_score: u32,
    pub attack_window: bool,
    pub fuel_conservation_mode: bool,
    /// 0-100
    pub weather_risk: f32,
    /// Seconds per lap versus the earlier laps; positive means slower
    pub lap_pace_trend: f32,
    pub brake_stress: u32,
}

/// Overall driving posture recommended to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrivingStyle {
    Aggressive,
    Balanced,
    Conservative,
}

impl FromStr for DrivingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aggressive" => Ok(Self::Aggressive),
            "balanced" => Ok(Self::Balanced),
            "conservative" => Ok(Self::Conservative),
            other => Err(format!("unknown driving style: {}", other)),
        }
    }
}

/// Natural-language strategy recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInsight {
    pub driving_style: DrivingStyle,
    pub risk_alert_summary: String,
    pub suggested_action: String,
    pub pit_strategy: String,
}

/// A selectable driver / car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProfile {
    /// Vehicle identifier used to key recorded telemetry
    pub id: String,
    pub name: String,
    /// Car number used to key lap times and precomputed metrics
    pub number: u32,
    pub team: String,
}

/// Per-driver metrics produced offline by the preprocessing collaborator.
/// All scores are fractions in [0, 1] except `tire_stress_index`, which is a
/// raw weighted sum of brake pressure, steering and lateral G.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedMetrics {
    pub driver_id: String,
    pub vehicle_number: u32,
    pub tire_stress_index: f32,
    pub attack_window: f32,
    pub fuel_conservation_mode: f32,
    pub overtake_risk: f32,
    pub ideal_pit_window: f32,
}

impl PrecomputedMetrics {
    /// Map offline scores onto the live metric scales. Lap pace comes from
    /// the lap-time history since the offline scores carry no trend.
    pub fn to_race_metrics(&self, lap_pace_trend: f32, weather: &Weather) -> RaceMetrics {
        let overtake_risk_score = if self.overtake_risk >= 0.66 {
            85
        } else if self.overtake_risk >= 0.33 {
            50
        } else {
            10
        };

        RaceMetrics {
            tire_stress_index: self.tire_stress_index.clamp(0.0, 100.0).floor() as u32,
            overtake_risk_score,
            attack_window: self.attack_window >= 0.3,
            fuel_conservation_mode: self.fuel_conservation_mode >= 0.5,
            weather_risk: weather.humidity.min(100.0),
            lap_pace_trend,
            brake_stress: 0,
        }
    }

    pub fn driver_profile(&self) -> DriverProfile {
        DriverProfile {
            id: self.driver_id.clone(),
            name: format!("Driver #{}", self.vehicle_number),
            number: self.vehicle_number,
            team: "Toyota GR Cup".to_string(),
        }
    }
}

// === Field Masking for Selective Output ===

/// Specifies which fields to include in serialized output
///
/// Lets a chart that only plots speed and throttle subscribe to a much
/// smaller stream.
#[derive(Debug, Clone, Default)]
pub struct FieldMask {
    fields: HashSet<String>,
    include_all: bool,
}

impl FieldMask {
    /// Create a mask that includes all fields
    pub fn all() -> Self {
        Self {
            fields: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of field names
    pub fn parse(fields: &str) -> Self {
        let fields: HashSet<String> = fields
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            fields,
            include_all: false,
        }
    }

    /// Check if a field should be included
    pub fn includes(&self, field: &str) -> bool {
        self.include_all || self.fields.contains(&field.to_lowercase())
    }

    /// Check if all fields should be included
    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl TelemetryPoint {
    /// Serialize this point respecting the given field mask
    ///
    /// `timestamp` and `lap` are always present so that clients can order
    /// and bucket what they receive.
    pub fn to_json_filtered(&self, mask: Option<&FieldMask>) -> serde_json::Result<String> {
        let mask = match mask {
            Some(mask) if !mask.is_all() => mask,
            _ => return serde_json::to_string(self),
        };

        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(ref mut map) = value {
            map.retain(|key, _| key == "timestamp" || key == "lap" || mask.includes(key));
        }
        serde_json::to_string(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_point() -> TelemetryPoint {
        TelemetryPoint {
            timestamp: 1_700_000_000_000,
            lap: 12,
            speed: Kph(184.0),
            rpm: Rpm(6400.0),
            gear: 4,
            throttle: Percent::new(88.0),
            brake: Percent::new(0.0),
            tire_wear: TireWear::new(95.0, 93.0, 96.0, 94.0),
            tire_temp: Celsius(92.0),
            brake_temp: Celsius(310.0),
            fuel_load: Kilograms(31.5),
            gap_ahead: Seconds(1.4),
            gap_behind: Seconds(3.1),
            position: 4,
        }
    }

    #[test]
    fn test_raw_frame_uses_measured_speed() {
        let frame = RawFrame {
            speed: Some(150.0),
            accx: 2.0,
            ..serde_json::from_str::<RawFrame>("{}").unwrap()
        };
        assert_eq!(frame.speed_kph(), Kph(150.0));
    }

    #[test]
    fn test_raw_frame_estimates_missing_speed() {
        let frame: RawFrame = serde_json::from_str(r#"{"accx": 0.4}"#).unwrap();
        assert_eq!(frame.speed, None);
        assert!((frame.speed_kph().0 - 140.0).abs() < 1e-4);
    }

    #[test]
    fn test_raw_frame_zero_speed_treated_as_missing() {
        let frame: RawFrame = serde_json::from_str(r#"{"speed": 0, "accx": 0}"#).unwrap();
        assert_eq!(frame.speed_kph(), Kph(120.0));
    }

    #[test]
    fn test_speed_estimate_clamped() {
        assert_eq!(estimate_speed_from_accel(-5.0), Kph(80.0));
        assert_eq!(estimate_speed_from_accel(10.0), Kph(260.0));
    }

    #[test]
    fn test_raw_frame_parses_preprocessed_record() {
        let json = r#"{
            "timestamp": 1714240000123, "vehicle_id": "GR86-022-13", "lap": 3,
            "throttle": 97.5, "brake_f": 0, "brake_r": 0, "steering": 12.4,
            "accx": 0.21, "accy": 0.65, "gear": 4, "rpm": 6712
        }"#;
        let frame: RawFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.lap, 3);
        assert_eq!(frame.gear, 4);
        assert_eq!(frame.rpm, 6712.0);
        assert_eq!(frame.combined_brake(), 0.0);
    }

    #[test]
    fn test_tire_wear_average() {
        let wear = TireWear::new(90.0, 80.0, 100.0, 70.0);
        assert!((wear.average() - 85.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_driving_style_from_str() {
        assert_eq!("Aggressive".parse::<DrivingStyle>(), Ok(DrivingStyle::Aggressive));
        assert_eq!(" conservative ".parse::<DrivingStyle>(), Ok(DrivingStyle::Conservative));
        assert!("reckless".parse::<DrivingStyle>().is_err());
    }

    #[test]
    fn test_weather_default() {
        let weather = Weather::default();
        assert_eq!(weather.air_temp, Celsius(30.0));
        assert_eq!(weather.humidity, 55.0);
    }

    #[test]
    fn test_precomputed_metrics_mapping() {
        let pre = PrecomputedMetrics {
            driver_id: "GR86-022-13".to_string(),
            vehicle_number: 13,
            tire_stress_index: 142.7,
            attack_window: 0.41,
            fuel_conservation_mode: 0.12,
            overtake_risk: 0.5,
            ideal_pit_window: 0.2,
        };
        let metrics = pre.to_race_metrics(0.35, &Weather::default());
        assert_eq!(metrics.tire_stress_index, 100);
        assert_eq!(metrics.overtake_risk_score, 50);
        assert!(metrics.attack_window);
        assert!(!metrics.fuel_conservation_mode);
        assert_eq!(metrics.weather_risk, 55.0);
        assert_eq!(metrics.lap_pace_trend, 0.35);

        let profile = pre.driver_profile();
        assert_eq!(profile.id, "GR86-022-13");
        assert_eq!(profile.number, 13);
    }

    #[test]
    fn test_field_mask_parse_comma_separated() {
        let mask = FieldMask::parse("speed,rpm,gear");
        assert!(mask.includes("speed"));
        assert!(mask.includes("rpm"));
        assert!(mask.includes("gear"));
        assert!(!mask.includes("throttle"));
        assert!(!mask.is_all());
    }

    #[test]
    fn test_field_mask_parse_case_insensitive_with_whitespace() {
        let mask = FieldMask::parse(" Speed , RPM ");
        assert!(mask.includes("speed"));
        assert!(mask.includes("rpm"));
    }

    #[test]
    fn test_field_mask_all() {
        let mask = FieldMask::all();
        assert!(mask.is_all());
        assert!(mask.includes("anything"));
    }

    #[test]
    fn test_to_json_filtered_with_none_returns_full_point() {
        let point = make_test_point();
        let json = point.to_json_filtered(None).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("speed").is_some());
        assert!(parsed.get("tire_wear").is_some());
        assert!(parsed.get("gap_behind").is_some());
    }

    #[test]
    fn test_to_json_filtered_with_mask_returns_only_requested_fields() {
        let point = make_test_point();
        let mask = FieldMask::parse("speed,fuel_load");
        let json = point.to_json_filtered(Some(&mask)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(parsed.get("timestamp").is_some());
        assert!(parsed.get("lap").is_some());
        assert_eq!(parsed["speed"], 184.0);
        assert_eq!(parsed["fuel_load"], 31.5);
        assert!(parsed.get("rpm").is_none());
        assert!(parsed.get("tire_wear").is_none());
    }
}
