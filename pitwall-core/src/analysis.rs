//! Race-condition metrics derived from a telemetry window
//!
//! Only the newest point of the window is inspected (plus the lap-time
//! history). No smoothing is applied across the window.

use crate::model::{RaceMetrics, TelemetryPoint, Weather};

/// Overtake risk when the car ahead is within half a second
pub const OVERTAKE_RISK_HIGH: u32 = 85;
/// Overtake risk when the car ahead is within a second
pub const OVERTAKE_RISK_MEDIUM: u32 = 50;
/// Overtake risk otherwise
pub const OVERTAKE_RISK_LOW: u32 = 10;

/// Fuel load (kg) below which conservation mode is raised
pub const FUEL_CONSERVATION_THRESHOLD: f32 = 5.0;

/// Number of most recent laps averaged for the pace trend
const RECENT_LAPS: usize = 3;
/// Number of laps before the recent window used as the baseline
const BASELINE_LAPS: usize = 2;

/// Compute metrics from the telemetry window, lap history and weather
///
/// Returns neutral metrics (weather risk aside) for an empty window.
pub fn analyze(window: &[TelemetryPoint], lap_times: &[f32], weather: &Weather) -> RaceMetrics {
    let weather_risk = weather.humidity.min(100.0);

    let latest = match window.last() {
        Some(latest) => latest,
        None => {
            return RaceMetrics {
                weather_risk,
                ..RaceMetrics::default()
            }
        }
    };

    let gap_ahead = latest.gap_ahead.0;

    RaceMetrics {
        tire_stress_index: tire_stress_index(latest.tire_wear.average(), latest.tire_temp.0),
        overtake_risk_score: overtake_risk_score(gap_ahead),
        attack_window: gap_ahead > 0.2 && gap_ahead < 1.2,
        fuel_conservation_mode: latest.fuel_load.0 < FUEL_CONSERVATION_THRESHOLD,
        weather_risk,
        lap_pace_trend: lap_pace_trend(lap_times),
        brake_stress: (latest.brake_temp.0 / 10.0).floor().max(0.0) as u32,
    }
}

/// Wear deficit plus an overheating penalty above 100 °C, capped at 100
pub fn tire_stress_index(avg_wear: f32, tire_temp: f32) -> u32 {
    let wear_deficit = 100.0 - avg_wear;
    let temp_stress = ((tire_temp - 100.0) * 2.0).max(0.0);
    (wear_deficit + temp_stress).clamp(0.0, 100.0).floor() as u32
}

pub fn overtake_risk_score(gap_ahead: f32) -> u32 {
    if gap_ahead < 0.5 {
        OVERTAKE_RISK_HIGH
    } else if gap_ahead < 1.0 {
        OVERTAKE_RISK_MEDIUM
    } else {
        OVERTAKE_RISK_LOW
    }
}

/// Mean of the last three laps minus the mean of the (up to) two laps before
/// them, rounded to hundredths. Zero until there are at least three laps and
/// at least one lap precedes the recent window.
pub fn lap_pace_trend(lap_times: &[f32]) -> f32 {
    if lap_times.len() < RECENT_LAPS {
        return 0.0;
    }

    let recent_start = lap_times.len() - RECENT_LAPS;
    let baseline_start = recent_start.saturating_sub(BASELINE_LAPS);
    let recent = &lap_times[recent_start..];
    let baseline = &lap_times[baseline_start..recent_start];

    if baseline.is_empty() {
        return 0.0;
    }

    let trend = mean(recent) - mean(baseline);
    (trend * 100.0).round() / 100.0
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TireWear;
    use crate::units::*;

    fn point(avg_wear: f32, tire_temp: f32, gap_ahead: f32, fuel: f32) -> TelemetryPoint {
        TelemetryPoint {
            timestamp: 0,
            lap: 1,
            speed: Kph(150.0),
            rpm: Rpm(6000.0),
            gear: 4,
            throttle: Percent::new(80.0),
            brake: Percent::new(0.0),
            tire_wear: TireWear::new(avg_wear, avg_wear, avg_wear, avg_wear),
            tire_temp: Celsius(tire_temp),
            brake_temp: Celsius(457.0),
            fuel_load: Kilograms(fuel),
            gap_ahead: Seconds(gap_ahead),
            gap_behind: Seconds(3.0),
            position: 4,
        }
    }

    fn gap_metrics(gap_ahead: f32) -> RaceMetrics {
        analyze(&[point(95.0, 90.0, gap_ahead, 20.0)], &[], &Weather::default())
    }

    #[test]
    fn test_empty_window_is_neutral() {
        let metrics = analyze(&[], &[101.0, 102.0, 103.0, 104.0, 105.0], &Weather::default());
        assert_eq!(
            metrics,
            RaceMetrics {
                tire_stress_index: 0,
                overtake_risk_score: 0,
                attack_window: false,
                fuel_conservation_mode: false,
                weather_risk: 55.0,
                lap_pace_trend: 0.0,
                brake_stress: 0,
            }
        );
    }

    #[test]
    fn test_tire_stress_wear_only() {
        let metrics = analyze(&[point(90.0, 90.0, 2.0, 20.0)], &[], &Weather::default());
        assert_eq!(metrics.tire_stress_index, 10);
    }

    #[test]
    fn test_tire_stress_with_overheating() {
        let metrics = analyze(&[point(80.0, 120.0, 2.0, 20.0)], &[], &Weather::default());
        assert_eq!(metrics.tire_stress_index, 60);
    }

    #[test]
    fn test_tire_stress_capped_at_100() {
        assert_eq!(tire_stress_index(30.0, 130.0), 100);
    }

    #[test]
    fn test_only_latest_point_is_used() {
        let window = vec![point(50.0, 125.0, 0.3, 2.0), point(90.0, 90.0, 2.0, 20.0)];
        let metrics = analyze(&window, &[], &Weather::default());
        assert_eq!(metrics.tire_stress_index, 10);
        assert!(!metrics.attack_window);
        assert!(!metrics.fuel_conservation_mode);
    }

    #[test]
    fn test_overtake_risk_ladder() {
        assert_eq!(gap_metrics(0.3).overtake_risk_score, 85);
        assert_eq!(gap_metrics(0.5).overtake_risk_score, 50);
        assert_eq!(gap_metrics(0.99).overtake_risk_score, 50);
        assert_eq!(gap_metrics(1.0).overtake_risk_score, 10);
    }

    #[test]
    fn test_attack_window_bounds_are_exclusive() {
        assert!(!gap_metrics(0.2).attack_window);
        assert!(!gap_metrics(1.2).attack_window);
        assert!(gap_metrics(0.7).attack_window);
        assert!(!gap_metrics(0.1).attack_window);
    }

    #[test]
    fn test_fuel_conservation_threshold() {
        let at = analyze(&[point(95.0, 90.0, 2.0, 5.0)], &[], &Weather::default());
        assert!(!at.fuel_conservation_mode);
        let below = analyze(&[point(95.0, 90.0, 2.0, 4.999)], &[], &Weather::default());
        assert!(below.fuel_conservation_mode);
    }

    #[test]
    fn test_weather_risk_capped() {
        let weather = Weather {
            humidity: 140.0,
            ..Weather::default()
        };
        let metrics = analyze(&[point(95.0, 90.0, 2.0, 20.0)], &[], &weather);
        assert_eq!(metrics.weather_risk, 100.0);
    }

    #[test]
    fn test_brake_stress_floors() {
        let metrics = analyze(&[point(95.0, 90.0, 2.0, 20.0)], &[], &Weather::default());
        assert_eq!(metrics.brake_stress, 45);
    }

    #[test]
    fn test_lap_pace_trend_five_laps() {
        let trend = lap_pace_trend(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        assert!((trend - 2.5).abs() < 1e-4);
    }

    #[test]
    fn test_lap_pace_trend_faster_is_negative() {
        let trend = lap_pace_trend(&[106.0, 106.0, 105.0, 105.0, 105.0, 104.0]);
        // recent = [105, 105, 104], baseline = [106, 105]
        assert!((trend - (-0.83)).abs() < 1e-4);
    }

    #[test]
    fn test_lap_pace_trend_needs_a_baseline_lap() {
        assert_eq!(lap_pace_trend(&[]), 0.0);
        assert_eq!(lap_pace_trend(&[100.0, 101.0]), 0.0);
        assert_eq!(lap_pace_trend(&[100.0, 101.0, 102.0]), 0.0);
    }

    #[test]
    fn test_lap_pace_trend_four_laps_uses_single_baseline_lap() {
        let trend = lap_pace_trend(&[100.0, 102.0, 102.0, 102.0]);
        assert!((trend - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_analyze_is_pure() {
        let window = vec![point(88.0, 104.0, 0.8, 12.0)];
        let laps = [100.0, 100.5, 101.0, 101.2, 101.9];
        let weather = Weather::default();
        assert_eq!(
            analyze(&window, &laps, &weather),
            analyze(&window, &laps, &weather)
        );
    }
}
