//! Integration tests for SyntheticGenerator

use pitwall_core::model::{BRAKE_TEMP_MAX, BRAKE_TEMP_MIN, TIRE_TEMP_MAX, TIRE_TEMP_MIN};
use pitwall_core::RaceMetrics;
use pitwall_sources::SyntheticGenerator;

fn metrics(tire_stress_index: u32, fuel_conservation_mode: bool, attack_window: bool) -> RaceMetrics {
    RaceMetrics {
        tire_stress_index,
        fuel_conservation_mode,
        attack_window,
        ..RaceMetrics::default()
    }
}

#[test]
fn test_outputs_stay_in_bounds() {
    let generator = SyntheticGenerator::default();
    let cases = [
        metrics(0, false, false),
        metrics(100, true, true),
        metrics(71, false, true),
        metrics(35, true, false),
    ];

    for m in &cases {
        for i in (0..20_000u64).step_by(7) {
            let p = generator.generate(m, i, 0);
            for corner in p.tire_wear.all_corners() {
                assert!((0.0..=100.0).contains(&corner.0));
            }
            assert!((TIRE_TEMP_MIN..=TIRE_TEMP_MAX).contains(&p.tire_temp.0));
            assert!((BRAKE_TEMP_MIN..=BRAKE_TEMP_MAX).contains(&p.brake_temp.0));
            assert!((0.0..=35.0).contains(&p.fuel_load.0));
            assert!((0.0..=100.0).contains(&p.throttle.0));
            assert!((0.0..=100.0).contains(&p.brake.0));
            assert!((60.0..=260.0).contains(&p.speed.0));
            assert!((1000.0..=8000.0).contains(&p.rpm.0));
            assert!(p.gap_ahead.0 >= 0.0 && p.gap_behind.0 >= 0.0);
        }
    }
}

#[test]
fn test_same_inputs_give_same_point() {
    let generator = SyntheticGenerator::default();
    let m = metrics(42, false, true);
    assert_eq!(generator.generate(&m, 314, 5_000), generator.generate(&m, 314, 5_000));
}

#[test]
fn test_fuel_conservation_lowers_throttle() {
    let generator = SyntheticGenerator::default();
    let saving = metrics(20, true, false);
    let pushing = metrics(20, false, false);

    for i in 0..500u64 {
        assert!(generator.generate(&saving, i, 0).throttle.0 <= 80.0);
        assert!(generator.generate(&pushing, i, 0).throttle.0 >= 70.0);
    }
}

#[test]
fn test_high_tire_stress_raises_brake_and_wear() {
    let generator = SyntheticGenerator::default();
    let stressed = metrics(90, false, false);
    let fresh = metrics(10, false, false);

    for i in 0..500u64 {
        let hot = generator.generate(&stressed, i, 0);
        let cool = generator.generate(&fresh, i, 0);
        assert!(hot.brake.0 >= 40.0);
        assert!(cool.brake.0 <= 40.0);
        assert!(hot.tire_wear.average() < cool.tire_wear.average());
        assert!(hot.tire_temp.0 >= cool.tire_temp.0);
    }
}

#[test]
fn test_attack_window_narrows_gap_ahead() {
    let generator = SyntheticGenerator::default();
    for i in 0..500u64 {
        let p = generator.generate(&metrics(30, false, true), i, 0);
        assert!((0.8..=1.2).contains(&p.gap_ahead.0));
        let q = generator.generate(&metrics(30, false, false), i, 0);
        assert!(q.gap_ahead.0 >= 1.5);
    }
}

#[test]
fn test_lap_follows_frame_index() {
    let generator = SyntheticGenerator::default();
    let m = metrics(30, false, false);
    assert_eq!(generator.generate(&m, 0, 0).lap, 12);
    assert_eq!(generator.generate(&m, 1_200, 0).lap, 14);
}

#[test]
fn test_fuel_capacity_caps_fuel_load() {
    let generator = SyntheticGenerator::new(10.0);
    for i in 0..200u64 {
        assert!(generator.generate(&metrics(0, false, false), i, 0).fuel_load.0 <= 10.0);
    }
}
