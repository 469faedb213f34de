//! Rule-based strategy used whenever the language-model service is
//! unavailable. Depends only on the current metrics.

use crate::model::{DrivingStyle, RaceMetrics, StrategyInsight};

const HIGH_TIRE_STRESS: u32 = 70;
const HIGH_OVERTAKE_RISK: u32 = 50;
const SLOWING_PACE_TREND: f32 = 0.5;

pub fn fallback_strategy(metrics: &RaceMetrics) -> StrategyInsight {
    let driving_style = if metrics.attack_window && metrics.tire_stress_index < HIGH_TIRE_STRESS {
        DrivingStyle::Aggressive
    } else if metrics.tire_stress_index > HIGH_TIRE_STRESS || metrics.fuel_conservation_mode {
        DrivingStyle::Conservative
    } else {
        DrivingStyle::Balanced
    };

    let risk_alert_summary = if metrics.tire_stress_index > HIGH_TIRE_STRESS {
        format!(
            "High tire stress ({}) - manage tire wear",
            metrics.tire_stress_index
        )
    } else if metrics.overtake_risk_score > HIGH_OVERTAKE_RISK {
        "Overtake opportunity ahead - gap closing".to_string()
    } else {
        "Conditions stable - maintain pace".to_string()
    };

    let suggested_action = if metrics.attack_window {
        "Push through high-speed sections, attack Turn 3"
    } else {
        "Maintain consistent pace, save tires"
    };

    let pit_strategy = if metrics.lap_pace_trend > SLOWING_PACE_TREND {
        "Monitor pace trend - prepare for pit window in 2-3 laps"
    } else {
        "Stay out - pace is stable"
    };

    StrategyInsight {
        driving_style,
        risk_alert_summary,
        suggested_action: suggested_action.to_string(),
        pit_strategy: pit_strategy.to_string(),
    }
}
