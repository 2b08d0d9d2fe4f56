use crate::models::{
    AdjustedSet, ExperienceLevel, PlannedSet, ReadinessFlag, ReadinessResult, TrainingAdjustment,
    WhoopMetrics,
};

const RECOVERY_WEIGHT: f64 = 0.40;
const SLEEP_WEIGHT: f64 = 0.30;
const HRV_WEIGHT: f64 = 0.15;
const RHR_WEIGHT: f64 = 0.15;

const NEUTRAL_RHO: f64 = 0.5;

// Baseline ratios are mapped linearly from [0.8, 1.2] onto [0, 1]
const RATIO_FLOOR: f64 = 0.8;
const RATIO_SPAN: f64 = 0.4;

const HIGH_STRAIN: f64 = 14.0;
const MAX_STRAIN: f64 = 21.0;
const MAX_STRAIN_PENALTY: f64 = 0.05;

const VOLUME_CUT_RHO: f64 = 0.35;
const DEFAULT_LOAD_INCREMENT: f64 = 2.5;

/// Combine WHOOP metrics into a readiness score in [0, 1] plus flags.
///
/// Only inputs that are present and finite take part in the weighted mean, so
/// a missing metric neither helps nor hurts. With nothing usable the result is
/// the neutral 0.5 with `insufficient_data`.
pub fn calculate_readiness(metrics: &WhoopMetrics) -> ReadinessResult {
    let mut flags = Vec::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    if let Some(recovery) = usable(metrics.recovery_score) {
        weighted_sum += RECOVERY_WEIGHT * (recovery / 100.0).clamp(0.0, 1.0);
        weight_total += RECOVERY_WEIGHT;

        if recovery >= 67.0 {
            flags.push(ReadinessFlag::GoodRecovery);
        } else if recovery < 34.0 {
            flags.push(ReadinessFlag::LowRecovery);
        }
    }

    if let Some(sleep) = usable(metrics.sleep_performance) {
        weighted_sum += SLEEP_WEIGHT * (sleep / 100.0).clamp(0.0, 1.0);
        weight_total += SLEEP_WEIGHT;

        if sleep >= 85.0 {
            flags.push(ReadinessFlag::GoodSleep);
        } else if sleep < 70.0 {
            flags.push(ReadinessFlag::PoorSleep);
        }
    }

    if let Some(ratio) = ratio(metrics.hrv_now_ms, metrics.hrv_baseline_ms) {
        weighted_sum += HRV_WEIGHT * normalize_ratio(ratio);
        weight_total += HRV_WEIGHT;

        if ratio >= 1.05 {
            flags.push(ReadinessFlag::HrvAboveBaseline);
        } else if ratio <= 0.90 {
            flags.push(ReadinessFlag::HrvBelowBaseline);
        }
    }

    // Lower resting HR than baseline is better, hence baseline / now
    if let Some(ratio) = ratio(metrics.rhr_baseline_bpm, metrics.rhr_now_bpm) {
        weighted_sum += RHR_WEIGHT * normalize_ratio(ratio);
        weight_total += RHR_WEIGHT;

        if ratio <= 1.0 / 1.05 {
            flags.push(ReadinessFlag::ElevatedRhr);
        }
    }

    let mut rho = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        flags.push(ReadinessFlag::InsufficientData);
        NEUTRAL_RHO
    };

    if let Some(strain) = usable(metrics.yesterday_strain) {
        if strain >= HIGH_STRAIN {
            flags.push(ReadinessFlag::HighStrain);
            let excess = ((strain - HIGH_STRAIN) / (MAX_STRAIN - HIGH_STRAIN)).clamp(0.0, 1.0);
            rho -= MAX_STRAIN_PENALTY * excess;
        }
    }

    ReadinessResult {
        rho: rho.clamp(0.0, 1.0),
        flags,
    }
}

/// Map readiness onto a load multiplier, clamped to the band for `level`.
/// Beginners never exceed 1.05 regardless of readiness.
pub fn calculate_overload_multiplier(rho: f64, level: ExperienceLevel) -> f64 {
    let rho = if rho.is_finite() {
        rho.clamp(0.0, 1.0)
    } else {
        NEUTRAL_RHO
    };
    let (min, max) = level.multiplier_band();

    (1.0 + 0.3 * (rho - NEUTRAL_RHO)).clamp(min, max)
}

/// Readiness-driven adjustments for a planned session
#[derive(Debug, Clone)]
pub struct ReadinessService {
    load_increment: f64,
}

impl Default for ReadinessService {
    fn default() -> Self {
        Self::new(DEFAULT_LOAD_INCREMENT)
    }
}

impl ReadinessService {
    pub fn new(load_increment: f64) -> Self {
        let load_increment = if load_increment.is_finite() && load_increment > 0.0 {
            load_increment
        } else {
            DEFAULT_LOAD_INCREMENT
        };
        Self { load_increment }
    }

    pub fn recommend_adjustment(
        &self,
        metrics: &WhoopMetrics,
        level: ExperienceLevel,
        planned: &[PlannedSet],
    ) -> TrainingAdjustment {
        let readiness = calculate_readiness(metrics);
        let multiplier = calculate_overload_multiplier(readiness.rho, level);
        let cut_volume = readiness.rho < VOLUME_CUT_RHO;

        let adjusted_sets = planned
            .iter()
            .map(|set| AdjustedSet {
                exercise_name: set.exercise_name.clone(),
                original_weight: set.weight,
                recommended_weight: self.round_to_increment(set.weight * multiplier),
                reps: set.reps,
                original_sets: set.sets,
                recommended_sets: if cut_volume && set.sets > 1 {
                    set.sets - 1
                } else {
                    set.sets
                },
            })
            .collect();

        let reasoning = build_reasoning(metrics, &readiness);
        let explanation = explain(multiplier, cut_volume, level);

        tracing::debug!(
            rho = readiness.rho,
            multiplier,
            level = level.as_str(),
            "computed training adjustment"
        );

        TrainingAdjustment {
            readiness,
            experience_level: level,
            overload_multiplier: multiplier,
            adjusted_sets,
            explanation,
            reasoning,
        }
    }

    fn round_to_increment(&self, weight: f64) -> f64 {
        if !weight.is_finite() || weight <= 0.0 {
            return 0.0;
        }
        (weight / self.load_increment).round() * self.load_increment
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let numerator = usable(numerator).filter(|v| *v > 0.0)?;
    let denominator = usable(denominator).filter(|v| *v > 0.0)?;
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}

fn normalize_ratio(ratio: f64) -> f64 {
    ((ratio - RATIO_FLOOR) / RATIO_SPAN).clamp(0.0, 1.0)
}

fn build_reasoning(metrics: &WhoopMetrics, readiness: &ReadinessResult) -> Vec<String> {
    let mut reasoning = vec![format!("Readiness: {:.0}/100", readiness.rho * 100.0)];

    if let Some(recovery) = usable(metrics.recovery_score) {
        reasoning.push(format!("WHOOP recovery: {:.0}%", recovery));
    }
    if let Some(sleep) = usable(metrics.sleep_performance) {
        reasoning.push(format!("Sleep performance: {:.0}%", sleep));
    }
    if let Some(r) = ratio(metrics.hrv_now_ms, metrics.hrv_baseline_ms) {
        reasoning.push(format!(
            "HRV {} baseline by {:.0}%",
            if r >= 1.0 { "above" } else { "below" },
            (r - 1.0).abs() * 100.0
        ));
    }
    if readiness.has_flag(ReadinessFlag::ElevatedRhr) {
        reasoning.push("Resting heart rate is elevated versus baseline".to_string());
    }
    if readiness.has_flag(ReadinessFlag::HighStrain) {
        reasoning.push("High strain yesterday".to_string());
    }
    if readiness.has_flag(ReadinessFlag::InsufficientData) {
        reasoning.push("No recovery data available - using a neutral score".to_string());
    }

    reasoning
}

fn explain(multiplier: f64, cut_volume: bool, level: ExperienceLevel) -> String {
    let percent = (multiplier - 1.0).abs() * 100.0;

    if multiplier > 1.0 {
        format!(
            "Good recovery - increase load by {:.1}% (capped for {} lifters)",
            percent, level
        )
    } else if multiplier == 1.0 {
        "Recovery is normal - proceed with the planned session".to_string()
    } else if cut_volume {
        format!(
            "Poor recovery - reduce load by {:.1}% and drop one set per exercise",
            percent
        )
    } else {
        format!("Moderate recovery - reduce load by {:.1}%", percent)
    }
}
