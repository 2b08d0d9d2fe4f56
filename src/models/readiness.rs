use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Inputs
// ============================================================================

/// Recovery metrics as synced from WHOOP. Every field is optional; a missing
/// value simply does not contribute to the readiness score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoopMetrics {
    /// WHOOP recovery score (0-100)
    pub recovery_score: Option<f64>,
    /// Sleep performance percentage (0-100)
    pub sleep_performance: Option<f64>,
    /// HRV (RMSSD, ms) for today
    pub hrv_now_ms: Option<f64>,
    /// Rolling HRV baseline (ms)
    pub hrv_baseline_ms: Option<f64>,
    /// Resting heart rate for today (bpm)
    pub rhr_now_bpm: Option<f64>,
    /// Rolling resting heart rate baseline (bpm)
    pub rhr_baseline_bpm: Option<f64>,
    /// Day strain from the previous day (0-21)
    pub yesterday_strain: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        }
    }

    /// Allowed (min, max) overload multiplier for this level.
    pub fn multiplier_band(&self) -> (f64, f64) {
        match self {
            ExperienceLevel::Beginner => (0.90, 1.05),
            ExperienceLevel::Intermediate => (0.85, 1.10),
            ExperienceLevel::Advanced => (0.80, 1.15),
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(ExperienceLevel::Beginner),
            "intermediate" => Ok(ExperienceLevel::Intermediate),
            "advanced" => Ok(ExperienceLevel::Advanced),
            other => Err(format!("unknown experience level: {}", other)),
        }
    }
}

// ============================================================================
// Outputs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessFlag {
    GoodRecovery,
    LowRecovery,
    GoodSleep,
    PoorSleep,
    HrvAboveBaseline,
    HrvBelowBaseline,
    ElevatedRhr,
    HighStrain,
    InsufficientData,
}

impl ReadinessFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessFlag::GoodRecovery => "good_recovery",
            ReadinessFlag::LowRecovery => "low_recovery",
            ReadinessFlag::GoodSleep => "good_sleep",
            ReadinessFlag::PoorSleep => "poor_sleep",
            ReadinessFlag::HrvAboveBaseline => "hrv_above_baseline",
            ReadinessFlag::HrvBelowBaseline => "hrv_below_baseline",
            ReadinessFlag::ElevatedRhr => "elevated_rhr",
            ReadinessFlag::HighStrain => "high_strain",
            ReadinessFlag::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResult {
    /// Readiness in [0, 1]; 0.5 is neutral
    pub rho: f64,
    pub flags: Vec<ReadinessFlag>,
}

impl ReadinessResult {
    pub fn has_flag(&self, flag: ReadinessFlag) -> bool {
        self.flags.contains(&flag)
    }
}

// ============================================================================
// Session adjustment
// ============================================================================

/// One exercise as planned for today's session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSet {
    pub exercise_name: String,
    pub weight: f64,
    pub reps: u32,
    pub sets: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedSet {
    pub exercise_name: String,
    pub original_weight: f64,
    pub recommended_weight: f64,
    pub reps: u32,
    pub original_sets: u32,
    pub recommended_sets: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingAdjustment {
    pub readiness: ReadinessResult,
    pub experience_level: ExperienceLevel,
    pub overload_multiplier: f64,
    pub adjusted_sets: Vec<AdjustedSet>,
    pub explanation: String,
    pub reasoning: Vec<String>,
}
