use anyhow::Result;
use clap::Args;

use crate::models::{ExperienceLevel, WhoopMetrics};
use crate::services::ReadinessService;

#[derive(Args)]
pub struct ReadinessCommand {
    /// WHOOP recovery score (0-100)
    #[arg(long)]
    recovery: Option<f64>,

    /// Sleep performance (0-100)
    #[arg(long)]
    sleep: Option<f64>,

    /// Today's HRV in ms
    #[arg(long)]
    hrv: Option<f64>,

    /// Baseline HRV in ms
    #[arg(long)]
    hrv_baseline: Option<f64>,

    /// Today's resting heart rate
    #[arg(long)]
    rhr: Option<f64>,

    /// Baseline resting heart rate
    #[arg(long)]
    rhr_baseline: Option<f64>,

    /// Yesterday's day strain (0-21)
    #[arg(long)]
    strain: Option<f64>,

    /// beginner, intermediate or advanced
    #[arg(short, long, default_value = "intermediate")]
    level: ExperienceLevel,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

impl ReadinessCommand {
    pub fn execute(self) -> Result<()> {
        let metrics = WhoopMetrics {
            recovery_score: self.recovery,
            sleep_performance: self.sleep,
            hrv_now_ms: self.hrv,
            hrv_baseline_ms: self.hrv_baseline,
            rhr_now_bpm: self.rhr,
            rhr_baseline_bpm: self.rhr_baseline,
            yesterday_strain: self.strain,
        };

        let adjustment = ReadinessService::default().recommend_adjustment(&metrics, self.level, &[]);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&adjustment)?);
            return Ok(());
        }

        println!("Readiness:  {:.2}", adjustment.readiness.rho);
        println!(
            "Multiplier: {:.3} ({})",
            adjustment.overload_multiplier,
            adjustment.experience_level
        );
        let flags: Vec<_> = adjustment.readiness.flags.iter().map(|f| f.as_str()).collect();
        if !flags.is_empty() {
            println!("Flags:      {}", flags.join(", "));
        }
        println!();
        println!("{}", adjustment.explanation);
        for reason in &adjustment.reasoning {
            println!("  - {}", reason);
        }

        Ok(())
    }
}
