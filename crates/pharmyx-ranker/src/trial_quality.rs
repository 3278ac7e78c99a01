//! Methodological quality score for a single clinical trial.
//!
//! Additive rule set: each design attribute contributes independently and
//! an unknown attribute contributes nothing. The sum is clamped to [0, 100].

use serde::{Deserialize, Serialize};
use std::fmt;

use pharmyx_common::engine_config::TrialQualityConfig;
use pharmyx_common::records::{Blinding, EndpointCategory, TrialRecord, TrialStatus};
use pharmyx_common::score::{clamp_with_flag, Confidence, ScoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCategory {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityCategory {
    pub fn from_score(score: f64, cfg: &TrialQualityConfig) -> Self {
        if score >= cfg.excellent_min {
            QualityCategory::Excellent
        } else if score >= cfg.good_min {
            QualityCategory::Good
        } else if score >= cfg.fair_min {
            QualityCategory::Fair
        } else {
            QualityCategory::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityCategory::Excellent => "excellent",
            QualityCategory::Good      => "good",
            QualityCategory::Fair      => "fair",
            QualityCategory::Poor      => "poor",
        }
    }
}

impl fmt::Display for QualityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type TrialQuality = ScoreResult<QualityCategory>;

/// Score one trial. Never fails: every field has a neutral default.
pub fn score_trial(trial: &TrialRecord, cfg: &TrialQualityConfig) -> TrialQuality {
    let mut result = ScoreResult::new(None, QualityCategory::Poor, Confidence::Low);
    let mut total = 0.0;

    let mut credit = |result: &mut TrialQuality, name: &str, points: f64, note: &str| {
        total += points;
        result.push_factor(name, points, note);
    };

    if trial.randomized == Some(true) {
        credit(&mut result, "randomized", cfg.randomized_points, "randomised allocation");
    }

    match trial.blinding {
        Some(Blinding::Double) => {
            credit(&mut result, "blinding", cfg.double_blind_points, "double-blind")
        }
        Some(Blinding::Single) => {
            credit(&mut result, "blinding", cfg.single_blind_points, "single-blind")
        }
        Some(Blinding::None) | None => {}
    }

    if trial.has_placebo_arm {
        credit(&mut result, "placebo_arm", cfg.placebo_points, "placebo-controlled arm");
    }

    if trial.has_active_comparator {
        credit(
            &mut result,
            "active_comparator",
            cfg.active_comparator_points,
            "active comparator arm",
        );
    }

    match trial.primary_endpoint {
        Some(EndpointCategory::OverallSurvival) => credit(
            &mut result,
            "primary_endpoint",
            cfg.survival_endpoint_points,
            "overall survival endpoint",
        ),
        Some(EndpointCategory::ProgressionFreeSurvival) => credit(
            &mut result,
            "primary_endpoint",
            cfg.survival_endpoint_points,
            "progression-free survival endpoint",
        ),
        Some(EndpointCategory::Surrogate) => credit(
            &mut result,
            "primary_endpoint",
            cfg.surrogate_endpoint_points,
            "surrogate marker endpoint",
        ),
        Some(EndpointCategory::Other) | None => {}
    }

    if let Some(n) = trial.enrollment {
        if n >= cfg.enrollment_threshold {
            let note = format!("enrollment {n} >= {}", cfg.enrollment_threshold);
            credit(&mut result, "enrollment", cfg.enrollment_points, &note);
        }
    }

    let (score, clamped) = clamp_with_flag(total, 0.0, 100.0);
    if clamped {
        result.push_factor("clamp", score - total, format!("raw sum {total} clamped to [0, 100]"));
    }

    result.value = Some(score);
    result.category = QualityCategory::from_score(score, cfg);
    result.confidence = attribute_confidence(trial);
    result
}

/// How much of the trial's design is actually known.
fn attribute_confidence(trial: &TrialRecord) -> Confidence {
    let known = [
        trial.randomized.is_some(),
        trial.blinding.is_some(),
        trial.primary_endpoint.is_some(),
        trial.enrollment.is_some(),
        trial.phase.is_some(),
        trial.status != TrialStatus::Unknown,
    ];
    let n_known = known.iter().filter(|k| **k).count();

    if n_known == known.len() {
        Confidence::High
    } else if n_known * 2 >= known.len() {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmyx_common::records::TrialPhase;
    use pharmyx_test_utils::TrialBuilder;

    fn cfg() -> TrialQualityConfig {
        TrialQualityConfig::default()
    }

    #[test]
    fn test_all_unknown_scores_zero_poor() {
        let t = TrialBuilder::new("NCT0").build();
        let q = score_trial(&t, &cfg());
        assert_eq!(q.value, Some(0.0));
        assert_eq!(q.category, QualityCategory::Poor);
        assert!(q.factors.is_empty());
        assert_eq!(q.confidence, Confidence::Low);
    }

    #[test]
    fn test_full_credit_trial_scores_ninety() {
        let t = TrialBuilder::new("NCT1")
            .phase(TrialPhase::Phase3)
            .randomized(true)
            .blinding(Blinding::Double)
            .placebo()
            .comparator()
            .endpoint(EndpointCategory::OverallSurvival)
            .enrollment(100)
            .status(TrialStatus::Completed)
            .build();
        let q = score_trial(&t, &cfg());
        assert_eq!(q.value, Some(90.0));
        assert_eq!(q.category, QualityCategory::Excellent);
        assert_eq!(q.factors.len(), 6);
        assert_eq!(q.confidence, Confidence::High);
    }

    #[test]
    fn test_value_equals_sum_of_listed_factors() {
        let t = TrialBuilder::new("NCT2")
            .blinding(Blinding::Single)
            .comparator()
            .endpoint(EndpointCategory::Surrogate)
            .enrollment(99)
            .build();
        let q = score_trial(&t, &cfg());
        let sum: f64 = q.factors.iter().map(|f| f.points).sum();
        assert_eq!(q.value, Some(30.0));
        assert_eq!(q.value, Some(sum));
        assert!(q.factor("enrollment").is_none(), "99 is below the threshold");
        assert_eq!(q.category, QualityCategory::Poor);
    }

    #[test]
    fn test_pfs_counts_as_survival_endpoint() {
        let t = TrialBuilder::new("NCT3")
            .endpoint(EndpointCategory::ProgressionFreeSurvival)
            .build();
        assert_eq!(score_trial(&t, &cfg()).value, Some(15.0));
    }

    #[test]
    fn test_explicit_negatives_earn_nothing() {
        let t = TrialBuilder::new("NCT4")
            .randomized(false)
            .blinding(Blinding::None)
            .endpoint(EndpointCategory::Other)
            .build();
        assert_eq!(score_trial(&t, &cfg()).value, Some(0.0));
    }

    #[test]
    fn test_ceiling_enforced_with_inflated_points() {
        let mut c = cfg();
        c.randomized_points = 80.0;
        let t = TrialBuilder::new("NCT5").gold_standard().build();
        let q = score_trial(&t, &c);
        assert_eq!(q.value, Some(100.0));
        assert!(q.factor("clamp").is_some());
    }

    #[test]
    fn test_category_breakpoints() {
        let c = cfg();
        assert_eq!(QualityCategory::from_score(80.0, &c), QualityCategory::Excellent);
        assert_eq!(QualityCategory::from_score(79.9, &c), QualityCategory::Good);
        assert_eq!(QualityCategory::from_score(60.0, &c), QualityCategory::Good);
        assert_eq!(QualityCategory::from_score(40.0, &c), QualityCategory::Fair);
        assert_eq!(QualityCategory::from_score(39.9, &c), QualityCategory::Poor);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let t = TrialBuilder::new("NCT6").gold_standard().build();
        assert_eq!(score_trial(&t, &cfg()), score_trial(&t, &cfg()));
    }
}
