//! Approval probability for pipeline drugs.
//!
//! probability = base transition rate + quality adjustment + competitive
//! adjustment, clamped to [floor, ceiling]. Marketed drugs never get a
//! probability: the result carries only their status.

use tracing::{debug, warn};

use pharmyx_common::engine_config::{EngineConfig, ProbabilityConfig};
use pharmyx_common::score::{clamp_with_flag, Confidence, ScoreFactor, ScoreResult};

use crate::approval_status::{ApprovalClassification, ApprovalStatus};
use crate::competition::CompetitiveSignal;
use crate::precedent::IndicationPrecedent;
use crate::stage::DevelopmentStage;
use crate::trial_quality::{QualityCategory, TrialQuality};

pub type ApprovalProbability = ScoreResult<ApprovalStatus>;

/// Everything the calculator consumes for one drug in one indication.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityInputs<'a> {
    pub classification: &'a ApprovalClassification,
    /// Precedent for the indication, if the snapshot has one.
    pub precedent: Option<&'a IndicationPrecedent>,
    /// Quality results for the drug's active trials.
    pub trial_quality: &'a [TrialQuality],
    pub competitive: &'a CompetitiveSignal,
}

pub fn quality_adjustment(category: QualityCategory, cfg: &ProbabilityConfig) -> f64 {
    match category {
        QualityCategory::Excellent => cfg.excellent_adjustment,
        QualityCategory::Good      => cfg.good_adjustment,
        QualityCategory::Fair      => cfg.fair_adjustment,
        QualityCategory::Poor      => cfg.poor_adjustment,
    }
}

pub fn approval_probability(inputs: &ProbabilityInputs<'_>, cfg: &EngineConfig) -> ApprovalProbability {
    let status = inputs.classification.status;

    if status.is_marketed() {
        return ScoreResult::new(None, status, Confidence::High).with_factor(
            ScoreFactor::new(
                "status",
                0.0,
                format!("{status}: probability not computed for marketed drugs"),
            ),
        );
    }

    let mut result = ScoreResult::new(None, status, Confidence::Low);

    let Some(phase) = inputs.classification.current_phase else {
        result.push_factor("insufficient_data", 0.0, "pipeline drug with no phased trials");
        return result;
    };
    let stage = DevelopmentStage::from_phase(phase);

    let Some(precedent) = inputs.precedent else {
        warn!(phase = phase.as_str(), "No precedent for indication; probability not computed");
        result.push_factor("no_precedent", 0.0, "indication absent from precedent snapshot");
        return result;
    };

    let transition = precedent.transition_from(stage);
    let Some((base, transition)) = transition.and_then(|t| t.rate_pct.map(|r| (r, t))) else {
        result.push_factor(
            "no_precedent",
            0.0,
            format!("no drugs entered {} in {}", stage.as_str(), precedent.indication),
        );
        return result;
    };

    let mut gaps = 0;

    let sample_note = format!(
        "{}/{} drugs advanced from {} in {}",
        transition.advanced,
        transition.entered,
        stage.as_str(),
        precedent.indication
    );
    if transition.low_confidence {
        gaps += 1;
        result.push_factor("base_rate", base, format!("{sample_note} (low sample)"));
    } else {
        result.push_factor("base_rate", base, sample_note);
    }

    let scores: Vec<f64> = inputs.trial_quality.iter().filter_map(|q| q.value).collect();
    let quality_adj = if scores.is_empty() {
        gaps += 1;
        result.push_factor("quality_adjustment", 0.0, "no active trials scored");
        0.0
    } else {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let category = QualityCategory::from_score(mean, &cfg.trial_quality);
        let adj = quality_adjustment(category, &cfg.probability);
        result.push_factor(
            "quality_adjustment",
            adj,
            format!("mean quality {mean:.1} over {} trials ({category})", scores.len()),
        );
        adj
    };

    let competitive_adj = match inputs.competitive.value {
        Some(adj) => {
            result.push_factor(
                "competitive_adjustment",
                adj,
                format!("competitive position {:?}", inputs.competitive.category),
            );
            adj
        }
        None => {
            gaps += 1;
            result.push_factor("competitive_adjustment", 0.0, "no competitive data");
            0.0
        }
    };

    let raw = base + quality_adj + competitive_adj;
    let p = &cfg.probability;
    let (probability, clamped) = clamp_with_flag(raw, p.floor_pct, p.ceiling_pct);
    if clamped {
        result.push_factor(
            "clamp",
            probability - raw,
            format!("raw {raw:.1}% clamped to [{}, {}]", p.floor_pct, p.ceiling_pct),
        );
    } else {
        result.push_factor(
            "clamp",
            0.0,
            format!("not applied; within [{}, {}]", p.floor_pct, p.ceiling_pct),
        );
    }

    result.value = Some(probability);
    result.confidence = Confidence::from_gaps(gaps);

    debug!(
        indication = %precedent.indication,
        stage = stage.as_str(),
        base,
        quality_adj,
        competitive_adj,
        probability,
        confidence = %result.confidence,
        "Computed approval probability"
    );

    result
}
