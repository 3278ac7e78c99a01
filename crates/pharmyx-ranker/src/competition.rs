//! Competitive landscape adjustment for one drug in one indication.
//!
//! The signal is bounded and symmetric around zero: a bonus when the
//! subject is strictly the most advanced asset, minus a fixed penalty per
//! competitor at or beyond the subject's stage. More competitors never
//! raise the signal.

use serde::{Deserialize, Serialize};

use pharmyx_common::engine_config::CompetitionConfig;
use pharmyx_common::records::{indication_key, DrugRecord};
use pharmyx_common::score::{clamp_with_flag, Confidence, ScoreFactor, ScoreResult};

use crate::stage::{stage_in, DevelopmentStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitivePosition {
    /// No other asset at or beyond the subject's stage.
    Leader,
    /// Competitors at the same stage, none ahead.
    Parity,
    /// At least one competitor at a later stage.
    Trailing,
    /// The subject has no stage in this indication.
    Unplaced,
}

pub type CompetitiveSignal = ScoreResult<CompetitivePosition>;

/// Counts behind a competitive signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompetitorCounts {
    pub total: usize,
    pub at_or_beyond: usize,
    pub ahead: usize,
}

pub fn count_competitors(
    subject_id: &str,
    subject_stage: DevelopmentStage,
    key: &str,
    others: &[DrugRecord],
) -> CompetitorCounts {
    others
        .iter()
        .filter(|d| d.id != subject_id)
        .filter_map(|d| stage_in(d, key))
        .fold(CompetitorCounts::default(), |mut acc, stage| {
            acc.total += 1;
            if stage >= subject_stage {
                acc.at_or_beyond += 1;
            }
            if stage > subject_stage {
                acc.ahead += 1;
            }
            acc
        })
}

/// Competitive adjustment, in percentage points, for `subject` in
/// `indication` given the other drugs associated with it.
/// The subject is skipped if it also appears in `others`.
pub fn analyze_competition(
    subject: &DrugRecord,
    indication: &str,
    others: &[DrugRecord],
    cfg: &CompetitionConfig,
) -> CompetitiveSignal {
    let key = indication_key(indication);

    let Some(stage) = stage_in(subject, &key) else {
        return ScoreResult::new(None, CompetitivePosition::Unplaced, Confidence::Low)
            .with_factor(ScoreFactor::new(
                "unplaced",
                0.0,
                format!("{} has no trials or approval in {key}", subject.id),
            ));
    };

    let counts = count_competitors(&subject.id, stage, &key, others);
    let position = if counts.ahead > 0 {
        CompetitivePosition::Trailing
    } else if counts.at_or_beyond > 0 {
        CompetitivePosition::Parity
    } else {
        CompetitivePosition::Leader
    };

    let mut signal = ScoreResult::new(None, position, Confidence::High);
    let mut raw = 0.0;

    if position == CompetitivePosition::Leader {
        raw += cfg.leader_bonus;
        signal.push_factor(
            "most_advanced",
            cfg.leader_bonus,
            format!("most advanced of {} assets at {}", counts.total + 1, stage.as_str()),
        );
    }

    if counts.at_or_beyond > 0 {
        let penalty = cfg.per_competitor_penalty * counts.at_or_beyond as f64;
        raw -= penalty;
        signal.push_factor(
            "competitors_at_or_beyond",
            -penalty,
            format!(
                "{} competitors at or beyond {} ({} ahead)",
                counts.at_or_beyond,
                stage.as_str(),
                counts.ahead
            ),
        );
    }

    let (adjustment, clamped) = clamp_with_flag(raw, -cfg.bound, cfg.bound);
    if clamped {
        signal.push_factor("clamp", adjustment - raw, format!("bounded to ±{}", cfg.bound));
    }

    signal.value = Some(adjustment);
    signal
}
