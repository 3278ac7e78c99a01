//! Development stage of a drug within one indication.

use serde::{Deserialize, Serialize};

use pharmyx_common::records::{DrugRecord, TrialPhase};

/// Highest point a drug has reached in an indication.
/// Ordered: Phase1 < Phase2 < Phase3 < Approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentStage {
    Phase1,
    Phase2,
    Phase3,
    Approved,
}

impl DevelopmentStage {
    /// A post-marketing (phase 4) trial implies the drug is on the market.
    pub fn from_phase(phase: TrialPhase) -> Self {
        match phase {
            TrialPhase::Phase1 => DevelopmentStage::Phase1,
            TrialPhase::Phase2 => DevelopmentStage::Phase2,
            TrialPhase::Phase3 => DevelopmentStage::Phase3,
            TrialPhase::Phase4 => DevelopmentStage::Approved,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DevelopmentStage::Phase1   => "phase_1",
            DevelopmentStage::Phase2   => "phase_2",
            DevelopmentStage::Phase3   => "phase_3",
            DevelopmentStage::Approved => "approved",
        }
    }
}

/// Stage of `drug` in the indication with normalised key `key`.
///
/// Highest phase among trials listing the indication, lifted to Approved by
/// a phase 4 trial there or an explicit per-indication approval.
///
/// A drug flagged `is_approved` with no listed approvals counts as approved
/// in every indication where it has a phased trial. Once approvals are
/// listed, only those indications are lifted.
/// Trials with unknown phase are ignored. None if nothing places the drug
/// in the indication.
pub fn stage_in(drug: &DrugRecord, key: &str) -> Option<DevelopmentStage> {
    if drug.is_approved_for(key) {
        return Some(DevelopmentStage::Approved);
    }
    let highest = drug
        .trials_for(key)
        .filter_map(|t| t.phase)
        .map(DevelopmentStage::from_phase)
        .max()?;

    let flagged = drug.is_approved == Some(true) && drug.approved_indications.is_empty();
    Some(if flagged { DevelopmentStage::Approved } else { highest })
}
