//! Regulatory status classification.
//!
//! Runs once per drug snapshot. Rules are evaluated in the fixed order of
//! `CLASSIFICATION_ORDER` and the first match wins. The explicit flag must
//! be consulted before any phase evidence: checking the current phase first
//! misclassifies approved drugs that still run early-phase trials.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use pharmyx_common::records::{DrugRecord, TrialPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    /// On the market and still being studied in phase 1–3 trials.
    ApprovedWithOngoingStudies,
    Pipeline,
}

impl ApprovalStatus {
    pub fn is_marketed(&self) -> bool {
        !matches!(self, ApprovalStatus::Pipeline)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Approved                   => "approved",
            ApprovalStatus::ApprovedWithOngoingStudies => "approved_with_ongoing_studies",
            ApprovalStatus::Pipeline                   => "pipeline",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rules, one per branch of the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationRule {
    /// `is_approved` is explicitly true.
    ExplicitApprovalFlag,
    /// Only post-marketing trials: de-facto approval despite an unset flag.
    PostMarketingOnly,
    /// Post-marketing trials alongside phase 1–3 trials.
    PostMarketingWithOngoingStudies,
    /// The data layer lists at least one approved indication.
    ListedIndicationApproval,
    /// Fallthrough.
    Pipeline,
}

/// Evaluation order. First match wins; do not reorder.
pub const CLASSIFICATION_ORDER: [ClassificationRule; 5] = [
    ClassificationRule::ExplicitApprovalFlag,
    ClassificationRule::PostMarketingOnly,
    ClassificationRule::PostMarketingWithOngoingStudies,
    ClassificationRule::ListedIndicationApproval,
    ClassificationRule::Pipeline,
];

/// Phase evidence extracted from a drug's trials.
/// Trials with unknown phase contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseEvidence {
    pub flag: Option<bool>,
    pub has_listed_approval: bool,
    pub has_post_marketing: bool,
    /// Highest phase 1–3 trial, if any.
    pub highest_clinical: Option<TrialPhase>,
}

impl PhaseEvidence {
    pub fn from_drug(drug: &DrugRecord) -> Self {
        let phases = drug.trials.iter().filter_map(|t| t.phase);
        let mut has_post_marketing = false;
        let mut highest_clinical = None;
        for phase in phases {
            if phase.is_post_marketing() {
                has_post_marketing = true;
            } else {
                highest_clinical = highest_clinical.max(Some(phase));
            }
        }
        Self {
            flag: drug.is_approved,
            has_listed_approval: !drug.approved_indications.is_empty(),
            has_post_marketing,
            highest_clinical,
        }
    }
}

impl ClassificationRule {
    pub fn evaluate(&self, evidence: &PhaseEvidence) -> Option<ApprovalStatus> {
        match self {
            ClassificationRule::ExplicitApprovalFlag => {
                (evidence.flag == Some(true)).then_some(ApprovalStatus::Approved)
            }
            ClassificationRule::PostMarketingOnly => {
                (evidence.has_post_marketing && evidence.highest_clinical.is_none())
                    .then_some(ApprovalStatus::Approved)
            }
            ClassificationRule::PostMarketingWithOngoingStudies => {
                (evidence.has_post_marketing && evidence.highest_clinical.is_some())
                    .then_some(ApprovalStatus::ApprovedWithOngoingStudies)
            }
            ClassificationRule::ListedIndicationApproval => {
                evidence.has_listed_approval.then_some(ApprovalStatus::Approved)
            }
            ClassificationRule::Pipeline => Some(ApprovalStatus::Pipeline),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalClassification {
    pub status: ApprovalStatus,
    /// Only set for pipeline drugs with at least one phased trial.
    pub current_phase: Option<TrialPhase>,
    pub rule: ClassificationRule,
}

impl ApprovalClassification {
    /// A pipeline drug with no phased trials: not "phase 0", just unknown.
    pub fn insufficient_data(&self) -> bool {
        self.status == ApprovalStatus::Pipeline && self.current_phase.is_none()
    }
}

pub fn classify(drug: &DrugRecord) -> ApprovalClassification {
    let evidence = PhaseEvidence::from_drug(drug);

    let (rule, status) = CLASSIFICATION_ORDER
        .iter()
        .find_map(|rule| rule.evaluate(&evidence).map(|status| (*rule, status)))
        .unwrap_or((ClassificationRule::Pipeline, ApprovalStatus::Pipeline));

    let current_phase = match status {
        ApprovalStatus::Pipeline => evidence.highest_clinical,
        _ => None,
    };

    debug!(
        drug = %drug.id,
        status = %status,
        rule = ?rule,
        current_phase = ?current_phase,
        "Classified approval status"
    );

    ApprovalClassification {
        status,
        current_phase,
        rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmyx_common::records::TrialPhase::*;
    use pharmyx_test_utils::{DrugBuilder, TrialBuilder};

    #[test]
    fn test_explicit_flag_beats_phase1_only() {
        let d = DrugBuilder::new("D").approved(true).phases("NSCLC", &[Phase1]).build();
        let c = classify(&d);
        assert_eq!(c.status, ApprovalStatus::Approved);
        assert_eq!(c.rule, ClassificationRule::ExplicitApprovalFlag);
        assert_eq!(c.current_phase, None);
    }

    #[test]
    fn test_explicit_flag_with_no_trials() {
        let d = DrugBuilder::new("D").approved(true).build();
        assert_eq!(classify(&d).status, ApprovalStatus::Approved);
    }

    #[test]
    fn test_phase4_only_is_approved_without_flag() {
        let d = DrugBuilder::new("D").phases("NSCLC", &[Phase4, Phase4]).build();
        let c = classify(&d);
        assert_eq!(c.status, ApprovalStatus::Approved);
        assert_eq!(c.rule, ClassificationRule::PostMarketingOnly);
    }

    #[test]
    fn test_phase2_and_phase4_is_ongoing_studies() {
        let d = DrugBuilder::new("D").phases("NSCLC", &[Phase2, Phase4]).build();
        let c = classify(&d);
        assert_eq!(c.status, ApprovalStatus::ApprovedWithOngoingStudies);
        assert_eq!(c.current_phase, None, "marketed drugs get no current phase");
    }

    #[test]
    fn test_flag_false_still_honours_phase_evidence() {
        let d = DrugBuilder::new("D").approved(false).phases("NSCLC", &[Phase4]).build();
        assert_eq!(classify(&d).status, ApprovalStatus::Approved);
    }

    #[test]
    fn test_pipeline_current_phase_is_highest() {
        let d = DrugBuilder::new("D").phases("NSCLC", &[Phase1, Phase3, Phase2]).build();
        let c = classify(&d);
        assert_eq!(c.status, ApprovalStatus::Pipeline);
        assert_eq!(c.current_phase, Some(Phase3));
        assert!(!c.insufficient_data());
    }

    #[test]
    fn test_no_trials_is_insufficient_data() {
        let d = DrugBuilder::new("D").build();
        let c = classify(&d);
        assert_eq!(c.status, ApprovalStatus::Pipeline);
        assert_eq!(c.current_phase, None);
        assert!(c.insufficient_data());
    }

    #[test]
    fn test_unknown_phase_trials_ignored() {
        let d = DrugBuilder::new("D")
            .phases("NSCLC", &[Phase4])
            .trial(TrialBuilder::new("X").build())
            .build();
        assert_eq!(classify(&d).status, ApprovalStatus::Approved);

        let only_unknown = DrugBuilder::new("E").trial(TrialBuilder::new("Y").build()).build();
        assert!(classify(&only_unknown).insufficient_data());
    }

    #[test]
    fn test_rule_order_contract() {
        assert_eq!(
            CLASSIFICATION_ORDER,
            [
                ClassificationRule::ExplicitApprovalFlag,
                ClassificationRule::PostMarketingOnly,
                ClassificationRule::PostMarketingWithOngoingStudies,
                ClassificationRule::ListedIndicationApproval,
                ClassificationRule::Pipeline,
            ]
        );
        // Every evidence combination is claimed by exactly the first matching rule
        let flagged_mixed = PhaseEvidence {
            flag: Some(true),
            has_listed_approval: false,
            has_post_marketing: true,
            highest_clinical: Some(Phase1),
        };
        assert_eq!(
            ClassificationRule::PostMarketingWithOngoingStudies.evaluate(&flagged_mixed),
            Some(ApprovalStatus::ApprovedWithOngoingStudies)
        );
        assert_eq!(
            classify(&DrugBuilder::new("D").approved(true).phases("X", &[Phase1, Phase4]).build()).rule,
            ClassificationRule::ExplicitApprovalFlag
        );
    }

    #[test]
    fn test_listed_approval_is_marketed() {
        let d = DrugBuilder::new("D").approved_for("NSCLC").phases("NSCLC", &[Phase2]).build();
        let c = classify(&d);
        assert_eq!(c.status, ApprovalStatus::Approved);
        assert_eq!(c.rule, ClassificationRule::ListedIndicationApproval);
        assert_eq!(c.current_phase, None);
    }

    #[test]
    fn test_post_marketing_rules_precede_listed_approval() {
        let d = DrugBuilder::new("D").approved_for("NSCLC").phases("NSCLC", &[Phase2, Phase4]).build();
        let c = classify(&d);
        assert_eq!(c.status, ApprovalStatus::ApprovedWithOngoingStudies);
        assert_eq!(c.rule, ClassificationRule::PostMarketingWithOngoingStudies);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let d = DrugBuilder::new("D").phases("NSCLC", &[Phase2, Phase4]).build();
        assert_eq!(classify(&d), classify(&d));
    }
}
