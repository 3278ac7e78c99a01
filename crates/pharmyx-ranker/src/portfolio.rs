//! Batch scoring of a portfolio snapshot.
//!
//! Every asset (drug × indication) is scored independently against one
//! precedent source, so the work is spread across the rayon pool. Output
//! order matches input order.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use pharmyx_common::engine_config::EngineConfig;
use pharmyx_common::error::{PharmyxError, Result};
use pharmyx_common::records::{indication_key, validate_drug, DrugRecord};

use crate::approval_status::{classify, ApprovalClassification};
use crate::competition::{analyze_competition, CompetitiveSignal};
use crate::composite::{score_composite, CompositeInputs, CompositeScore};
use crate::patent_risk::{assess_patent_risk, PatentRiskReport};
use crate::precedent::PrecedentSource;
use crate::probability::{approval_probability, ApprovalProbability, ProbabilityInputs};
use crate::trial_quality::{score_trial, TrialQuality};

/// One asset to score: a drug in an indication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub drug_id: String,
    pub indication: String,
    #[serde(default)]
    pub composite: Option<CompositeInputs>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Every drug known to the data layer, including competitors.
    pub drugs: Vec<DrugRecord>,
    pub assets: Vec<AssetEntry>,
}

impl PortfolioSnapshot {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Structural checks before any scoring happens.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for drug in &self.drugs {
            validate_drug(drug)?;
            if !ids.insert(drug.id.as_str()) {
                return Err(PharmyxError::invalid_record(format!("duplicate drug id {}", drug.id)));
            }
        }
        for asset in &self.assets {
            if !ids.contains(asset.drug_id.as_str()) {
                return Err(PharmyxError::invalid_record(format!(
                    "asset references unknown drug {}",
                    asset.drug_id
                )));
            }
            if indication_key(&asset.indication).is_empty() {
                return Err(PharmyxError::invalid_record(format!(
                    "asset for {} has an empty indication",
                    asset.drug_id
                )));
            }
            if let Some(inputs) = &asset.composite {
                inputs.validate()?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialQualityEntry {
    pub trial_id: String,
    pub active: bool,
    pub quality: TrialQuality,
}

/// Everything computed for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReport {
    pub drug_id: String,
    pub indication: String,
    pub precedent_version: String,
    pub classification: ApprovalClassification,
    pub trial_quality: Vec<TrialQualityEntry>,
    pub competition: CompetitiveSignal,
    pub probability: ApprovalProbability,
    pub patent_risk: Option<PatentRiskReport>,
    pub composite: Option<CompositeScore>,
}

pub fn score_asset(
    drug: &DrugRecord,
    asset: &AssetEntry,
    all_drugs: &[DrugRecord],
    precedents: &dyn PrecedentSource,
    cfg: &EngineConfig,
    as_of: NaiveDate,
) -> Result<AssetReport> {
    let key = indication_key(&asset.indication);
    let classification = classify(drug);

    let trial_quality: Vec<TrialQualityEntry> = drug
        .trials
        .iter()
        .map(|t| TrialQualityEntry {
            trial_id: t.id.clone(),
            active: t.status.is_active(),
            quality: score_trial(t, &cfg.trial_quality),
        })
        .collect();
    let active_quality: Vec<TrialQuality> = trial_quality
        .iter()
        .filter(|e| e.active)
        .map(|e| e.quality.clone())
        .collect();

    let competition = analyze_competition(drug, &key, all_drugs, &cfg.competition);

    let probability = approval_probability(
        &ProbabilityInputs {
            classification: &classification,
            precedent: precedents.precedent(&key),
            trial_quality: &active_quality,
            competitive: &competition,
        },
        cfg,
    );

    let patent_risk = assess_patent_risk(drug, &classification, as_of, &cfg.patent_risk);

    let composite = asset
        .composite
        .as_ref()
        .map(|inputs| score_composite(inputs, &cfg.composite))
        .transpose()?;

    Ok(AssetReport {
        drug_id: drug.id.clone(),
        indication: key,
        precedent_version: precedents.version().to_string(),
        classification,
        trial_quality,
        competition,
        probability,
        patent_risk,
        composite,
    })
}

/// Score every asset in the snapshot in parallel.
pub fn score_portfolio(
    snapshot: &PortfolioSnapshot,
    precedents: &dyn PrecedentSource,
    cfg: &EngineConfig,
    as_of: NaiveDate,
) -> Result<Vec<AssetReport>> {
    snapshot.validate()?;

    let by_id: HashMap<&str, &DrugRecord> =
        snapshot.drugs.iter().map(|d| (d.id.as_str(), d)).collect();

    let reports = snapshot
        .assets
        .par_iter()
        .map(|asset| {
            let drug = by_id.get(asset.drug_id.as_str()).ok_or_else(|| {
                PharmyxError::invalid_record(format!("asset references unknown drug {}", asset.drug_id))
            })?;
            score_asset(drug, asset, &snapshot.drugs, precedents, cfg, as_of)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        assets = reports.len(),
        drugs = snapshot.drugs.len(),
        precedent_version = %precedents.version(),
        "Portfolio scored"
    );
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval_status::ApprovalStatus;
    use crate::precedent::MockPrecedentSource;
    use pharmyx_common::records::TrialPhase::*;
    use pharmyx_common::records::TrialStatus;
    use pharmyx_test_utils::{date, DrugBuilder, TrialBuilder};

    fn asset(drug_id: &str, indication: &str) -> AssetEntry {
        AssetEntry { drug_id: drug_id.into(), indication: indication.into(), composite: None }
    }

    #[test]
    fn test_unknown_drug_rejected() {
        let snapshot = PortfolioSnapshot {
            drugs: vec![DrugBuilder::new("A").phases("NSCLC", &[Phase2]).build()],
            assets: vec![asset("Z", "NSCLC")],
        };
        let err = score_portfolio(&snapshot, &MockPrecedentSource::new(), &EngineConfig::default(), date(2025, 1, 1))
            .unwrap_err();
        assert!(matches!(err, PharmyxError::InvalidRecord(_)));
    }

    #[test]
    fn test_duplicate_drug_ids_rejected() {
        let snapshot = PortfolioSnapshot {
            drugs: vec![DrugBuilder::new("A").build(), DrugBuilder::new("A").build()],
            assets: vec![],
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_invalid_composite_rejected_before_scoring() {
        let mut entry = asset("A", "NSCLC");
        entry.composite = Some(CompositeInputs::new(Some(120.0), Some(50.0), Some(50.0)));
        let snapshot = PortfolioSnapshot {
            drugs: vec![DrugBuilder::new("A").phases("NSCLC", &[Phase2]).build()],
            assets: vec![entry],
        };
        assert!(matches!(snapshot.validate(), Err(PharmyxError::OutOfRange { .. })));
    }

    #[test]
    fn test_output_order_matches_input() {
        let drugs: Vec<_> = (0..20)
            .map(|i| DrugBuilder::new(&format!("D{i}")).phases("NSCLC", &[Phase2]).build())
            .collect();
        let assets: Vec<_> = (0..20).rev().map(|i| asset(&format!("D{i}"), "NSCLC")).collect();
        let snapshot = PortfolioSnapshot { drugs, assets };
        let src = MockPrecedentSource::new().with("nsclc", 30.0, 50, 10);

        let reports = score_portfolio(&snapshot, &src, &EngineConfig::default(), date(2025, 1, 1)).unwrap();
        let ids: Vec<_> = reports.iter().map(|r| r.drug_id.clone()).collect();
        let expected: Vec<_> = (0..20).rev().map(|i| format!("D{i}")).collect();
        assert_eq!(ids, expected);
        assert!(reports.iter().all(|r| r.precedent_version == "mock"));
    }

    #[test]
    fn test_marketed_asset_gets_patent_risk_not_probability() {
        let snapshot = PortfolioSnapshot {
            drugs: vec![DrugBuilder::new("A").phases("NSCLC", &[Phase2, Phase4]).build()],
            assets: vec![asset("A", "NSCLC")],
        };
        let src = MockPrecedentSource::new().with("nsclc", 30.0, 50, 10);
        let reports = score_portfolio(&snapshot, &src, &EngineConfig::default(), date(2025, 1, 1)).unwrap();
        let r = &reports[0];
        assert_eq!(r.classification.status, ApprovalStatus::ApprovedWithOngoingStudies);
        assert_eq!(r.probability.value, None);
        assert!(r.patent_risk.is_some());
        assert_eq!(r.trial_quality.len(), 2);
    }

    #[test]
    fn test_listed_approval_gets_no_probability() {
        let snapshot = PortfolioSnapshot {
            drugs: vec![DrugBuilder::new("A").approved_for("NSCLC").phases("NSCLC", &[Phase2]).build()],
            assets: vec![asset("A", "NSCLC")],
        };
        let src = MockPrecedentSource::new().with("nsclc", 30.0, 50, 10);
        let reports = score_portfolio(&snapshot, &src, &EngineConfig::default(), date(2025, 1, 1)).unwrap();
        let r = &reports[0];
        assert_eq!(r.classification.status, ApprovalStatus::Approved);
        assert_eq!(r.probability.value, None);
        assert!(r.patent_risk.is_some());
    }

    #[test]
    fn test_inactive_trials_excluded_from_quality_adjustment() {
        let drug = DrugBuilder::new("A")
            .trial(TrialBuilder::new("T1").phase(Phase2).indication("NSCLC").gold_standard().build())
            .trial(
                TrialBuilder::new("T2")
                    .phase(Phase2)
                    .indication("NSCLC")
                    .status(TrialStatus::Terminated)
                    .build(),
            )
            .build();
        let snapshot = PortfolioSnapshot { drugs: vec![drug], assets: vec![asset("A", "NSCLC")] };
        let src = MockPrecedentSource::new().with("nsclc", 30.0, 50, 10);
        let reports = score_portfolio(&snapshot, &src, &EngineConfig::default(), date(2025, 1, 1)).unwrap();
        let r = &reports[0];

        assert_eq!(r.trial_quality.len(), 2);
        assert!(!r.trial_quality[1].active);
        // Only the gold-standard trial counts: Excellent, +10
        let adj = r.probability.factor("quality_adjustment").unwrap();
        assert_eq!(adj.points, 10.0);
    }
}
