//! Indication-specific historical success rates.
//!
//! For every indication in a corpus, drugs are partitioned by the highest
//! stage they reached there and each phase transition rate is computed as
//! |stage >= N+1| / |stage >= N| over distinct drugs. Sparse transitions
//! are kept and flagged low-confidence; there is no population-wide
//! fallback.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use pharmyx_common::engine_config::PrecedentConfig;
use pharmyx_common::records::DrugRecord;

use crate::stage::{stage_in, DevelopmentStage};

/// One phase transition, e.g. Phase 2 → Phase 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRate {
    /// Distinct drugs that reached the starting phase.
    pub entered: u32,
    /// Of those, how many reached the next phase or approval.
    pub advanced: u32,
    /// advanced / entered as a percentage; None when nothing entered.
    pub rate_pct: Option<f64>,
    pub low_confidence: bool,
}

impl TransitionRate {
    pub fn new(entered: u32, advanced: u32, min_sample_size: u32) -> Self {
        let rate_pct = (entered > 0).then(|| advanced as f64 / entered as f64 * 100.0);
        Self {
            entered,
            advanced,
            rate_pct,
            low_confidence: entered < min_sample_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationPrecedent {
    pub indication: String,
    pub phase1_to_phase2: TransitionRate,
    pub phase2_to_phase3: TransitionRate,
    pub phase3_to_approval: TransitionRate,
    /// Distinct drugs observed in the indication.
    pub sample_size: u32,
}

impl IndicationPrecedent {
    /// The transition a drug currently at `stage` is attempting.
    /// None for approved drugs.
    pub fn transition_from(&self, stage: DevelopmentStage) -> Option<&TransitionRate> {
        match stage {
            DevelopmentStage::Phase1 => Some(&self.phase1_to_phase2),
            DevelopmentStage::Phase2 => Some(&self.phase2_to_phase3),
            DevelopmentStage::Phase3 => Some(&self.phase3_to_approval),
            DevelopmentStage::Approved => None,
        }
    }
}

/// Aggregate a full corpus into one precedent per indication key.
///
/// Batch computation: run it against a frozen corpus and publish the
/// result as a snapshot, never per request.
pub fn aggregate_precedents(
    corpus: &[DrugRecord],
    cfg: &PrecedentConfig,
) -> BTreeMap<String, IndicationPrecedent> {
    // indication → drug id → stage; keyed by id so a drug listed twice
    // in the corpus still counts once
    let mut stages: BTreeMap<String, HashMap<&str, DevelopmentStage>> = BTreeMap::new();

    for drug in corpus {
        for key in drug.indication_keys() {
            if let Some(stage) = stage_in(drug, &key) {
                let entry = stages.entry(key).or_default();
                let slot = entry.entry(drug.id.as_str()).or_insert(stage);
                *slot = (*slot).max(stage);
            }
        }
    }

    stages
        .into_iter()
        .map(|(indication, by_drug)| {
            let reached = |stage: DevelopmentStage| {
                by_drug.values().filter(|s| **s >= stage).count() as u32
            };
            let transition = |from: DevelopmentStage, to: DevelopmentStage| {
                TransitionRate::new(reached(from), reached(to), cfg.min_sample_size)
            };

            let precedent = IndicationPrecedent {
                phase1_to_phase2: transition(DevelopmentStage::Phase1, DevelopmentStage::Phase2),
                phase2_to_phase3: transition(DevelopmentStage::Phase2, DevelopmentStage::Phase3),
                phase3_to_approval: transition(DevelopmentStage::Phase3, DevelopmentStage::Approved),
                sample_size: by_drug.len() as u32,
                indication: indication.clone(),
            };
            debug!(
                indication = %indication,
                drugs = precedent.sample_size,
                p2_p3 = ?precedent.phase2_to_phase3.rate_pct,
                "Aggregated indication precedent"
            );
            (indication, precedent)
        })
        .collect()
}

// ── Source trait ────────────────────────────────────────────────────────────

/// Read access to a precedent table.
///
/// Implementations can use:
/// - A published `PrecedentSnapshot` (production)
/// - Mock data (testing)
pub trait PrecedentSource: Send + Sync {
    /// Precedent for a normalised indication key, if the corpus had one.
    fn precedent(&self, indication_key: &str) -> Option<&IndicationPrecedent>;

    /// Identifies the snapshot the precedent came from.
    fn version(&self) -> &str;
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Mock source with hand-set precedents for unit tests.
pub struct MockPrecedentSource {
    data: HashMap<String, IndicationPrecedent>,
}

impl MockPrecedentSource {
    pub fn new() -> Self {
        Self { data: HashMap::new() }
    }

    /// Add an indication where every transition has the given rate and
    /// sample size.
    pub fn with(mut self, indication: &str, rate_pct: f64, entered: u32, min_sample_size: u32) -> Self {
        let advanced = (rate_pct / 100.0 * entered as f64).round() as u32;
        let mut t = TransitionRate::new(entered, advanced, min_sample_size);
        t.rate_pct = Some(rate_pct);
        self.data.insert(
            indication.to_string(),
            IndicationPrecedent {
                indication: indication.to_string(),
                phase1_to_phase2: t.clone(),
                phase2_to_phase3: t.clone(),
                phase3_to_approval: t,
                sample_size: entered,
            },
        );
        self
    }
}

impl Default for MockPrecedentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PrecedentSource for MockPrecedentSource {
    fn precedent(&self, indication_key: &str) -> Option<&IndicationPrecedent> {
        self.data.get(indication_key)
    }

    fn version(&self) -> &str {
        "mock"
    }
}
