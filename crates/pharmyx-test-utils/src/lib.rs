//! Shared testing utilities for the Pharmyx workspace.
//!
//! Builders keep fixtures short: every attribute starts unknown/absent and
//! tests set only what they exercise.

use chrono::NaiveDate;
use pharmyx_common::records::{
    Blinding, DrugRecord, EndpointCategory, ExclusivityRecord, PatentRecord, PatentType,
    TrialPhase, TrialRecord, TrialStatus,
};

/// Shorthand for a calendar date in fixtures. Panics on an invalid date.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

// ── Trials ────────────────────────────────────────────────────────────────────

pub struct TrialBuilder {
    trial: TrialRecord,
}

impl TrialBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            trial: TrialRecord {
                id: id.to_string(),
                phase: None,
                indications: vec![],
                randomized: None,
                blinding: None,
                has_placebo_arm: false,
                has_active_comparator: false,
                primary_endpoint: None,
                enrollment: None,
                status: TrialStatus::Unknown,
            },
        }
    }

    pub fn phase(mut self, phase: TrialPhase) -> Self {
        self.trial.phase = Some(phase);
        self
    }

    pub fn indication(mut self, name: &str) -> Self {
        self.trial.indications.push(name.to_string());
        self
    }

    pub fn randomized(mut self, randomized: bool) -> Self {
        self.trial.randomized = Some(randomized);
        self
    }

    pub fn blinding(mut self, blinding: Blinding) -> Self {
        self.trial.blinding = Some(blinding);
        self
    }

    pub fn placebo(mut self) -> Self {
        self.trial.has_placebo_arm = true;
        self
    }

    pub fn comparator(mut self) -> Self {
        self.trial.has_active_comparator = true;
        self
    }

    pub fn endpoint(mut self, endpoint: EndpointCategory) -> Self {
        self.trial.primary_endpoint = Some(endpoint);
        self
    }

    pub fn enrollment(mut self, n: u32) -> Self {
        self.trial.enrollment = Some(n);
        self
    }

    pub fn status(mut self, status: TrialStatus) -> Self {
        self.trial.status = status;
        self
    }

    /// Randomised, double-blind, placebo and comparator arms, OS endpoint,
    /// enrollment 500, completed.
    pub fn gold_standard(self) -> Self {
        self.randomized(true)
            .blinding(Blinding::Double)
            .placebo()
            .comparator()
            .endpoint(EndpointCategory::OverallSurvival)
            .enrollment(500)
            .status(TrialStatus::Completed)
    }

    pub fn build(self) -> TrialRecord {
        self.trial
    }
}

/// A bare trial of the given phase in one indication.
pub fn trial(id: &str, phase: TrialPhase, indication: &str) -> TrialRecord {
    TrialBuilder::new(id).phase(phase).indication(indication).build()
}

// ── Drugs ─────────────────────────────────────────────────────────────────────

pub struct DrugBuilder {
    drug: DrugRecord,
}

impl DrugBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            drug: DrugRecord {
                id: id.to_string(),
                is_approved: None,
                first_approval: None,
                approved_indications: vec![],
                trials: vec![],
                patents: vec![],
            },
        }
    }

    pub fn approved(mut self, flag: bool) -> Self {
        self.drug.is_approved = Some(flag);
        self
    }

    pub fn first_approval(mut self, on: NaiveDate) -> Self {
        self.drug.first_approval = Some(on);
        self
    }

    pub fn approved_for(mut self, indication: &str) -> Self {
        self.drug.approved_indications.push(indication.to_string());
        self
    }

    pub fn trial(mut self, trial: TrialRecord) -> Self {
        self.drug.trials.push(trial);
        self
    }

    /// Append a bare trial per phase, ids derived from the drug id.
    pub fn phases(mut self, indication: &str, phases: &[TrialPhase]) -> Self {
        for phase in phases {
            let id = format!("{}-T{}", self.drug.id, self.drug.trials.len() + 1);
            self.drug.trials.push(trial(&id, *phase, indication));
        }
        self
    }

    pub fn patent(mut self, patent: PatentRecord) -> Self {
        self.drug.patents.push(patent);
        self
    }

    pub fn build(self) -> DrugRecord {
        self.drug
    }
}

// ── Patents ───────────────────────────────────────────────────────────────────

pub fn patent(number: &str, expiry: NaiveDate, patent_type: PatentType) -> PatentRecord {
    PatentRecord {
        patent_number: number.to_string(),
        expiry,
        patent_type,
        exclusivities: vec![],
    }
}

pub fn exclusivity(code: &str, expiry: NaiveDate) -> ExclusivityRecord {
    ExclusivityRecord {
        code: code.to_string(),
        expiry,
    }
}
