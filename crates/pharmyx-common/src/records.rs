//! Record shapes supplied by the data layer.
//! The engine reads these as immutable snapshots and never writes them back.

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::error::{PharmyxError, Result};

// ---------------------------------------------------------------------------
// Trial phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialPhase {
    Phase1,
    Phase2,
    Phase3,
    /// Post-marketing study.
    Phase4,
}

impl TrialPhase {
    pub fn ordinal(&self) -> u8 {
        match self {
            TrialPhase::Phase1 => 1,
            TrialPhase::Phase2 => 2,
            TrialPhase::Phase3 => 3,
            TrialPhase::Phase4 => 4,
        }
    }

    pub fn from_ordinal(n: u8) -> Result<Self> {
        match n {
            1 => Ok(TrialPhase::Phase1),
            2 => Ok(TrialPhase::Phase2),
            3 => Ok(TrialPhase::Phase3),
            4 => Ok(TrialPhase::Phase4),
            other => Err(PharmyxError::invalid_record(format!(
                "trial phase ordinal {other} is outside 1..=4"
            ))),
        }
    }

    /// Parse a registry phase label such as `"Phase 2"`, `"PHASE2"`,
    /// `"Phase 1/Phase 2"` or `"Early Phase 1"`.
    /// Combined labels resolve to the highest phase named.
    /// Returns None for `"N/A"` and anything without a phase digit.
    pub fn parse_label(label: &str) -> Option<Self> {
        let lower = label.to_ascii_lowercase();
        if !lower.contains("phase") && lower.trim().parse::<u8>().is_err() {
            return None;
        }
        lower
            .chars()
            .filter_map(|c| c.to_digit(10))
            .filter_map(|d| Self::from_ordinal(d as u8).ok())
            .max()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrialPhase::Phase1 => "phase_1",
            TrialPhase::Phase2 => "phase_2",
            TrialPhase::Phase3 => "phase_3",
            TrialPhase::Phase4 => "phase_4",
        }
    }

    pub fn is_post_marketing(&self) -> bool {
        matches!(self, TrialPhase::Phase4)
    }
}

/// Phase as it arrives from the data layer: an ordinal or a label.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPhase {
    Ordinal(u8),
    Label(String),
}

/// Ordinals outside 1..=4 are rejected; labels without a phase (`"N/A"`)
/// become unknown.
fn deserialize_phase<'de, D>(deserializer: D) -> std::result::Result<Option<TrialPhase>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawPhase>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPhase::Ordinal(n)) => TrialPhase::from_ordinal(n).map(Some).map_err(de::Error::custom),
        Some(RawPhase::Label(label)) => Ok(TrialPhase::parse_label(&label)),
    }
}

// ---------------------------------------------------------------------------
// Trial design attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blinding {
    None,
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointCategory {
    OverallSurvival,
    ProgressionFreeSurvival,
    Surrogate,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Recruiting,
    NotYetRecruiting,
    ActiveNotRecruiting,
    Completed,
    Terminated,
    Withdrawn,
    Suspended,
    #[default]
    Unknown,
}

impl TrialStatus {
    /// Withdrawn trials never enrolled and terminated trials stopped early;
    /// neither describes how the drug is currently being studied.
    pub fn is_active(&self) -> bool {
        !matches!(self, TrialStatus::Withdrawn | TrialStatus::Terminated)
    }

    /// Parse a ClinicalTrials.gov `OverallStatus` value.
    pub fn from_registry(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().replace([' ', ','], "_").as_str() {
            "RECRUITING" | "ENROLLING_BY_INVITATION" => TrialStatus::Recruiting,
            "NOT_YET_RECRUITING"                     => TrialStatus::NotYetRecruiting,
            "ACTIVE_NOT_RECRUITING" | "ACTIVE__NOT_RECRUITING" => TrialStatus::ActiveNotRecruiting,
            "COMPLETED"                              => TrialStatus::Completed,
            "TERMINATED"                             => TrialStatus::Terminated,
            "WITHDRAWN"                              => TrialStatus::Withdrawn,
            "SUSPENDED"                              => TrialStatus::Suspended,
            _                                        => TrialStatus::Unknown,
        }
    }
}

fn deserialize_status<'de, D>(deserializer: D) -> std::result::Result<TrialStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| TrialStatus::from_registry(&s)).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Trial
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub id: String, // e.g. NCT04956640
    #[serde(default, deserialize_with = "deserialize_phase")]
    pub phase: Option<TrialPhase>,
    /// Conditions studied, as free-text indication names.
    #[serde(default)]
    pub indications: Vec<String>,
    #[serde(default)]
    pub randomized: Option<bool>,
    #[serde(default)]
    pub blinding: Option<Blinding>,
    #[serde(default)]
    pub has_placebo_arm: bool,
    #[serde(default)]
    pub has_active_comparator: bool,
    #[serde(default)]
    pub primary_endpoint: Option<EndpointCategory>,
    #[serde(default)]
    pub enrollment: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: TrialStatus,
}

impl TrialRecord {
    /// Does this trial study the given (normalised) indication?
    pub fn studies(&self, key: &str) -> bool {
        self.indications.iter().any(|i| indication_key(i) == key)
    }
}

// ---------------------------------------------------------------------------
// Patents and regulatory exclusivity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatentType {
    Substance,
    Formulation,
    Use,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusivityRecord {
    pub code: String, // e.g. NCE, ODE, PED
    pub expiry: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub patent_number: String,
    pub expiry: NaiveDate,
    pub patent_type: PatentType,
    #[serde(default)]
    pub exclusivities: Vec<ExclusivityRecord>,
}

// ---------------------------------------------------------------------------
// Drug
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    pub id: String,
    /// Explicit approval flag. Frequently unset in source data.
    #[serde(default)]
    pub is_approved: Option<bool>,
    #[serde(default)]
    pub first_approval: Option<NaiveDate>,
    /// Indications the data layer knows the drug is approved for.
    #[serde(default)]
    pub approved_indications: Vec<String>,
    #[serde(default)]
    pub trials: Vec<TrialRecord>,
    #[serde(default)]
    pub patents: Vec<PatentRecord>,
}

impl DrugRecord {
    pub fn trials_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a TrialRecord> + 'a {
        self.trials.iter().filter(move |t| t.studies(key))
    }

    pub fn is_approved_for(&self, key: &str) -> bool {
        self.approved_indications.iter().any(|i| indication_key(i) == key)
    }

    /// Every normalised indication this drug touches, trial or approval.
    pub fn indication_keys(&self) -> HashSet<String> {
        self.trials
            .iter()
            .flat_map(|t| t.indications.iter())
            .chain(self.approved_indications.iter())
            .map(|i| indication_key(i))
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Normalise an indication name into the key used for grouping:
/// trimmed, lower-cased, inner whitespace collapsed.
pub fn indication_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Boundary validation
// ---------------------------------------------------------------------------

/// Reject structurally malformed drug records at ingestion.
/// Data gaps (unknown phase, unset flag, missing patents) are NOT errors.
pub fn validate_drug(drug: &DrugRecord) -> Result<()> {
    if drug.id.trim().is_empty() {
        return Err(PharmyxError::invalid_record("drug id is empty"));
    }

    let mut seen = HashSet::new();
    for trial in &drug.trials {
        if trial.id.trim().is_empty() {
            return Err(PharmyxError::invalid_record(format!(
                "drug {} has a trial with an empty id",
                drug.id
            )));
        }
        if !seen.insert(trial.id.as_str()) {
            return Err(PharmyxError::invalid_record(format!(
                "drug {} lists trial {} more than once",
                drug.id, trial.id
            )));
        }
    }

    for patent in &drug.patents {
        if patent.patent_number.trim().is_empty() {
            return Err(PharmyxError::invalid_record(format!(
                "drug {} has a patent with an empty number",
                drug.id
            )));
        }
        if patent.exclusivities.iter().any(|e| e.code.trim().is_empty()) {
            return Err(PharmyxError::invalid_record(format!(
                "patent {} has an exclusivity with an empty code",
                patent.patent_number
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(id: &str) -> TrialRecord {
        TrialRecord {
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
        }
    }

    fn drug(id: &str, trials: Vec<TrialRecord>) -> DrugRecord {
        DrugRecord {
            id: id.to_string(),
            is_approved: None,
            first_approval: None,
            approved_indications: vec![],
            trials,
            patents: vec![],
        }
    }

    #[test]
    fn test_parse_phase_labels() {
        assert_eq!(TrialPhase::parse_label("Phase 2"), Some(TrialPhase::Phase2));
        assert_eq!(TrialPhase::parse_label("PHASE3"), Some(TrialPhase::Phase3));
        assert_eq!(TrialPhase::parse_label("Phase 1/Phase 2"), Some(TrialPhase::Phase2));
        assert_eq!(TrialPhase::parse_label("Early Phase 1"), Some(TrialPhase::Phase1));
        assert_eq!(TrialPhase::parse_label("4"), Some(TrialPhase::Phase4));
        assert_eq!(TrialPhase::parse_label("N/A"), None);
        assert_eq!(TrialPhase::parse_label("Phase 7"), None);
    }

    #[test]
    fn test_phase_ordinal_out_of_range_rejected() {
        assert!(TrialPhase::from_ordinal(0).is_err());
        assert!(TrialPhase::from_ordinal(5).is_err());
        assert_eq!(TrialPhase::from_ordinal(3).unwrap(), TrialPhase::Phase3);
    }

    #[test]
    fn test_indication_key_normalises() {
        assert_eq!(indication_key("  Non-Small Cell   Lung Cancer "), "non-small cell lung cancer");
    }

    #[test]
    fn test_registry_status() {
        assert_eq!(TrialStatus::from_registry("ACTIVE_NOT_RECRUITING"), TrialStatus::ActiveNotRecruiting);
        assert_eq!(TrialStatus::from_registry("Withdrawn"), TrialStatus::Withdrawn);
        assert_eq!(TrialStatus::from_registry("whatever"), TrialStatus::Unknown);
        assert!(!TrialStatus::Terminated.is_active());
        assert!(TrialStatus::Unknown.is_active());
    }

    #[test]
    fn test_trial_phase_ingestion_forms() {
        let phase = |raw: &str| {
            serde_json::from_str::<TrialRecord>(&format!(r#"{{"id": "NCT1", "phase": {raw}}}"#))
                .map(|t| t.phase)
        };
        assert_eq!(phase("2").unwrap(), Some(TrialPhase::Phase2));
        assert_eq!(phase(r#""phase_3""#).unwrap(), Some(TrialPhase::Phase3));
        assert_eq!(phase(r#""Phase 1/Phase 2""#).unwrap(), Some(TrialPhase::Phase2));
        assert_eq!(phase(r#""N/A""#).unwrap(), None);
        assert_eq!(phase("null").unwrap(), None);
        assert!(phase("0").is_err());
        assert!(phase("5").is_err());
    }

    #[test]
    fn test_trial_status_ingestion_forms() {
        let status = |raw: &str| {
            serde_json::from_str::<TrialRecord>(&format!(r#"{{"id": "NCT1", "status": {raw}}}"#))
                .unwrap()
                .status
        };
        assert_eq!(status(r#""active_not_recruiting""#), TrialStatus::ActiveNotRecruiting);
        assert_eq!(status(r#""Active, not recruiting""#), TrialStatus::ActiveNotRecruiting);
        assert_eq!(status(r#""TERMINATED""#), TrialStatus::Terminated);
        assert_eq!(status(r#""no idea""#), TrialStatus::Unknown);
    }

    #[test]
    fn test_serialised_trial_reads_back() {
        let mut t = trial("NCT9");
        t.phase = Some(TrialPhase::Phase4);
        t.status = TrialStatus::NotYetRecruiting;
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(serde_json::from_str::<TrialRecord>(&json).unwrap(), t);
    }

    #[test]
    fn test_negative_enrollment_rejected_at_deserialisation() {
        let json = r#"{"id": "NCT1", "enrollment": -5}"#;
        assert!(serde_json::from_str::<TrialRecord>(json).is_err());
    }

    #[test]
    fn test_sparse_trial_deserialises_with_defaults() {
        let t: TrialRecord = serde_json::from_str(r#"{"id": "NCT1"}"#).unwrap();
        assert_eq!(t, trial("NCT1"));
    }

    #[test]
    fn test_validate_rejects_duplicate_trials() {
        let d = drug("D1", vec![trial("NCT1"), trial("NCT1")]);
        assert!(matches!(validate_drug(&d), Err(PharmyxError::InvalidRecord(_))));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        assert!(validate_drug(&drug(" ", vec![])).is_err());
    }

    #[test]
    fn test_validate_accepts_gaps() {
        assert!(validate_drug(&drug("D1", vec![trial("NCT1"), trial("NCT2")])).is_ok());
    }
}
