//! Patent cliff risk for marketed drugs.
//!
//! All dates are measured against an explicit `as_of` date so results are
//! reproducible; nothing here reads the wall clock.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use pharmyx_common::engine_config::PatentRiskConfig;
use pharmyx_common::records::DrugRecord;
use pharmyx_common::score::{Confidence, ScoreFactor, ScoreResult};

use crate::approval_status::ApprovalClassification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    High,
    Medium,
    Low,
    /// No patent data. Never reported as Low.
    Unknown,
}

impl RiskTier {
    /// Tier for protection lost on `loss`, with breakpoints measured in
    /// calendar years from `as_of`.
    pub fn from_loss_date(as_of: NaiveDate, loss: NaiveDate, cfg: &PatentRiskConfig) -> Self {
        if loss < add_years(as_of, cfg.high_below_years) {
            RiskTier::High
        } else if loss <= add_years(as_of, cfg.medium_up_to_years) {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::High    => "high",
            RiskTier::Medium  => "medium",
            RiskTier::Low     => "low",
            RiskTier::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRiskReport {
    pub as_of: NaiveDate,
    pub earliest_patent_expiry: Option<NaiveDate>,
    pub latest_patent_expiry: Option<NaiveDate>,
    /// Any regulatory exclusivity still running at `as_of`.
    pub exclusivity_active: bool,
    /// Earliest expiry among protections still in force at `as_of`.
    /// None when every protection has lapsed or there is no data.
    pub loss_of_protection: Option<NaiveDate>,
    /// Value is years from `as_of` to `loss_of_protection`.
    pub risk: ScoreResult<RiskTier>,
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}

fn add_years(date: NaiveDate, years: u32) -> NaiveDate {
    add_months(date, years.saturating_mul(12))
}

/// Calendar years from `from` to `to` (`to >= from`): whole months
/// elapsed plus the elapsed fraction of the next month, over 12.
fn years_between(from: NaiveDate, to: NaiveDate) -> f64 {
    let estimate = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    let mut months = estimate.max(0) as u32;
    while months > 0 && add_months(from, months) > to {
        months -= 1;
    }
    let anchor = add_months(from, months);
    let span = (add_months(from, months + 1) - anchor).num_days().max(1);
    let fraction = (to - anchor).num_days() as f64 / span as f64;
    (months as f64 + fraction) / 12.0
}

/// Assess patent and exclusivity risk. None for pipeline drugs.
pub fn assess_patent_risk(
    drug: &DrugRecord,
    classification: &ApprovalClassification,
    as_of: NaiveDate,
    cfg: &PatentRiskConfig,
) -> Option<PatentRiskReport> {
    if !classification.status.is_marketed() {
        return None;
    }

    if drug.patents.is_empty() {
        warn!(drug = %drug.id, "Marketed drug has no patent records");
        let risk = ScoreResult::new(None, RiskTier::Unknown, Confidence::Low).with_factor(
            ScoreFactor::new("no_patents", 0.0, "no patent records on file"),
        );
        return Some(PatentRiskReport {
            as_of,
            earliest_patent_expiry: None,
            latest_patent_expiry: None,
            exclusivity_active: false,
            loss_of_protection: None,
            risk,
        });
    }

    let patent_expiries = drug.patents.iter().map(|p| p.expiry);
    let earliest_patent_expiry = patent_expiries.clone().min();
    let latest_patent_expiry = patent_expiries.max();

    let exclusivities = drug.patents.iter().flat_map(|p| p.exclusivities.iter());
    let exclusivity_active = exclusivities.clone().any(|e| e.expiry > as_of);

    let loss_of_protection = drug
        .patents
        .iter()
        .map(|p| p.expiry)
        .chain(exclusivities.map(|e| e.expiry))
        .filter(|d| *d > as_of)
        .min();

    let mut risk = ScoreResult::new(None, RiskTier::High, Confidence::High);
    match loss_of_protection {
        Some(date) => {
            let years = years_between(as_of, date);
            risk.category = RiskTier::from_loss_date(as_of, date, cfg);
            risk.value = Some(years);
            risk.push_factor(
                "years_to_loss_of_protection",
                years,
                format!("earliest in-force protection expires {date}"),
            );
            if exclusivity_active {
                risk.push_factor("exclusivity_active", 0.0, "regulatory exclusivity still running");
            }
        }
        None => {
            risk.value = Some(0.0);
            risk.push_factor("lapsed", 0.0, format!("all protection lapsed before {as_of}"));
        }
    }

    debug!(
        drug = %drug.id,
        tier = %risk.category,
        years = ?risk.value,
        patents = drug.patents.len(),
        "Assessed patent risk"
    );

    Some(PatentRiskReport {
        as_of,
        earliest_patent_expiry,
        latest_patent_expiry,
        exclusivity_active,
        loss_of_protection,
        risk,
    })
}
