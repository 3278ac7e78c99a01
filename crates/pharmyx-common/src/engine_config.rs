//! Tunable constants for the scoring engine.
//!
//! Every point value, breakpoint and weight used by the scorers lives here
//! as a named parameter. Configs can be loaded from YAML, JSON or TOML;
//! omitted fields fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PharmyxError, Result};

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub trial_quality: TrialQualityConfig,

    #[serde(default)]
    pub precedent: PrecedentConfig,

    #[serde(default)]
    pub competition: CompetitionConfig,

    #[serde(default)]
    pub probability: ProbabilityConfig,

    #[serde(default)]
    pub patent_risk: PatentRiskConfig,

    #[serde(default)]
    pub composite: CompositeWeights,
}

// ── Trial Quality ─────────────────────────────────────────────────────────────

/// Points awarded per design attribute, plus category breakpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialQualityConfig {
    #[serde(default = "default_randomized_points")]
    pub randomized_points: f64,

    #[serde(default = "default_double_blind_points")]
    pub double_blind_points: f64,

    #[serde(default = "default_single_blind_points")]
    pub single_blind_points: f64,

    #[serde(default = "default_placebo_points")]
    pub placebo_points: f64,

    #[serde(default = "default_comparator_points")]
    pub active_comparator_points: f64,

    /// Overall survival or progression-free survival endpoint
    #[serde(default = "default_survival_endpoint_points")]
    pub survival_endpoint_points: f64,

    #[serde(default = "default_surrogate_endpoint_points")]
    pub surrogate_endpoint_points: f64,

    #[serde(default = "default_enrollment_points")]
    pub enrollment_points: f64,

    /// Enrollment at or above this count earns `enrollment_points`
    #[serde(default = "default_enrollment_threshold")]
    pub enrollment_threshold: u32,

    #[serde(default = "default_excellent_min")]
    pub excellent_min: f64,

    #[serde(default = "default_good_min")]
    pub good_min: f64,

    #[serde(default = "default_fair_min")]
    pub fair_min: f64,
}

fn default_randomized_points() -> f64 { 20.0 }
fn default_double_blind_points() -> f64 { 20.0 }
fn default_single_blind_points() -> f64 { 10.0 }
fn default_placebo_points() -> f64 { 15.0 }
fn default_comparator_points() -> f64 { 15.0 }
fn default_survival_endpoint_points() -> f64 { 15.0 }
fn default_surrogate_endpoint_points() -> f64 { 5.0 }
fn default_enrollment_points() -> f64 { 5.0 }
fn default_enrollment_threshold() -> u32 { 100 }
fn default_excellent_min() -> f64 { 80.0 }
fn default_good_min() -> f64 { 60.0 }
fn default_fair_min() -> f64 { 40.0 }

impl Default for TrialQualityConfig {
    fn default() -> Self {
        Self {
            randomized_points: default_randomized_points(),
            double_blind_points: default_double_blind_points(),
            single_blind_points: default_single_blind_points(),
            placebo_points: default_placebo_points(),
            active_comparator_points: default_comparator_points(),
            survival_endpoint_points: default_survival_endpoint_points(),
            surrogate_endpoint_points: default_surrogate_endpoint_points(),
            enrollment_points: default_enrollment_points(),
            enrollment_threshold: default_enrollment_threshold(),
            excellent_min: default_excellent_min(),
            good_min: default_good_min(),
            fair_min: default_fair_min(),
        }
    }
}

// ── Precedent ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentConfig {
    /// Transitions with fewer entering drugs are flagged low-confidence
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u32,
}

fn default_min_sample_size() -> u32 { 10 }

impl Default for PrecedentConfig {
    fn default() -> Self {
        Self { min_sample_size: default_min_sample_size() }
    }
}

// ── Competitive Landscape ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionConfig {
    /// Added when the subject is strictly the most advanced asset
    #[serde(default = "default_leader_bonus")]
    pub leader_bonus: f64,

    /// Subtracted per competitor at or beyond the subject's stage
    #[serde(default = "default_per_competitor_penalty")]
    pub per_competitor_penalty: f64,

    /// Signal is clamped to [-bound, +bound] percentage points
    #[serde(default = "default_competition_bound")]
    pub bound: f64,
}

fn default_leader_bonus() -> f64 { 5.0 }
fn default_per_competitor_penalty() -> f64 { 1.0 }
fn default_competition_bound() -> f64 { 5.0 }

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            leader_bonus: default_leader_bonus(),
            per_competitor_penalty: default_per_competitor_penalty(),
            bound: default_competition_bound(),
        }
    }
}

// ── Approval Probability ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityConfig {
    #[serde(default = "default_floor_pct")]
    pub floor_pct: f64,

    #[serde(default = "default_ceiling_pct")]
    pub ceiling_pct: f64,

    #[serde(default = "default_excellent_adjustment")]
    pub excellent_adjustment: f64,

    #[serde(default)]
    pub good_adjustment: f64,

    #[serde(default = "default_fair_adjustment")]
    pub fair_adjustment: f64,

    #[serde(default = "default_poor_adjustment")]
    pub poor_adjustment: f64,
}

fn default_floor_pct() -> f64 { 1.0 }
fn default_ceiling_pct() -> f64 { 95.0 }
fn default_excellent_adjustment() -> f64 { 10.0 }
fn default_fair_adjustment() -> f64 { -5.0 }
fn default_poor_adjustment() -> f64 { -10.0 }

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            floor_pct: default_floor_pct(),
            ceiling_pct: default_ceiling_pct(),
            excellent_adjustment: default_excellent_adjustment(),
            good_adjustment: 0.0,
            fair_adjustment: default_fair_adjustment(),
            poor_adjustment: default_poor_adjustment(),
        }
    }
}

// ── Patent Risk ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRiskConfig {
    /// Loss of protection sooner than this many calendar years → High
    #[serde(default = "default_high_below_years")]
    pub high_below_years: u32,

    /// Up to and including this many calendar years → Medium; later → Low
    #[serde(default = "default_medium_up_to_years")]
    pub medium_up_to_years: u32,
}

fn default_high_below_years() -> u32 { 2 }
fn default_medium_up_to_years() -> u32 { 5 }

impl Default for PatentRiskConfig {
    fn default() -> Self {
        Self {
            high_below_years: default_high_below_years(),
            medium_up_to_years: default_medium_up_to_years(),
        }
    }
}

// ── Composite Weights ─────────────────────────────────────────────────────────

/// Weights for the composite asset score. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    /// Biological rationale
    #[serde(default = "default_bio_weight")]
    pub bio: f64,
    /// Chemistry quality
    #[serde(default = "default_chem_weight")]
    pub chem: f64,
    /// Target tractability
    #[serde(default = "default_tractability_weight")]
    pub tractability: f64,
}

fn default_bio_weight() -> f64 { 0.5 }
fn default_chem_weight() -> f64 { 0.3 }
fn default_tractability_weight() -> f64 { 0.2 }

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            bio: default_bio_weight(),
            chem: default_chem_weight(),
            tractability: default_tractability_weight(),
        }
    }
}

impl CompositeWeights {
    /// Validate that weights are non-negative and sum to ~1.0
    pub fn validate(&self) -> bool {
        self.as_array().iter().all(|w| *w >= 0.0 && w.is_finite())
            && (self.as_array().iter().sum::<f64>() - 1.0).abs() < 1e-6
    }

    /// Renormalise weights so they sum to 1.0
    pub fn normalise(&mut self) {
        let sum: f64 = self.as_array().iter().sum();
        if sum > 0.0 {
            self.bio /= sum;
            self.chem /= sum;
            self.tractability /= sum;
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.bio, self.chem, self.tractability]
    }
}

// ── Helper Methods ─────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load from a file, picking the format by extension
    /// (`.yaml`/`.yml`, `.json` or `.toml`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            Some("json") => Self::from_json(path),
            Some("toml") => Self::from_toml(path),
            _ => Err(PharmyxError::config(format!(
                "unsupported engine config format: {}",
                path.display()
            ))),
        }
    }

    /// Load from YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from JSON file
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency of every section.
    pub fn validate(&self) -> Result<()> {
        let q = &self.trial_quality;
        if !(q.fair_min < q.good_min && q.good_min < q.excellent_min) {
            return Err(PharmyxError::config(format!(
                "quality breakpoints must increase: fair {} < good {} < excellent {}",
                q.fair_min, q.good_min, q.excellent_min
            )));
        }

        let c = &self.competition;
        if c.bound < 0.0 || c.per_competitor_penalty < 0.0 || c.leader_bonus < 0.0 {
            return Err(PharmyxError::config(
                "competition bound, bonus and penalty must be non-negative",
            ));
        }

        let p = &self.probability;
        if !(0.0 <= p.floor_pct && p.floor_pct < p.ceiling_pct && p.ceiling_pct <= 100.0) {
            return Err(PharmyxError::config(format!(
                "probability clamp must satisfy 0 <= floor ({}) < ceiling ({}) <= 100",
                p.floor_pct, p.ceiling_pct
            )));
        }

        let r = &self.patent_risk;
        if r.high_below_years > r.medium_up_to_years {
            return Err(PharmyxError::config(format!(
                "patent risk breakpoints must satisfy high ({}) <= medium ({})",
                r.high_below_years, r.medium_up_to_years
            )));
        }

        if !self.composite.validate() {
            return Err(PharmyxError::config(format!(
                "composite weights must be non-negative and sum to 1.0, got {:?}",
                self.composite.as_array()
            )));
        }

        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
