//! The output shape shared by every scorer.
//!
//! A `ScoreResult` carries a value (absent when the score is undefined),
//! a scorer-specific category label, a confidence label and the list of
//! factors that produced it, so callers can render "why this score"
//! without re-deriving anything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence label attached to every score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Degrade from High by the number of inputs that are missing or
    /// flagged low-confidence: none → High, one → Medium, more → Low.
    pub fn from_gaps(gaps: usize) -> Self {
        match gaps {
            0 => Confidence::High,
            1 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High   => "high",
            Confidence::Medium => "medium",
            Confidence::Low    => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contributing rule or adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    /// Signed contribution in the score's own unit (points or pp).
    pub points: f64,
    pub note: String,
}

impl ScoreFactor {
    pub fn new(name: impl Into<String>, points: f64, note: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points,
            note: note.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult<C> {
    pub value: Option<f64>,
    pub category: C,
    pub confidence: Confidence,
    pub factors: Vec<ScoreFactor>,
}

impl<C> ScoreResult<C> {
    pub fn new(value: Option<f64>, category: C, confidence: Confidence) -> Self {
        Self {
            value,
            category,
            confidence,
            factors: Vec::new(),
        }
    }

    pub fn with_factor(mut self, factor: ScoreFactor) -> Self {
        self.factors.push(factor);
        self
    }

    pub fn push_factor(&mut self, name: impl Into<String>, points: f64, note: impl Into<String>) {
        self.factors.push(ScoreFactor::new(name, points, note));
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    pub fn factor(&self, name: &str) -> Option<&ScoreFactor> {
        self.factors.iter().find(|f| f.name == name)
    }
}

/// Clamp `value` into `[min, max]`, returning whether clamping changed it.
pub fn clamp_with_flag(value: f64, min: f64, max: f64) -> (f64, bool) {
    let clamped = value.clamp(min, max);
    (clamped, (clamped - value).abs() > f64::EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_gaps() {
        assert_eq!(Confidence::from_gaps(0), Confidence::High);
        assert_eq!(Confidence::from_gaps(1), Confidence::Medium);
        assert_eq!(Confidence::from_gaps(2), Confidence::Low);
        assert_eq!(Confidence::from_gaps(3), Confidence::Low);
    }

    #[test]
    fn test_confidence_orders_low_to_high() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    #[test]
    fn test_clamp_flag() {
        assert_eq!(clamp_with_flag(120.0, 0.0, 100.0), (100.0, true));
        assert_eq!(clamp_with_flag(42.0, 0.0, 100.0), (42.0, false));
        assert_eq!(clamp_with_flag(-3.0, 1.0, 95.0), (1.0, true));
    }

    #[test]
    fn test_factor_lookup() {
        let r = ScoreResult::new(Some(20.0), "x", Confidence::High)
            .with_factor(ScoreFactor::new("randomized", 20.0, "randomised allocation"));
        assert!(r.is_defined());
        assert_eq!(r.factor("randomized").map(|f| f.points), Some(20.0));
        assert!(r.factor("blinding").is_none());
    }
}
