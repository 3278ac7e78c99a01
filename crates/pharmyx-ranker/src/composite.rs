//! Composite asset score.
//!
//! TotalScore = w_bio·Bio + w_chem·Chem + w_tract·Tract, computed only when
//! all three sub-scores are present. A missing sub-score makes the total
//! undefined; it is never treated as zero.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use pharmyx_common::engine_config::CompositeWeights;
use pharmyx_common::error::{PharmyxError, Result};

/// Sub-scores supplied by upstream analysis, each on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositeInputs {
    #[serde(default)]
    pub bio: Option<f64>,
    #[serde(default)]
    pub chem: Option<f64>,
    #[serde(default)]
    pub tractability: Option<f64>,
}

impl CompositeInputs {
    pub fn new(bio: Option<f64>, chem: Option<f64>, tractability: Option<f64>) -> Self {
        Self { bio, chem, tractability }
    }

    /// Reject non-finite or out-of-range sub-scores. Absent values pass.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("bio", self.bio),
            ("chem", self.chem),
            ("tractability", self.tractability),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                    return Err(PharmyxError::OutOfRange { field, value: v, min: 0.0, max: 100.0 });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub bio: Option<f64>,
    pub chem: Option<f64>,
    pub tractability: Option<f64>,
    /// None when any sub-score is missing.
    pub total: Option<f64>,
}

/// Weighted total. Validates both the inputs and the weights, which bounds
/// the total to [0, 100] without a clamp.
pub fn score_composite(inputs: &CompositeInputs, weights: &CompositeWeights) -> Result<CompositeScore> {
    inputs.validate()?;
    if !weights.validate() {
        return Err(PharmyxError::config(format!(
            "composite weights must be non-negative and sum to 1.0, got {:?}",
            weights.as_array()
        )));
    }

    let total = match (inputs.bio, inputs.chem, inputs.tractability) {
        (Some(bio), Some(chem), Some(tract)) => {
            let components = [bio, chem, tract];
            let weighted: f64 = components
                .iter()
                .zip(weights.as_array().iter())
                .map(|(s, w)| s * w)
                .sum();
            Some(weighted)
        }
        _ => {
            debug!(inputs = ?inputs, "Composite total undefined: missing sub-score");
            None
        }
    };

    Ok(CompositeScore {
        bio: inputs.bio,
        chem: inputs.chem,
        tractability: inputs.tractability,
        total,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAsset {
    pub asset_id: String,
    pub score: CompositeScore,
    /// 1-based rank among defined totals; None for undefined totals.
    pub rank: Option<usize>,
}

/// Order assets by total descending. Undefined totals go last, in input
/// order, and receive no rank.
pub fn rank_assets(scored: Vec<(String, CompositeScore)>) -> Vec<RankedAsset> {
    let mut scored = scored;
    scored.sort_by(|(_, a), (_, b)| match (a.total, b.total) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut next_rank = 0;
    scored
        .into_iter()
        .map(|(asset_id, score)| {
            let rank = score.total.map(|_| {
                next_rank += 1;
                next_rank
            });
            RankedAsset { asset_id, score, rank }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(bio: f64, chem: f64, tract: f64) -> CompositeInputs {
        CompositeInputs::new(Some(bio), Some(chem), Some(tract))
    }

    #[test]
    fn test_default_weights_example() {
        let s = score_composite(&all(80.0, 60.0, 100.0), &CompositeWeights::default()).unwrap();
        let total = s.total.unwrap();
        assert!((total - 78.0).abs() < 1e-9, "got {total}");
    }

    #[test]
    fn test_missing_chem_is_undefined_not_zero() {
        let inputs = CompositeInputs::new(Some(80.0), None, Some(100.0));
        let s = score_composite(&inputs, &CompositeWeights::default()).unwrap();
        assert_eq!(s.total, None);
        assert_eq!(s.bio, Some(80.0));
    }

    #[test]
    fn test_total_stays_in_range() {
        let w = CompositeWeights::default();
        for v in [0.0, 50.0, 100.0] {
            let t = score_composite(&all(v, v, v), &w).unwrap().total.unwrap();
            assert!((t - v).abs() < 1e-9, "got {t} for {v}");
        }
    }

    #[test]
    fn test_extreme_weights_stay_within_inputs() {
        let w = CompositeWeights { bio: 1.0, chem: 0.0, tractability: 0.0 };
        let t = score_composite(&all(100.0, 0.0, 0.0), &w).unwrap().total.unwrap();
        assert_eq!(t, 100.0);
        let t = score_composite(&all(0.0, 100.0, 100.0), &w).unwrap().total.unwrap();
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let w = CompositeWeights::default();
        assert!(matches!(
            score_composite(&all(101.0, 50.0, 50.0), &w),
            Err(PharmyxError::OutOfRange { field: "bio", .. })
        ));
        assert!(matches!(
            score_composite(&all(50.0, f64::NAN, 50.0), &w),
            Err(PharmyxError::OutOfRange { field: "chem", .. })
        ));
        assert!(score_composite(&all(50.0, 50.0, -0.1), &w).is_err());
    }

    #[test]
    fn test_bad_weights_rejected_until_normalised() {
        let mut w = CompositeWeights { bio: 5.0, chem: 3.0, tractability: 2.0 };
        assert!(matches!(score_composite(&all(80.0, 60.0, 100.0), &w), Err(PharmyxError::Config(_))));
        w.normalise();
        let total = score_composite(&all(80.0, 60.0, 100.0), &w).unwrap().total.unwrap();
        assert!((total - 78.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_puts_undefined_last() {
        let w = CompositeWeights::default();
        let undefined = score_composite(&CompositeInputs::new(Some(99.0), None, None), &w).unwrap();
        let low = score_composite(&all(10.0, 10.0, 10.0), &w).unwrap();
        let high = score_composite(&all(90.0, 90.0, 90.0), &w).unwrap();

        let ranked = rank_assets(vec![
            ("undefined".into(), undefined),
            ("low".into(), low),
            ("high".into(), high),
        ]);
        let order: Vec<_> = ranked.iter().map(|r| (r.asset_id.as_str(), r.rank)).collect();
        assert_eq!(order, vec![("high", Some(1)), ("low", Some(2)), ("undefined", None)]);
    }

    #[test]
    fn test_composite_is_idempotent() {
        let w = CompositeWeights::default();
        let i = all(33.0, 66.0, 99.0);
        assert_eq!(score_composite(&i, &w).unwrap(), score_composite(&i, &w).unwrap());
    }
}
