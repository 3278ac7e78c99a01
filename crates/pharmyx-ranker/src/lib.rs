//! pharmyx-ranker — Asset scoring and regulatory classification engine.
//!
//! Per-asset scorers are pure functions over immutable records. The
//! precedent table they consult is built in batch and published as a
//! versioned snapshot.

pub mod trial_quality;
pub mod stage;
pub mod approval_status;
pub mod precedent;
pub mod competition;
pub mod probability;
pub mod patent_risk;
pub mod composite;
pub mod snapshot;
pub mod portfolio;

pub use approval_status::{classify, ApprovalClassification, ApprovalStatus, ClassificationRule};
pub use competition::{analyze_competition, CompetitivePosition, CompetitiveSignal};
pub use composite::{rank_assets, score_composite, CompositeInputs, CompositeScore, RankedAsset};
pub use patent_risk::{assess_patent_risk, PatentRiskReport, RiskTier};
pub use portfolio::{score_portfolio, AssetEntry, AssetReport, PortfolioSnapshot};
pub use precedent::{aggregate_precedents, IndicationPrecedent, PrecedentSource, TransitionRate};
pub use probability::{approval_probability, ApprovalProbability, ProbabilityInputs};
pub use snapshot::{JobOutcome, PrecedentJob, PrecedentSnapshot, PrecedentStore};
pub use trial_quality::{score_trial, QualityCategory, TrialQuality};
