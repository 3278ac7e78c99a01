//! pharmyx-common — Record shapes, score output types, errors and engine
//! configuration shared across all Pharmyx crates.

pub mod error;
pub mod records;
pub mod score;
pub mod engine_config;

// Re-export commonly used types
pub use error::{PharmyxError, Result};
pub use engine_config::{
    CompetitionConfig, CompositeWeights, EngineConfig, PatentRiskConfig, PrecedentConfig,
    ProbabilityConfig, TrialQualityConfig,
};
pub use records::{
    indication_key, validate_drug, Blinding, DrugRecord, EndpointCategory, ExclusivityRecord,
    PatentRecord, PatentType, TrialPhase, TrialRecord, TrialStatus,
};
pub use score::{Confidence, ScoreFactor, ScoreResult};
