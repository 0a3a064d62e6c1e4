// Scan results and scoring policy
pub mod policy;
pub mod types;

pub use policy::ScoringPolicy;
pub use types::{
    Exclusion, FUNDAMENTAL_SENTINEL, FundamentalSnapshot, FundamentalSource, Recommendation,
    ScanReport, ScoreResult, TechnicalLabel,
};
