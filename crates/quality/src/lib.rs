//! Evaluation quality control.
//!
//! Decides whether individual evaluations can be trusted: attention checks,
//! evaluator consistency, and the trust policy combining them.

#![warn(missing_docs)]

pub mod config;
pub mod stats;
pub mod snapshot;
pub mod attention;
pub mod consistency;
pub mod flags;

pub use config::{QualityConfig, SpeedPolicy};
pub use snapshot::{latest_per_pair, Snapshot};
pub use attention::{AttentionResult, AttentionValidator};
pub use consistency::{
    AgreementReport, ConsistencyAnalyzer, EvaluatorReport, EvaluatorScope, PatternReport,
};
pub use flags::{Classification, QualityFlagAggregator, TrustDecision};
