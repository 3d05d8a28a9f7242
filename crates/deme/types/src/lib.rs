//! # deme-types
//!
//! Shared vocabulary for the DEME judgment-aggregation engine.
//!
//! ## Data Model
//!
//! - **FactRecord**: immutable, validated description of one candidate
//!   option. Closed, versioned schema: unknown fields are rejected at the
//!   boundary and every scalar is bounded in `[0, 1]`.
//! - **Judgment**: one judge's verdict, score and optional hard veto for
//!   one option. The verdict is always the threshold bucket of the score.
//! - **Decision**: the aggregator's output: selection, forbidden set,
//!   ranking, and a structured audit trail returned as a value.
//! - **ContentHash**: BLAKE3 identity of a FactRecord's content, independent
//!   of its label and position. Used to canonicalize decisions.
//!
//! ## Invariants
//!
//! - A judgment with `hard_veto = true` has verdict `Forbid` and score `0.0`.
//! - Identical inputs serialize to byte-identical decisions: every map in
//!   the decision is ordered.

pub mod decision;
pub mod error;
pub mod fact;
pub mod hash;
pub mod ids;
pub mod judgment;
pub mod report;

pub use decision::{Decision, DecisionAudit, LayerTrace, VetoRecord};
pub use error::{EvaluationError, FactRecordError, JudgmentError};
pub use fact::{
    AutonomyAndAgency, Consequences, EpistemicStatus, EvidenceQuality, FactRecord, FieldValue,
    JusticeAndFairness, PrivacyAndData, ProceduralLegitimacy, RightsAndDuties,
    SocietalAndEnvironmental, VirtueAndCare, FACT_SCHEMA_VERSION,
};
pub use hash::{ContentHash, ContentHashError};
pub use ids::{JudgeId, OptionId, ProfileId};
pub use judgment::{Judgment, Verdict, SCORE_EPSILON};
pub use report::{EvaluationReport, JudgeFailure, OptionInput, RejectedOption};
