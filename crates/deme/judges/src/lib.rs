//! # deme-judges
//!
//! Judges turn one FactRecord into one Judgment. They are total,
//! deterministic and side-effect free: a judge reads only the record it is
//! given and the read-only [`JudgeContext`] of the request, never another
//! option's record, global state or the clock.
//!
//! Judges are organised as a capability table rather than a type
//! hierarchy: [`JudgeRegistry`] maps `judge_id → JudgeImpl`, where an entry
//! is either a built-in [`JudgeKind`] or a plain function pointer. Shared
//! behaviour lives in [`scoring`] helpers.
//!
//! ## Reference judges
//!
//! - `universal_floor`: hard vetoes, then accumulate-once penalties
//! - `consequences`: net benefit, urgency, scale, societal effects
//! - `rights_and_duties`: consent, rules, autonomy, procedure
//! - `fairness`: discrimination, vulnerability, burden distribution

pub mod ingest;
pub mod reference;
pub mod registry;
pub mod scoring;
pub mod veto;

pub use ingest::admit;
pub use registry::{JudgeContext, JudgeFn, JudgeImpl, JudgeKind, JudgeRegistry, RegistryError};
pub use scoring::{clamp_unit, epistemic_multiplier, verdict_for_score, ScoreTerms};
pub use veto::{UnknownVetoPredicate, VetoPredicate};
