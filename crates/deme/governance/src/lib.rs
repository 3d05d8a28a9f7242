//! # deme-governance
//!
//! Governance profiles and the aggregator that turns a judgment matrix
//! into one auditable [`Decision`](deme_types::Decision).
//!
//! ## Profiles
//!
//! A [`GovernanceProfile`] is a stakeholder group's aggregation policy:
//! ordered lexical layers of judges, per-judge weights, an acceptance
//! floor for hard-stop layers, a tie-break rule, extra veto predicates and
//! a failure policy. Profiles are loaded from TOML or YAML documents
//! ([`ProfileDocument`]) or taken from the [`canonical`] set, validated
//! once, and held read-only in a [`ProfileStore`].
//!
//! ## Aggregation
//!
//! 1. Hard-veto pass: any vetoed option is forbidden.
//! 2. Lexical layers in override-mode order; hard-stop layers may cut
//!    options scoring at or below the floor.
//! 3. Final ranking by cumulative score, ties resolved by the profile's
//!    tie-break.

pub mod aggregator;
pub mod canonical;
pub mod document;
pub mod error;
pub mod profile;
pub mod store;

pub use aggregator::{Aggregator, CUMULATIVE_SCORE, HARD_VETO};
pub use document::{LayerDocument, ProfileDocument};
pub use error::{AggregationError, ProfileConfigError};
pub use profile::{
    FailurePolicy, GovernanceProfile, LayerFocus, LexicalLayer, OverrideMode, ProfileSummary,
    TieBreak, DEFAULT_ACCEPTANCE_FLOOR, DEFAULT_JUDGE_WEIGHT,
};
pub use store::ProfileStore;
