//! # deme-invariance
//!
//! Checks that decisions are stable under representation changes and
//! sensitive to substantive ones.
//!
//! A [`Transform`] rewrites an option set: reordering and relabeling are
//! *bond-preserving* and must leave the decision unchanged; fact edits are
//! *bond-changing* and may move it, provided every move can be attributed
//! to a changed field. Both decisions are compared in canonical form, with
//! option labels replaced by content hashes.
//!
//! A check walks `Pending → EvaluatedBoth → Canonicalized → Pass | Fail |
//! Changed`; every transition is kept in the report's history.

pub mod canonical;
pub mod catalog;
pub mod checker;
pub mod error;
pub mod transform;
pub mod witness;

pub use canonical::{CanonicalDecision, Standing};
pub use catalog::{TransformCatalog, STANDARD_RELABEL_PREFIX};
pub use checker::{
    CheckRun, CheckState, InvarianceChecker, InvarianceReport, InvarianceViolation, StateChange,
};
pub use error::InvarianceError;
pub use transform::{AppliedTransform, FactEdit, Transform, TransformKind, TransformOp};
pub use witness::{attribute, find_witness, Attribution, FieldChange, OptionRef, Witness};
