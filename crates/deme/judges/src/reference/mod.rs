//! Reference judges.
//!
//! Each judge is a free function with the [`JudgeFn`](crate::JudgeFn)
//! signature; they share the validation and scoring helpers instead of a
//! base type.

pub mod consequences;
pub mod fairness;
pub mod rights;
pub mod universal_floor;

use deme_types::{EvaluationError, FactRecord, JudgeId};

/// Reject records that bypassed ingestion validation.
pub(crate) fn require_valid(judge_id: &JudgeId, fact: &FactRecord) -> Result<(), EvaluationError> {
    fact.validate()
        .map_err(|e| EvaluationError::MalformedFact {
            judge_id: judge_id.clone(),
            option_id: fact.option_id.clone(),
            reason: e.to_string(),
        })
}
