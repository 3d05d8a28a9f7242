use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{JudgeId, OptionId};

/// A FactRecord that cannot be admitted. Raised at ingestion; a rejected
/// record never reaches a judge.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactRecordError {
    #[error("option_id must not be empty")]
    EmptyOptionId,

    #[error("field {field} out of range: {value} not in [0, 1]")]
    OutOfRange { field: String, value: f64 },

    #[error("unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("malformed fact record: {0}")]
    Malformed(String),
}

/// A judge could not produce a judgment for one option.
///
/// Isolated to the (option, judge) pair; other evaluations continue.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationError {
    #[error("judge {judge_id} received a malformed fact record for {option_id}: {reason}")]
    MalformedFact {
        judge_id: JudgeId,
        option_id: OptionId,
        reason: String,
    },

    #[error("judge {judge_id} crashed on {option_id}: {reason}")]
    Crashed {
        judge_id: JudgeId,
        option_id: OptionId,
        reason: String,
    },

    #[error("judge {judge_id} timed out on {option_id} after {timeout_ms}ms")]
    TimedOut {
        judge_id: JudgeId,
        option_id: OptionId,
        timeout_ms: u64,
    },

    #[error("judge {judge_id} is not registered")]
    UnknownJudge { judge_id: JudgeId },
}

impl EvaluationError {
    pub fn judge_id(&self) -> &JudgeId {
        match self {
            EvaluationError::MalformedFact { judge_id, .. }
            | EvaluationError::Crashed { judge_id, .. }
            | EvaluationError::TimedOut { judge_id, .. }
            | EvaluationError::UnknownJudge { judge_id } => judge_id,
        }
    }
}

/// A judgment received over the wire violates the judgment contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JudgmentError {
    #[error("judgment {judge_id}/{option_id}: score {score} not in [0, 1]")]
    ScoreOutOfRange {
        option_id: OptionId,
        judge_id: JudgeId,
        score: f64,
    },

    #[error("judgment {judge_id}/{option_id}: verdict {verdict} inconsistent with score {score}")]
    VerdictMismatch {
        option_id: OptionId,
        judge_id: JudgeId,
        verdict: String,
        score: f64,
    },

    #[error("judgment {judge_id}/{option_id}: hard veto requires forbid/0.0")]
    VetoNotForbidding { option_id: OptionId, judge_id: JudgeId },
}
