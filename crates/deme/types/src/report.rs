use serde::{Deserialize, Serialize};

use crate::error::{EvaluationError, FactRecordError};
use crate::fact::FactRecord;
use crate::ids::{JudgeId, OptionId};
use crate::judgment::Judgment;

/// One option submitted for evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionInput {
    pub option_id: OptionId,
    pub fact_record: FactRecord,
}

impl OptionInput {
    pub fn new(fact_record: FactRecord) -> Self {
        Self {
            option_id: fact_record.option_id.clone(),
            fact_record,
        }
    }
}

/// A judge that failed on one option.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JudgeFailure {
    pub option_id: OptionId,
    pub judge_id: JudgeId,
    pub error: EvaluationError,
}

/// An option refused at ingestion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectedOption {
    pub option_id: OptionId,
    pub error: FactRecordError,
}

/// Everything the judge stage produced for one request: the judgment
/// matrix plus the failures that must surface in the audit trail.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub judgments: Vec<Judgment>,
    #[serde(default)]
    pub failures: Vec<JudgeFailure>,
    #[serde(default)]
    pub rejected: Vec<RejectedOption>,
}

impl EvaluationReport {
    pub fn from_judgments(judgments: Vec<Judgment>) -> Self {
        Self {
            judgments,
            ..Self::default()
        }
    }

    pub fn judgments_for<'a>(
        &'a self,
        option_id: &'a OptionId,
    ) -> impl Iterator<Item = &'a Judgment> + 'a {
        self.judgments
            .iter()
            .filter(move |j| &j.option_id == option_id)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty()
    }
}
