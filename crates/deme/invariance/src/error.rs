use deme_governance::AggregationError;
use deme_types::{ContentHash, FactRecordError, OptionId};
use thiserror::Error;

/// A check that could not be carried out. A violated invariant is not an
/// error; it is reported as a terminal [`CheckState`](crate::CheckState).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvarianceError {
    #[error("options {first} and {second} have identical content ({hash})")]
    DuplicateContent {
        first: OptionId,
        second: OptionId,
        hash: ContentHash,
    },

    #[error("option {0} listed more than once")]
    DuplicateOption(OptionId),

    #[error("transform {transform} references unknown option {option_id}")]
    UnknownOption { transform: String, option_id: OptionId },

    #[error("transform {transform}: {reason}")]
    InvalidTransform { transform: String, reason: String },

    #[error("fact edit in {transform} failed: {source}")]
    FactEdit {
        transform: String,
        #[source]
        source: FactRecordError,
    },

    #[error("decision references option {0} that was not evaluated")]
    UnmappedOption(OptionId),

    #[error("invalid check transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("unknown transform: {0}")]
    UnknownTransform(String),

    #[error("failed to parse transform catalog: {0}")]
    Parse(String),

    #[error(transparent)]
    Pipeline(#[from] AggregationError),
}
