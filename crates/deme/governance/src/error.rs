use deme_types::{JudgeId, JudgmentError, OptionId, ProfileId};
use thiserror::Error;

/// A governance profile that cannot be used. Profiles are validated once
/// at load; a request naming an unknown or malformed profile is aborted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileConfigError {
    #[error("unknown profile: {0}")]
    UnknownProfile(ProfileId),

    #[error("duplicate profile: {0}")]
    DuplicateProfile(ProfileId),

    #[error("profile_id must not be empty")]
    EmptyProfileId,

    #[error("profile {0} declares no lexical layers")]
    NoLayers(ProfileId),

    #[error("layer {layer} references unknown judge {judge_id}")]
    UnknownJudge { layer: String, judge_id: JudgeId },

    #[error("weight for unknown judge {0}")]
    WeightForUnknownJudge(JudgeId),

    #[error("negative weight {weight} for judge {judge_id}")]
    NegativeWeight { judge_id: JudgeId, weight: f64 },

    #[error("non-finite weight for judge {0}")]
    NonFiniteWeight(JudgeId),

    #[error("layer {layer} has invalid weight {weight}")]
    InvalidLayerWeight { layer: String, weight: f64 },

    #[error("duplicate layer name: {0}")]
    DuplicateLayer(String),

    #[error("layer {0} has no members")]
    EmptyLayer(String),

    #[error("layer {layer} includes unknown layer {include}")]
    UnknownInclude { layer: String, include: String },

    #[error("cyclic layer include: {}", .0.join(" -> "))]
    CyclicInclude(Vec<String>),

    #[error("acceptance floor {0} not in [0, 1]")]
    FloorOutOfRange(f64),

    #[error("unknown veto predicate: {0}")]
    UnknownVetoPredicate(String),

    #[error("failed to parse profile document: {0}")]
    Parse(String),

    #[error("failed to read profile document {path}: {message}")]
    Io { path: String, message: String },
}

/// Aggregation input that violates the aggregator's contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error(transparent)]
    Profile(#[from] ProfileConfigError),

    #[error(transparent)]
    InvalidJudgment(#[from] JudgmentError),

    #[error("duplicate judgment from {judge_id} for {option_id}")]
    DuplicateJudgment { option_id: OptionId, judge_id: JudgeId },

    #[error("judgment from {judge_id} references unknown option {option_id}")]
    UnknownOption { option_id: OptionId, judge_id: JudgeId },

    #[error("option {0} listed more than once")]
    DuplicateOption(OptionId),
}
