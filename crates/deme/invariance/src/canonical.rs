//! Label-free view of a decision.
//!
//! Every option label in a [`Decision`] is replaced by a content hash, so
//! two decisions over the same contents compare equal regardless of how
//! the options were named or ordered.

use std::collections::{BTreeMap, BTreeSet};

use deme_types::{ContentHash, Decision, JudgeId, OptionId};
use serde::{Deserialize, Serialize};

use crate::error::InvarianceError;

/// Where an option ended up in a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Selected,
    Alternative,
    Forbidden,
    /// Cut by a hard-stop layer, rejected, or otherwise not ranked.
    Excluded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDecision {
    pub selected: Option<ContentHash>,
    pub forbidden: BTreeSet<ContentHash>,
    /// Selection first, then alternatives.
    pub ranking: Vec<ContentHash>,
    pub per_judge_scores: BTreeMap<ContentHash, BTreeMap<JudgeId, f64>>,
    pub aggregate_scores: BTreeMap<ContentHash, f64>,
    /// Content hash → label in the decision this was built from. Not part
    /// of the digest.
    #[serde(skip)]
    pub labels: BTreeMap<ContentHash, OptionId>,
}

/// Canonical form of the label-bearing parts, used for the digest.
#[derive(Serialize)]
struct DigestView<'a> {
    selected: &'a Option<ContentHash>,
    forbidden: &'a BTreeSet<ContentHash>,
    ranking: &'a [ContentHash],
    per_judge_scores: &'a BTreeMap<ContentHash, BTreeMap<JudgeId, f64>>,
    aggregate_scores: &'a BTreeMap<ContentHash, f64>,
}

impl CanonicalDecision {
    /// Replace labels by identities. `identity` maps every label the
    /// decision can mention to its content hash.
    pub fn from_decision(
        decision: &Decision,
        identity: &BTreeMap<OptionId, ContentHash>,
    ) -> Result<Self, InvarianceError> {
        let key = |id: &OptionId| -> Result<ContentHash, InvarianceError> {
            identity
                .get(id)
                .copied()
                .ok_or_else(|| InvarianceError::UnmappedOption(id.clone()))
        };

        let ranking = decision
            .ranking()
            .iter()
            .map(|id| key(id))
            .collect::<Result<Vec<_>, _>>()?;
        let forbidden = decision
            .forbidden_options
            .iter()
            .map(|id| key(id))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let per_judge_scores = decision
            .audit
            .per_judge_scores
            .iter()
            .map(|(id, scores)| Ok((key(id)?, scores.clone())))
            .collect::<Result<BTreeMap<_, _>, InvarianceError>>()?;
        let aggregate_scores = decision
            .audit
            .aggregate_scores
            .iter()
            .map(|(id, score)| Ok((key(id)?, *score)))
            .collect::<Result<BTreeMap<_, _>, InvarianceError>>()?;
        let selected = decision.selected_option.as_ref().map(key).transpose()?;

        Ok(Self {
            selected,
            forbidden,
            ranking,
            per_judge_scores,
            aggregate_scores,
            labels: identity.iter().map(|(id, h)| (*h, id.clone())).collect(),
        })
    }

    /// BLAKE3 digest of the canonical decision.
    pub fn digest(&self) -> ContentHash {
        let view = DigestView {
            selected: &self.selected,
            forbidden: &self.forbidden,
            ranking: &self.ranking,
            per_judge_scores: &self.per_judge_scores,
            aggregate_scores: &self.aggregate_scores,
        };
        // Hash keys serialize as strings, so this cannot fail.
        let bytes = serde_json::to_vec(&view).expect("canonical decision serializable");
        ContentHash::hash(&bytes)
    }

    pub fn standing(&self, hash: &ContentHash) -> Standing {
        if self.selected.as_ref() == Some(hash) {
            Standing::Selected
        } else if self.forbidden.contains(hash) {
            Standing::Forbidden
        } else if self.ranking.contains(hash) {
            Standing::Alternative
        } else {
            Standing::Excluded
        }
    }

    pub fn position(&self, hash: &ContentHash) -> Option<usize> {
        self.ranking.iter().position(|h| h == hash)
    }

    pub fn label(&self, hash: &ContentHash) -> Option<&OptionId> {
        self.labels.get(hash)
    }
}
