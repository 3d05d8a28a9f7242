use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::{JudgeId, OptionId, ProfileId};
use crate::report::{JudgeFailure, RejectedOption};

/// The terminal output of one evaluation.
///
/// `selected_option = None` is a normal outcome (no permissible option),
/// always accompanied by a rationale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub profile_id: ProfileId,
    pub selected_option: Option<OptionId>,
    pub forbidden_options: BTreeSet<OptionId>,
    /// Remaining candidates after the selection, in descending preference.
    pub ranked_alternatives: Vec<OptionId>,
    pub rationale: String,
    pub audit: DecisionAudit,
}

impl Decision {
    pub fn has_selection(&self) -> bool {
        self.selected_option.is_some()
    }

    pub fn is_forbidden(&self, option_id: &OptionId) -> bool {
        self.forbidden_options.contains(option_id)
    }

    /// Full preference order: selection first, then alternatives.
    pub fn ranking(&self) -> Vec<OptionId> {
        self.selected_option
            .iter()
            .chain(self.ranked_alternatives.iter())
            .cloned()
            .collect()
    }
}

/// Structured record of how a decision was reached.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionAudit {
    /// Raw judge scores for every option that was judged.
    pub per_judge_scores: BTreeMap<OptionId, BTreeMap<JudgeId, f64>>,
    /// Cumulative scores of the options that reached final ranking.
    pub aggregate_scores: BTreeMap<OptionId, f64>,
    /// Layer pass, in processing order.
    pub layers: Vec<LayerTrace>,
    pub veto_triggered: bool,
    pub vetoes: Vec<VetoRecord>,
    /// `hard_veto`, the name of the layer that made the final cut, or
    /// `cumulative_score`.
    pub deciding_layer: String,
    pub tie_broken: bool,
    /// Options tied with the selection (within epsilon), tie-break order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tied_options: Vec<OptionId>,
    /// Judge failures that were excluded from scoring or converted to
    /// conservative vetoes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed_failures: Vec<JudgeFailure>,
    /// (option, judge) pairs with neither a judgment nor a recorded failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_judgments: Vec<(OptionId, JudgeId)>,
    /// Options rejected at ingestion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected_options: Vec<RejectedOption>,
}

/// Scores and eliminations of one lexical layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerTrace {
    pub name: String,
    pub hard_stop: bool,
    pub scores: BTreeMap<OptionId, f64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub eliminated: BTreeSet<OptionId>,
}

/// One hard veto that fired.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VetoRecord {
    pub option_id: OptionId,
    pub judge_id: JudgeId,
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_puts_selection_first() {
        let decision = Decision {
            profile_id: "p".into(),
            selected_option: Some("c".into()),
            forbidden_options: BTreeSet::new(),
            ranked_alternatives: vec!["a".into(), "b".into()],
            rationale: String::new(),
            audit: DecisionAudit::default(),
        };
        assert!(decision.has_selection());
        assert_eq!(
            decision.ranking(),
            vec![OptionId::from("c"), "a".into(), "b".into()]
        );
    }

    #[test]
    fn empty_audit_lists_are_omitted_on_the_wire() {
        let json = serde_json::to_string(&DecisionAudit::default()).unwrap();
        assert!(!json.contains("suppressed_failures"));
        assert!(!json.contains("tied_options"));
        assert!(json.contains("veto_triggered"));
    }
}
