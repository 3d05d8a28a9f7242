use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use deme_judges::{JudgeContext, VetoPredicate};
use deme_types::{JudgeId, OptionId, ProfileId};
use serde::{Deserialize, Serialize};

use crate::error::ProfileConfigError;

/// Default acceptance floor for hard-stop layers.
pub const DEFAULT_ACCEPTANCE_FLOOR: f64 = 0.4;

/// Weight assumed for a judge the profile does not weight explicitly.
pub const DEFAULT_JUDGE_WEIGHT: f64 = 1.0;

/// How layers are ordered before processing. Never changes arithmetic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMode {
    RightsFirst,
    ConsequencesFirst,
    #[default]
    Balanced,
}

impl OverrideMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideMode::RightsFirst => "rights_first",
            OverrideMode::ConsequencesFirst => "consequences_first",
            OverrideMode::Balanced => "balanced",
        }
    }
}

impl fmt::Display for OverrideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a layer is about; the override mode sorts on this.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerFocus {
    Rights,
    Consequences,
    #[default]
    General,
}

impl LayerFocus {
    fn rank(&self, mode: OverrideMode) -> u8 {
        match (mode, self) {
            (OverrideMode::Balanced, _) => 0,
            (OverrideMode::RightsFirst, LayerFocus::Rights) => 0,
            (OverrideMode::RightsFirst, LayerFocus::General) => 1,
            (OverrideMode::RightsFirst, LayerFocus::Consequences) => 2,
            (OverrideMode::ConsequencesFirst, LayerFocus::Consequences) => 0,
            (OverrideMode::ConsequencesFirst, LayerFocus::General) => 1,
            (OverrideMode::ConsequencesFirst, LayerFocus::Rights) => 2,
        }
    }
}

/// Deterministic total order over option ids, used only among options
/// whose cumulative scores are equal within epsilon.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    Lexicographic,
    ReverseLexicographic,
    /// Listed ids first, in list order; everything else lexicographically.
    Priority(Vec<OptionId>),
}

impl TieBreak {
    /// `Less` means `a` is preferred.
    pub fn compare(&self, a: &OptionId, b: &OptionId) -> Ordering {
        match self {
            TieBreak::Lexicographic => a.cmp(b),
            TieBreak::ReverseLexicographic => b.cmp(a),
            TieBreak::Priority(order) => {
                let rank = |id: &OptionId| order.iter().position(|o| o == id).unwrap_or(order.len());
                rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
            }
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TieBreak::Lexicographic => "lexicographic",
            TieBreak::ReverseLexicographic => "reverse_lexicographic",
            TieBreak::Priority(_) => "priority",
        }
    }
}

/// What to do with a judge that crashed or timed out on an option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Drop the vote; weights renormalize over judges that ran.
    #[default]
    ExcludeVote,
    /// Treat the failure as a hard veto of the option.
    ConservativeVeto,
}

/// One priority tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LexicalLayer {
    pub name: String,
    pub hard_stop: bool,
    #[serde(default)]
    pub focus: LayerFocus,
    /// Contribution of this layer to the cumulative score.
    #[serde(default = "default_layer_weight")]
    pub weight: f64,
    pub members: Vec<JudgeId>,
}

fn default_layer_weight() -> f64 {
    1.0
}

impl LexicalLayer {
    pub fn new(name: impl Into<String>, hard_stop: bool, members: &[&str]) -> Self {
        Self {
            name: name.into(),
            hard_stop,
            focus: LayerFocus::General,
            weight: 1.0,
            members: members.iter().map(|m| JudgeId::from(*m)).collect(),
        }
    }

    pub fn with_focus(mut self, focus: LayerFocus) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// A validated aggregation policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernanceProfile {
    pub profile_id: ProfileId,
    pub stakeholder_label: String,
    pub domain: String,
    pub override_mode: OverrideMode,
    /// Declared order; see [`GovernanceProfile::ordered_layers`].
    pub layers: Vec<LexicalLayer>,
    pub weights: BTreeMap<JudgeId, f64>,
    pub acceptance_floor: f64,
    pub tie_break: TieBreak,
    pub hard_vetoes: BTreeSet<VetoPredicate>,
    pub failure_policy: FailurePolicy,
}

/// Entry returned by `list_profiles`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub profile_id: ProfileId,
    pub stakeholder_label: String,
    pub domain: String,
    pub override_mode: OverrideMode,
}

impl GovernanceProfile {
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            profile_id: self.profile_id.clone(),
            stakeholder_label: self.stakeholder_label.clone(),
            domain: self.domain.clone(),
            override_mode: self.override_mode,
        }
    }

    /// Effective weight of a judge.
    pub fn weight_of(&self, judge_id: &JudgeId) -> f64 {
        self.weights
            .get(judge_id)
            .copied()
            .unwrap_or(DEFAULT_JUDGE_WEIGHT)
    }

    /// Layers in processing order: a stable sort of the declared order by
    /// the override mode's focus ranking.
    pub fn ordered_layers(&self) -> Vec<&LexicalLayer> {
        let mut layers: Vec<&LexicalLayer> = self.layers.iter().collect();
        layers.sort_by_key(|layer| layer.focus.rank(self.override_mode));
        layers
    }

    /// Every judge referenced by some layer.
    pub fn member_judges(&self) -> BTreeSet<JudgeId> {
        self.layers
            .iter()
            .flat_map(|l| l.members.iter().cloned())
            .collect()
    }

    /// Judge context carrying this profile's extra veto predicates.
    pub fn judge_context(&self) -> JudgeContext {
        JudgeContext::with_vetoes(self.hard_vetoes.iter().copied())
    }

    /// Weight checks that the aggregator repeats on every call.
    pub fn check_weights(&self) -> Result<(), ProfileConfigError> {
        for (judge_id, weight) in &self.weights {
            if !weight.is_finite() {
                return Err(ProfileConfigError::NonFiniteWeight(judge_id.clone()));
            }
            if *weight < 0.0 {
                return Err(ProfileConfigError::NegativeWeight {
                    judge_id: judge_id.clone(),
                    weight: *weight,
                });
            }
        }
        for layer in &self.layers {
            if !layer.weight.is_finite() || layer.weight < 0.0 {
                return Err(ProfileConfigError::InvalidLayerWeight {
                    layer: layer.name.clone(),
                    weight: layer.weight,
                });
            }
        }
        Ok(())
    }

    /// Full validation against the set of registered judges.
    pub fn validate(&self, known_judges: &BTreeSet<JudgeId>) -> Result<(), ProfileConfigError> {
        if self.profile_id.as_str().trim().is_empty() {
            return Err(ProfileConfigError::EmptyProfileId);
        }
        if self.layers.is_empty() {
            return Err(ProfileConfigError::NoLayers(self.profile_id.clone()));
        }
        if !self.acceptance_floor.is_finite() || !(0.0..=1.0).contains(&self.acceptance_floor) {
            return Err(ProfileConfigError::FloorOutOfRange(self.acceptance_floor));
        }
        self.check_weights()?;

        let mut names = BTreeSet::new();
        for layer in &self.layers {
            if !names.insert(layer.name.as_str()) {
                return Err(ProfileConfigError::DuplicateLayer(layer.name.clone()));
            }
            if layer.members.is_empty() {
                return Err(ProfileConfigError::EmptyLayer(layer.name.clone()));
            }
            for member in &layer.members {
                if !known_judges.contains(member) {
                    return Err(ProfileConfigError::UnknownJudge {
                        layer: layer.name.clone(),
                        judge_id: member.clone(),
                    });
                }
            }
        }
        for judge_id in self.weights.keys() {
            if !known_judges.contains(judge_id) {
                return Err(ProfileConfigError::WeightForUnknownJudge(judge_id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> BTreeSet<JudgeId> {
        ["universal_floor", "consequences", "rights_and_duties", "fairness"]
            .into_iter()
            .map(JudgeId::from)
            .collect()
    }

    fn profile() -> GovernanceProfile {
        GovernanceProfile {
            profile_id: "test".into(),
            stakeholder_label: "tests".into(),
            domain: "general".into(),
            override_mode: OverrideMode::Balanced,
            layers: vec![
                LexicalLayer::new("outcomes", false, &["consequences"])
                    .with_focus(LayerFocus::Consequences),
                LexicalLayer::new("baseline", false, &["universal_floor"]),
                LexicalLayer::new("rights", true, &["rights_and_duties"])
                    .with_focus(LayerFocus::Rights),
            ],
            weights: BTreeMap::new(),
            acceptance_floor: DEFAULT_ACCEPTANCE_FLOOR,
            tie_break: TieBreak::Lexicographic,
            hard_vetoes: BTreeSet::new(),
            failure_policy: FailurePolicy::ExcludeVote,
        }
    }

    fn names(p: &GovernanceProfile) -> Vec<&str> {
        p.ordered_layers().iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn override_mode_only_reorders_layers() {
        let mut p = profile();
        assert_eq!(names(&p), vec!["outcomes", "baseline", "rights"]);
        p.override_mode = OverrideMode::RightsFirst;
        assert_eq!(names(&p), vec!["rights", "baseline", "outcomes"]);
        p.override_mode = OverrideMode::ConsequencesFirst;
        assert_eq!(names(&p), vec!["outcomes", "baseline", "rights"]);
    }

    #[test]
    fn validation_accepts_well_formed_profile() {
        assert!(profile().validate(&known()).is_ok());
    }

    #[test]
    fn validation_rejects_unknown_judge() {
        let mut p = profile();
        p.layers[0].members.push("oracle".into());
        assert!(matches!(
            p.validate(&known()),
            Err(ProfileConfigError::UnknownJudge { .. })
        ));
    }

    #[test]
    fn validation_rejects_negative_weight() {
        let mut p = profile();
        p.weights.insert("fairness".into(), -0.5);
        assert!(matches!(
            p.validate(&known()),
            Err(ProfileConfigError::NegativeWeight { .. })
        ));
    }

    #[test]
    fn validation_rejects_bad_floor_and_duplicates() {
        let mut p = profile();
        p.acceptance_floor = 1.5;
        assert!(matches!(
            p.validate(&known()),
            Err(ProfileConfigError::FloorOutOfRange(_))
        ));

        let mut p = profile();
        p.layers.push(LexicalLayer::new("rights", false, &["fairness"]));
        assert_eq!(
            p.validate(&known()),
            Err(ProfileConfigError::DuplicateLayer("rights".into()))
        );
    }

    #[test]
    fn missing_weights_default_to_one() {
        let mut p = profile();
        p.weights.insert("consequences".into(), 2.5);
        assert_eq!(p.weight_of(&"consequences".into()), 2.5);
        assert_eq!(p.weight_of(&"fairness".into()), DEFAULT_JUDGE_WEIGHT);
    }

    #[test]
    fn tie_break_orders() {
        let a = OptionId::from("a");
        let b = OptionId::from("b");
        assert_eq!(TieBreak::Lexicographic.compare(&a, &b), Ordering::Less);
        assert_eq!(TieBreak::ReverseLexicographic.compare(&a, &b), Ordering::Greater);
        let priority = TieBreak::Priority(vec!["b".into()]);
        assert_eq!(priority.compare(&a, &b), Ordering::Greater);
        assert_eq!(priority.compare(&a, &"c".into()), Ordering::Less);
    }
}
