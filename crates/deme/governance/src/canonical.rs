use std::collections::{BTreeMap, BTreeSet};

use deme_judges::VetoPredicate;

use crate::profile::{
    FailurePolicy, GovernanceProfile, LayerFocus, LexicalLayer, OverrideMode, TieBreak,
    DEFAULT_ACCEPTANCE_FLOOR,
};

fn reference_layers() -> Vec<LexicalLayer> {
    vec![
        LexicalLayer::new("baseline", true, &["universal_floor"]),
        LexicalLayer::new("rights", true, &["rights_and_duties", "fairness"])
            .with_focus(LayerFocus::Rights),
        LexicalLayer::new("outcomes", false, &["consequences"])
            .with_focus(LayerFocus::Consequences),
    ]
}

/// Create the canonical rights-first profile.
///
/// Rights and fairness are processed before anything else and may cut
/// the candidate set; exploitation of vulnerable people is a hard veto
/// and a judge failure counts as a veto.
pub fn rights_first_profile() -> GovernanceProfile {
    GovernanceProfile {
        profile_id: "rights_first".into(),
        stakeholder_label: "Rights-first reference deme".into(),
        domain: "general".into(),
        override_mode: OverrideMode::RightsFirst,
        layers: reference_layers(),
        weights: BTreeMap::from([
            ("rights_and_duties".into(), 2.0),
            ("fairness".into(), 1.5),
        ]),
        acceptance_floor: 0.5,
        tie_break: TieBreak::Lexicographic,
        hard_vetoes: BTreeSet::from([
            VetoPredicate::ExploitsVulnerablePopulation,
            VetoPredicate::CoercionOrUndueInfluence,
        ]),
        failure_policy: FailurePolicy::ConservativeVeto,
    }
}

/// Create the canonical consequences-first profile.
pub fn consequences_first_profile() -> GovernanceProfile {
    GovernanceProfile {
        profile_id: "consequences_first".into(),
        stakeholder_label: "Outcome-oriented reference deme".into(),
        domain: "general".into(),
        override_mode: OverrideMode::ConsequencesFirst,
        layers: reference_layers(),
        weights: BTreeMap::from([("consequences".into(), 2.0)]),
        acceptance_floor: DEFAULT_ACCEPTANCE_FLOOR,
        tie_break: TieBreak::Lexicographic,
        hard_vetoes: BTreeSet::from([VetoPredicate::SevereEnvironmentalHarm]),
        failure_policy: FailurePolicy::ExcludeVote,
    }
}

/// Create the canonical balanced profile: declared layer order, equal
/// weights, floor vetoes only.
pub fn balanced_profile() -> GovernanceProfile {
    GovernanceProfile {
        profile_id: "balanced".into(),
        stakeholder_label: "Balanced reference deme".into(),
        domain: "general".into(),
        override_mode: OverrideMode::Balanced,
        layers: reference_layers(),
        weights: BTreeMap::new(),
        acceptance_floor: DEFAULT_ACCEPTANCE_FLOOR,
        tie_break: TieBreak::Lexicographic,
        hard_vetoes: BTreeSet::new(),
        failure_policy: FailurePolicy::ExcludeVote,
    }
}

/// All built-in profiles.
pub fn builtin_profiles() -> Vec<GovernanceProfile> {
    vec![
        balanced_profile(),
        consequences_first_profile(),
        rights_first_profile(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use deme_judges::JudgeRegistry;

    #[test]
    fn builtins_validate_against_reference_judges() {
        let known = JudgeRegistry::with_reference_judges().judge_ids();
        for profile in builtin_profiles() {
            profile
                .validate(&known)
                .unwrap_or_else(|e| panic!("{}: {}", profile.profile_id, e));
        }
    }

    #[test]
    fn rights_first_processes_rights_layer_first() {
        let profile = rights_first_profile();
        assert_eq!(profile.ordered_layers()[0].name, "rights");
        let profile = consequences_first_profile();
        assert_eq!(profile.ordered_layers()[0].name, "outcomes");
    }
}
