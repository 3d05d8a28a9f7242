//! Property tests: fact records survive serialization unchanged, and their
//! content hash ignores the label.

use deme_types::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Unit scalars on a thousandth grid, so the JSON text is short and exact.
fn arb_unit() -> impl Strategy<Value = f64> {
    (0u32..=1000).prop_map(|n| f64::from(n) / 1000.0)
}

fn arb_evidence() -> impl Strategy<Value = EvidenceQuality> {
    prop_oneof![
        Just(EvidenceQuality::Low),
        Just(EvidenceQuality::Medium),
        Just(EvidenceQuality::High),
    ]
}

prop_compose! {
    fn arb_consequences()(
        expected_benefit in arb_unit(),
        expected_harm in arb_unit(),
        urgency in arb_unit(),
        affected_count in any::<u32>(),
    ) -> Consequences {
        Consequences { expected_benefit, expected_harm, urgency, affected_count }
    }
}

prop_compose! {
    fn arb_rights()(flags in any::<[bool; 4]>()) -> RightsAndDuties {
        RightsAndDuties {
            violates_rights: flags[0],
            has_valid_consent: flags[1],
            violates_explicit_rule: flags[2],
            role_duty_conflict: flags[3],
        }
    }
}

prop_compose! {
    fn arb_fairness()(flags in any::<[bool; 5]>()) -> JusticeAndFairness {
        JusticeAndFairness {
            discriminates_on_protected_attr: flags[0],
            prioritizes_most_disadvantaged: flags[1],
            distributes_burdens_fairly: flags[2],
            exploits_vulnerable_population: flags[3],
            exacerbates_power_imbalance: flags[4],
        }
    }
}

prop_compose! {
    fn arb_autonomy()(flags in any::<[bool; 4]>()) -> AutonomyAndAgency {
        AutonomyAndAgency {
            has_meaningful_choice: flags[0],
            coercion_or_undue_influence: flags[1],
            can_withdraw_without_penalty: flags[2],
            manipulative_design_present: flags[3],
        }
    }
}

prop_compose! {
    fn arb_privacy()(
        privacy_invasion_level in arb_unit(),
        reidentification_risk in arb_unit(),
        flags in any::<[bool; 3]>(),
    ) -> PrivacyAndData {
        PrivacyAndData {
            privacy_invasion_level,
            data_minimization_respected: flags[0],
            secondary_use_without_consent: flags[1],
            data_retention_excessive: flags[2],
            reidentification_risk,
        }
    }
}

prop_compose! {
    fn arb_societal()(levels in [arb_unit(), arb_unit(), arb_unit(), arb_unit()]) -> SocietalAndEnvironmental {
        SocietalAndEnvironmental {
            environmental_harm: levels[0],
            long_term_societal_risk: levels[1],
            benefits_to_future_generations: levels[2],
            burden_on_vulnerable_groups: levels[3],
        }
    }
}

prop_compose! {
    fn arb_virtue()(flags in any::<[bool; 3]>()) -> VirtueAndCare {
        VirtueAndCare {
            expresses_compassion: flags[0],
            betrays_trust: flags[1],
            respects_person_as_end: flags[2],
        }
    }
}

prop_compose! {
    fn arb_procedure()(flags in any::<[bool; 4]>()) -> ProceduralLegitimacy {
        ProceduralLegitimacy {
            followed_approved_procedures: flags[0],
            stakeholders_consulted: flags[1],
            decision_is_explainable: flags[2],
            contestation_available: flags[3],
        }
    }
}

prop_compose! {
    fn arb_epistemic()(
        uncertainty_level in arb_unit(),
        evidence_quality in arb_evidence(),
        novel_situation_flag in any::<bool>(),
    ) -> EpistemicStatus {
        EpistemicStatus { uncertainty_level, evidence_quality, novel_situation_flag }
    }
}

prop_compose! {
    fn arb_fact(versions: BoxedStrategy<u32>)(
        option_id in "[a-z][a-z0-9_-]{0,11}",
        schema_version in versions,
        consequences in arb_consequences(),
        rights_and_duties in arb_rights(),
        justice_and_fairness in arb_fairness(),
        autonomy_and_agency in proptest::option::of(arb_autonomy()),
        privacy_and_data in proptest::option::of(arb_privacy()),
        societal_and_environmental in proptest::option::of(arb_societal()),
        virtue_and_care in proptest::option::of(arb_virtue()),
        procedural_legitimacy in proptest::option::of(arb_procedure()),
        epistemic_status in proptest::option::of(arb_epistemic()),
        tags in proptest::collection::btree_set("[a-z]{1,8}", 0..4),
    ) -> FactRecord {
        FactRecord {
            option_id: option_id.into(),
            schema_version,
            consequences,
            rights_and_duties,
            justice_and_fairness,
            autonomy_and_agency,
            privacy_and_data,
            societal_and_environmental,
            virtue_and_care,
            procedural_legitimacy,
            epistemic_status,
            tags,
        }
    }
}

fn current_version() -> BoxedStrategy<u32> {
    Just(FACT_SCHEMA_VERSION).boxed()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Serialize then deserialize yields an equal record with the same
    /// content hash, whatever the schema version.
    #[test]
    fn records_round_trip_through_json(fact in arb_fact(any::<u32>().boxed())) {
        let json = serde_json::to_string(&fact).unwrap();
        let back: FactRecord = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&back, &fact);
        prop_assert_eq!(back.content_hash(), fact.content_hash());
        prop_assert_eq!(serde_json::to_string(&back).unwrap(), json);
    }

    /// Records of the current version are valid and pass the validating
    /// parser unchanged.
    #[test]
    fn current_records_parse_and_validate(fact in arb_fact(current_version())) {
        let json = serde_json::to_string_pretty(&fact).unwrap();
        let parsed = FactRecord::from_json(&json).unwrap();
        prop_assert_eq!(parsed, fact);
    }

    /// The content hash ignores the label and sees every content change.
    #[test]
    fn content_hash_ignores_label(
        fact in arb_fact(current_version()),
        label in "[A-Z][a-z]{0,7}",
        tag in "[0-9]{1,4}",
    ) {
        prop_assert_eq!(fact.with_option_id(label.into()).content_hash(), fact.content_hash());

        let mut tagged = fact.clone();
        tagged.tags.insert(tag);
        prop_assert_ne!(tagged.content_hash(), fact.content_hash());
    }
}
