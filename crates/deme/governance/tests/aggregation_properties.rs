//! Property tests for the aggregator: order independence, idempotence and
//! veto behaviour over arbitrary judgment matrices.

use deme_governance::{canonical, Aggregator, GovernanceProfile};
use deme_types::*;
use proptest::prelude::*;

const JUDGES: [&str; 4] = ["consequences", "fairness", "rights_and_duties", "universal_floor"];

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_profile() -> impl Strategy<Value = GovernanceProfile> {
    prop_oneof![
        Just(canonical::balanced_profile()),
        Just(canonical::rights_first_profile()),
        Just(canonical::consequences_first_profile()),
    ]
}

/// (option ids, judgments). Each cell is absent, a veto, or a score.
fn arb_matrix() -> impl Strategy<Value = (Vec<OptionId>, Vec<Judgment>)> {
    (1usize..6).prop_flat_map(|n| {
        proptest::collection::vec(
            proptest::option::weighted(0.9, (any::<bool>(), 0.0f64..=1.0)),
            n * JUDGES.len(),
        )
        .prop_map(move |cells| {
            let ids: Vec<OptionId> = (0..n).map(|i| OptionId::new(format!("o{i}"))).collect();
            let mut judgments = Vec::new();
            for (idx, cell) in cells.into_iter().enumerate() {
                let option = ids[idx / JUDGES.len()].clone();
                let judge = JudgeId::from(JUDGES[idx % JUDGES.len()]);
                match cell {
                    Some((true, _)) if idx % 7 == 0 => {
                        judgments.push(Judgment::veto(option, judge, vec!["veto".into()]))
                    }
                    Some((_, score)) => {
                        judgments.push(Judgment::scored(option, judge, score, vec![]))
                    }
                    None => {}
                }
            }
            (ids, judgments)
        })
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Permuting judgments and option ids never changes the decision.
    #[test]
    fn judgment_order_is_irrelevant(
        profile in arb_profile(),
        (ids, judgments) in arb_matrix(),
        seed in any::<u64>(),
    ) {
        let base = Aggregator::decide_judgments(&profile, &ids, &judgments).unwrap();

        let mut shuffled = judgments.clone();
        let len = shuffled.len().max(1);
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();
        let mut rev_ids = ids.clone();
        rev_ids.reverse();

        let permuted = Aggregator::decide_judgments(&profile, &rev_ids, &shuffled).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&base).unwrap(),
            serde_json::to_string(&permuted).unwrap()
        );
    }

    /// Aggregating the same input twice is byte-identical.
    #[test]
    fn aggregation_is_idempotent(profile in arb_profile(), (ids, judgments) in arb_matrix()) {
        let a = Aggregator::decide_judgments(&profile, &ids, &judgments).unwrap();
        let b = Aggregator::decide_judgments(&profile, &ids, &judgments).unwrap();
        prop_assert_eq!(a, b);
    }

    /// The selection is never forbidden, every option lands in exactly one
    /// of selection, alternatives, forbidden or eliminated, and every
    /// forbidden option carries a veto record.
    #[test]
    fn decision_is_well_formed(profile in arb_profile(), (ids, judgments) in arb_matrix()) {
        let decision = Aggregator::decide_judgments(&profile, &ids, &judgments).unwrap();
        if let Some(selected) = &decision.selected_option {
            prop_assert!(!decision.is_forbidden(selected));
        }
        for forbidden in &decision.forbidden_options {
            prop_assert!(decision.audit.vetoes.iter().any(|v| &v.option_id == forbidden));
            prop_assert!(!decision.ranking().contains(forbidden));
        }
        let eliminated: usize = decision.audit.layers.iter().map(|l| l.eliminated.len()).sum();
        prop_assert_eq!(
            decision.ranking().len() + decision.forbidden_options.len() + eliminated,
            ids.len()
        );
        prop_assert_eq!(decision.selected_option.is_none(), decision.ranking().is_empty());
    }

    /// Adding a veto to the selected option forbids it and moves the
    /// selection elsewhere (or to none).
    #[test]
    fn veto_on_selection_removes_it(profile in arb_profile(), (ids, judgments) in arb_matrix()) {
        let before = Aggregator::decide_judgments(&profile, &ids, &judgments).unwrap();
        let Some(selected) = before.selected_option.clone() else {
            return Ok(());
        };
        let floor = JudgeId::from("universal_floor");
        let mut vetoed: Vec<Judgment> = judgments
            .into_iter()
            .filter(|j| !(j.option_id == selected && j.judge_id == floor))
            .collect();
        vetoed.push(Judgment::veto(selected.clone(), floor, vec!["added".into()]));

        let after = Aggregator::decide_judgments(&profile, &ids, &vetoed).unwrap();
        prop_assert!(after.is_forbidden(&selected));
        prop_assert_ne!(after.selected_option, Some(selected));
        prop_assert!(before.forbidden_options.is_subset(&after.forbidden_options));
    }
}
