use std::collections::{BTreeMap, BTreeSet};

use deme_types::{ContentHash, FieldValue, JudgeId, OptionId, OptionInput, SCORE_EPSILON};
use serde::{Deserialize, Serialize};

use crate::canonical::{CanonicalDecision, Standing};

/// An option as seen from both sides of a check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRef {
    pub content: ContentHash,
    pub base_label: Option<OptionId>,
    pub transformed_label: Option<OptionId>,
}

/// The smallest observed difference between two canonical decisions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Witness {
    JudgeScore {
        option: OptionRef,
        judge_id: JudgeId,
        base: Option<f64>,
        transformed: Option<f64>,
    },
    AggregateScore {
        option: OptionRef,
        base: Option<f64>,
        transformed: Option<f64>,
    },
    Placement {
        option: OptionRef,
        base: Standing,
        transformed: Standing,
    },
    /// `first` ranks above `second` in the base decision and below it in
    /// the transformed one.
    Ordering { first: OptionRef, second: OptionRef },
}

impl Witness {
    pub fn describe(&self) -> String {
        fn label(o: &OptionRef) -> String {
            o.base_label
                .as_ref()
                .or(o.transformed_label.as_ref())
                .map(|l| l.to_string())
                .unwrap_or_else(|| o.content.to_string())
        }
        fn score(s: &Option<f64>) -> String {
            s.map(|v| format!("{:.6}", v)).unwrap_or_else(|| "none".into())
        }
        match self {
            Witness::JudgeScore {
                option,
                judge_id,
                base,
                transformed,
            } => format!(
                "judge {} scored {} as {} before and {} after",
                judge_id,
                label(option),
                score(base),
                score(transformed)
            ),
            Witness::AggregateScore {
                option,
                base,
                transformed,
            } => format!(
                "aggregate score of {} moved from {} to {}",
                label(option),
                score(base),
                score(transformed)
            ),
            Witness::Placement {
                option,
                base,
                transformed,
            } => format!("{} moved from {:?} to {:?}", label(option), base, transformed),
            Witness::Ordering { first, second } => format!(
                "{} and {} swapped places in the ranking",
                label(first),
                label(second)
            ),
        }
    }
}

/// One field that differs between a base record and its transformed
/// counterpart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub option_id: OptionId,
    pub field: String,
    pub before: Option<FieldValue>,
    pub after: Option<FieldValue>,
}

/// Why a bond-changing transform moved the decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub changes: Vec<FieldChange>,
    /// What moved.
    pub witness: Witness,
}

fn option_ref(base: &CanonicalDecision, transformed: &CanonicalDecision, hash: &ContentHash) -> OptionRef {
    OptionRef {
        content: *hash,
        base_label: base.label(hash).cloned(),
        transformed_label: transformed.label(hash).cloned(),
    }
}

fn differs(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() > SCORE_EPSILON,
        (None, None) => false,
        _ => true,
    }
}

/// First difference in priority order: a single judge score, then a
/// single aggregate score, then a single option's standing, then the
/// first flipped pair in the ranking. `None` when the decisions match.
pub fn find_witness(base: &CanonicalDecision, transformed: &CanonicalDecision) -> Option<Witness> {
    let scored: BTreeSet<&ContentHash> = base
        .per_judge_scores
        .keys()
        .chain(transformed.per_judge_scores.keys())
        .collect();
    for hash in &scored {
        let empty = BTreeMap::new();
        let b = base.per_judge_scores.get(*hash).unwrap_or(&empty);
        let t = transformed.per_judge_scores.get(*hash).unwrap_or(&empty);
        let judges: BTreeSet<&JudgeId> = b.keys().chain(t.keys()).collect();
        for judge_id in judges {
            let (before, after) = (b.get(judge_id).copied(), t.get(judge_id).copied());
            if differs(before, after) {
                return Some(Witness::JudgeScore {
                    option: option_ref(base, transformed, hash),
                    judge_id: judge_id.clone(),
                    base: before,
                    transformed: after,
                });
            }
        }
    }

    let aggregated: BTreeSet<&ContentHash> = base
        .aggregate_scores
        .keys()
        .chain(transformed.aggregate_scores.keys())
        .collect();
    for hash in aggregated {
        let (before, after) = (
            base.aggregate_scores.get(hash).copied(),
            transformed.aggregate_scores.get(hash).copied(),
        );
        if differs(before, after) {
            return Some(Witness::AggregateScore {
                option: option_ref(base, transformed, hash),
                base: before,
                transformed: after,
            });
        }
    }

    let everyone: BTreeSet<&ContentHash> = base.labels.keys().chain(transformed.labels.keys()).collect();
    for hash in everyone {
        let (before, after) = (base.standing(hash), transformed.standing(hash));
        if before != after {
            return Some(Witness::Placement {
                option: option_ref(base, transformed, hash),
                base: before,
                transformed: after,
            });
        }
    }

    base.ranking
        .iter()
        .zip(&transformed.ranking)
        .find(|(b, t)| b != t)
        .map(|(first, second)| Witness::Ordering {
            first: option_ref(base, transformed, first),
            second: option_ref(base, transformed, second),
        })
}

/// Every field that differs between each base option and the option it
/// maps to. Changes are listed in base label order, then field order.
pub fn attribute(
    base: &[OptionInput],
    transformed: &[OptionInput],
    label_map: &BTreeMap<OptionId, OptionId>,
) -> Vec<FieldChange> {
    let after_by_label: BTreeMap<&OptionId, &OptionInput> =
        transformed.iter().map(|o| (&o.option_id, o)).collect();
    let mut base_sorted: Vec<&OptionInput> = base.iter().collect();
    base_sorted.sort_by(|a, b| a.option_id.cmp(&b.option_id));

    let mut changes = Vec::new();
    for option in base_sorted {
        let Some(after) = label_map
            .get(&option.option_id)
            .and_then(|to| after_by_label.get(to))
        else {
            continue;
        };
        let before_fields = option.fact_record.field_values();
        let after_fields = after.fact_record.field_values();
        let fields: BTreeSet<&String> = before_fields.keys().chain(after_fields.keys()).collect();
        for field in fields {
            let (before, after) = (before_fields.get(field), after_fields.get(field));
            if before != after {
                changes.push(FieldChange {
                    option_id: option.option_id.clone(),
                    field: field.clone(),
                    before: before.cloned(),
                    after: after.cloned(),
                });
            }
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::option;

    fn canonical(ranking: &[(&str, &[u8], f64)]) -> CanonicalDecision {
        let hashes: Vec<ContentHash> = ranking.iter().map(|(_, c, _)| ContentHash::hash(c)).collect();
        CanonicalDecision {
            selected: hashes.first().copied(),
            forbidden: BTreeSet::new(),
            ranking: hashes.clone(),
            per_judge_scores: BTreeMap::new(),
            aggregate_scores: ranking
                .iter()
                .map(|(_, c, s)| (ContentHash::hash(c), *s))
                .collect(),
            labels: ranking
                .iter()
                .map(|(l, c, _)| (ContentHash::hash(c), OptionId::from(*l)))
                .collect(),
        }
    }

    #[test]
    fn identical_decisions_have_no_witness() {
        let a = canonical(&[("a", b"1", 0.9), ("b", b"2", 0.5)]);
        let b = canonical(&[("x", b"1", 0.9), ("y", b"2", 0.5)]);
        assert_eq!(find_witness(&a, &b), None);
    }

    #[test]
    fn aggregate_difference_beats_placement() {
        let a = canonical(&[("a", b"1", 0.9), ("b", b"2", 0.5)]);
        let b = canonical(&[("b", b"2", 0.95), ("a", b"1", 0.9)]);
        match find_witness(&a, &b) {
            Some(Witness::AggregateScore { option, .. }) => {
                assert_eq!(option.content, ContentHash::hash(b"2"));
            }
            other => panic!("unexpected witness {:?}", other),
        }
    }

    #[test]
    fn judge_score_has_top_priority() {
        let mut a = canonical(&[("a", b"1", 0.9)]);
        let mut b = a.clone();
        a.per_judge_scores.insert(ContentHash::hash(b"1"), BTreeMap::from([(JudgeId::from("j"), 0.2)]));
        b.per_judge_scores.insert(ContentHash::hash(b"1"), BTreeMap::from([(JudgeId::from("j"), 0.3)]));
        b.aggregate_scores.insert(ContentHash::hash(b"1"), 0.1);
        assert!(matches!(find_witness(&a, &b), Some(Witness::JudgeScore { .. })));
    }

    #[test]
    fn flipped_pair_is_reported() {
        let a = canonical(&[("a", b"1", 0.5), ("b", b"2", 0.5), ("c", b"3", 0.5)]);
        let mut b = canonical(&[("a", b"1", 0.5), ("c", b"3", 0.5), ("b", b"2", 0.5)]);
        b.selected = a.selected;
        match find_witness(&a, &b) {
            Some(Witness::Ordering { first, second }) => {
                assert_eq!(first.base_label, Some("b".into()));
                assert_eq!(second.base_label, Some("c".into()));
            }
            other => panic!("unexpected witness {:?}", other),
        }
    }

    #[test]
    fn attribution_lists_changed_fields() {
        let base = vec![option("a", 0.1), option("b", 0.2)];
        let mut after = base.clone();
        after[1].fact_record.rights_and_duties.violates_rights = true;
        let map = BTreeMap::from([
            (OptionId::from("a"), OptionId::from("a")),
            (OptionId::from("b"), OptionId::from("b")),
        ]);
        let changes = attribute(&base, &after, &map);
        assert_eq!(
            changes,
            vec![FieldChange {
                option_id: "b".into(),
                field: "rights_and_duties.violates_rights".into(),
                before: Some(FieldValue::Bool(false)),
                after: Some(FieldValue::Bool(true)),
            }]
        );
    }
}
