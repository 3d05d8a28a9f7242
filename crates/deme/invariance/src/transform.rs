use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use deme_types::{FieldValue, OptionId, OptionInput};
use serde::{Deserialize, Serialize};

use crate::error::InvarianceError;

/// Whether a transform is expected to leave the decision unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Representation only: order, labels. The decision must not move.
    BondPreserving,
    /// Substantive: the decision may move, and every move must be
    /// attributable to a changed field.
    BondChanging,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::BondPreserving => "bond_preserving",
            TransformKind::BondChanging => "bond_changing",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replace one field of one option's record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactEdit {
    pub option_id: OptionId,
    /// Flattened `section.field` path.
    pub field: String,
    pub value: FieldValue,
}

impl FactEdit {
    pub fn set_bool(option_id: impl Into<OptionId>, field: impl Into<String>, value: bool) -> Self {
        Self {
            option_id: option_id.into(),
            field: field.into(),
            value: FieldValue::Bool(value),
        }
    }

    pub fn set_scalar(option_id: impl Into<OptionId>, field: impl Into<String>, value: f64) -> Self {
        Self {
            option_id: option_id.into(),
            field: field.into(),
            value: FieldValue::Scalar(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOp {
    Reverse,
    /// Rotate left by `n` positions.
    Rotate(usize),
    /// `new[i] = old[permutation[i]]`.
    Permutation(Vec<usize>),
    RelabelPrefix(String),
    /// Explicit bijection on labels; unmapped labels are kept.
    RelabelMap(BTreeMap<OptionId, OptionId>),
    FactEdits(Vec<FactEdit>),
}

/// A named, classified transformation of an option set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transform {
    pub name: String,
    pub kind: TransformKind,
    pub op: TransformOp,
}

/// Output of [`Transform::apply`].
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedTransform {
    pub options: Vec<OptionInput>,
    /// Base label → transformed label.
    pub label_map: BTreeMap<OptionId, OptionId>,
}

impl Transform {
    pub fn new(name: impl Into<String>, kind: TransformKind, op: TransformOp) -> Self {
        Self {
            name: name.into(),
            kind,
            op,
        }
    }

    pub fn reverse() -> Self {
        Self::new("reverse_order", TransformKind::BondPreserving, TransformOp::Reverse)
    }

    pub fn rotate(n: usize) -> Self {
        Self::new(
            format!("rotate_order_{}", n),
            TransformKind::BondPreserving,
            TransformOp::Rotate(n),
        )
    }

    pub fn relabel_prefix(prefix: impl Into<String>) -> Self {
        Self::new(
            "relabel_prefix",
            TransformKind::BondPreserving,
            TransformOp::RelabelPrefix(prefix.into()),
        )
    }

    pub fn fact_edits(name: impl Into<String>, edits: Vec<FactEdit>) -> Self {
        Self::new(name, TransformKind::BondChanging, TransformOp::FactEdits(edits))
    }

    fn invalid(&self, reason: impl Into<String>) -> InvarianceError {
        InvarianceError::InvalidTransform {
            transform: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Apply to an option set. Labels must be unique on input and stay
    /// unique on output.
    pub fn apply(&self, options: &[OptionInput]) -> Result<AppliedTransform, InvarianceError> {
        let mut seen = BTreeSet::new();
        for option in options {
            if !seen.insert(&option.option_id) {
                return Err(InvarianceError::DuplicateOption(option.option_id.clone()));
            }
        }

        let identity = || -> BTreeMap<OptionId, OptionId> {
            options
                .iter()
                .map(|o| (o.option_id.clone(), o.option_id.clone()))
                .collect()
        };

        let applied = match &self.op {
            TransformOp::Reverse => AppliedTransform {
                options: options.iter().rev().cloned().collect(),
                label_map: identity(),
            },
            TransformOp::Rotate(n) => {
                let mut rotated = options.to_vec();
                if !rotated.is_empty() {
                    let len = rotated.len();
                    rotated.rotate_left(n % len);
                }
                AppliedTransform {
                    options: rotated,
                    label_map: identity(),
                }
            }
            TransformOp::Permutation(perm) => {
                let mut sorted = perm.clone();
                sorted.sort_unstable();
                if sorted != (0..options.len()).collect::<Vec<_>>() {
                    return Err(self.invalid(format!(
                        "{:?} is not a permutation of {} options",
                        perm,
                        options.len()
                    )));
                }
                AppliedTransform {
                    options: perm.iter().map(|&i| options[i].clone()).collect(),
                    label_map: identity(),
                }
            }
            TransformOp::RelabelPrefix(prefix) => {
                let label_map: BTreeMap<OptionId, OptionId> = options
                    .iter()
                    .map(|o| {
                        (
                            o.option_id.clone(),
                            OptionId::new(format!("{}{}", prefix, o.option_id)),
                        )
                    })
                    .collect();
                relabel(options, label_map)
            }
            TransformOp::RelabelMap(map) => {
                for from in map.keys() {
                    if !seen.contains(&from) {
                        return Err(InvarianceError::UnknownOption {
                            transform: self.name.clone(),
                            option_id: from.clone(),
                        });
                    }
                }
                let label_map: BTreeMap<OptionId, OptionId> = options
                    .iter()
                    .map(|o| {
                        let to = map.get(&o.option_id).unwrap_or(&o.option_id);
                        (o.option_id.clone(), to.clone())
                    })
                    .collect();
                relabel(options, label_map)
            }
            TransformOp::FactEdits(edits) => {
                let mut edited = options.to_vec();
                for edit in edits {
                    let slot = edited
                        .iter_mut()
                        .find(|o| o.option_id == edit.option_id)
                        .ok_or_else(|| InvarianceError::UnknownOption {
                            transform: self.name.clone(),
                            option_id: edit.option_id.clone(),
                        })?;
                    slot.fact_record = slot
                        .fact_record
                        .with_field(&edit.field, edit.value.clone())
                        .map_err(|source| InvarianceError::FactEdit {
                            transform: self.name.clone(),
                            source,
                        })?;
                }
                AppliedTransform {
                    options: edited,
                    label_map: identity(),
                }
            }
        };

        let targets: BTreeSet<&OptionId> = applied.label_map.values().collect();
        if targets.len() != applied.label_map.len() {
            return Err(self.invalid("relabeling is not injective"));
        }
        Ok(applied)
    }
}

fn relabel(options: &[OptionInput], label_map: BTreeMap<OptionId, OptionId>) -> AppliedTransform {
    let options = options
        .iter()
        .map(|o| {
            let to = label_map
                .get(&o.option_id)
                .cloned()
                .unwrap_or_else(|| o.option_id.clone());
            OptionInput {
                option_id: to.clone(),
                fact_record: o.fact_record.with_option_id(to),
            }
        })
        .collect();
    AppliedTransform { options, label_map }
}
