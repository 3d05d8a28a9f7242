use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use deme_governance::{Aggregator, GovernanceProfile};
use deme_judges::JudgeRegistry;
use deme_types::{ContentHash, Decision, OptionId, OptionInput};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::canonical::CanonicalDecision;
use crate::catalog::TransformCatalog;
use crate::error::InvarianceError;
use crate::transform::{Transform, TransformKind};
use crate::witness::{attribute, find_witness, Attribution, Witness};

/// Lifecycle of one check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckState {
    Pending,
    EvaluatedBoth,
    Canonicalized,
    Pass,
    Fail { witness: Witness },
    Changed { attribution: Attribution },
}

impl CheckState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckState::Pending => "pending",
            CheckState::EvaluatedBoth => "evaluated_both",
            CheckState::Canonicalized => "canonicalized",
            CheckState::Pass => "pass",
            CheckState::Fail { .. } => "fail",
            CheckState::Changed { .. } => "changed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckState::Pass | CheckState::Fail { .. } | CheckState::Changed { .. }
        )
    }

    /// The transitions a check may take.
    pub fn can_transition_to(&self, next: &CheckState) -> bool {
        matches!(
            (self, next),
            (CheckState::Pending, CheckState::EvaluatedBoth)
                | (CheckState::EvaluatedBoth, CheckState::Canonicalized)
                | (CheckState::Canonicalized, CheckState::Pass)
                | (CheckState::Canonicalized, CheckState::Fail { .. })
                | (CheckState::Canonicalized, CheckState::Changed { .. })
        )
    }
}

/// One recorded transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub from: Option<String>,
    pub to: String,
    pub note: String,
}

/// A check in progress: current state plus its transition history.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckRun {
    state: CheckState,
    history: Vec<StateChange>,
}

impl Default for CheckRun {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckRun {
    pub fn new() -> Self {
        Self {
            state: CheckState::Pending,
            history: vec![StateChange {
                from: None,
                to: CheckState::Pending.name().to_string(),
                note: "check created".to_string(),
            }],
        }
    }

    pub fn state(&self) -> &CheckState {
        &self.state
    }

    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    /// Move to `next`, rejecting anything the lifecycle does not allow.
    pub fn advance(&mut self, next: CheckState, note: impl Into<String>) -> Result<(), InvarianceError> {
        if !self.state.can_transition_to(&next) {
            return Err(InvarianceError::InvalidTransition {
                from: self.state.name().to_string(),
                to: next.name().to_string(),
            });
        }
        let change = StateChange {
            from: Some(self.state.name().to_string()),
            to: next.name().to_string(),
            note: note.into(),
        };
        debug!(from = ?change.from, to = %change.to, note = %change.note, "Check transition");
        self.history.push(change);
        self.state = next;
        Ok(())
    }
}

/// Not an error: a bond-preserving transform moved the decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvarianceViolation {
    pub transform: String,
    pub witness: Witness,
}

/// Result of checking one transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvarianceReport {
    pub transform: String,
    pub kind: TransformKind,
    pub outcome: CheckState,
    pub base_digest: ContentHash,
    pub transformed_digest: ContentHash,
    pub base_decision: Decision,
    pub transformed_decision: Decision,
    pub history: Vec<StateChange>,
}

impl InvarianceReport {
    pub fn passed(&self) -> bool {
        self.outcome == CheckState::Pass
    }

    pub fn violation(&self) -> Option<InvarianceViolation> {
        match &self.outcome {
            CheckState::Fail { witness } => Some(InvarianceViolation {
                transform: self.transform.clone(),
                witness: witness.clone(),
            }),
            _ => None,
        }
    }

    pub fn attribution(&self) -> Option<&Attribution> {
        match &self.outcome {
            CheckState::Changed { attribution } => Some(attribution),
            _ => None,
        }
    }
}

/// InvarianceChecker: runs the synchronous judge → aggregate pipeline on
/// a base option set and its transform, then compares the decisions by
/// content.
#[derive(Clone, Debug)]
pub struct InvarianceChecker {
    registry: Arc<JudgeRegistry>,
}

impl InvarianceChecker {
    pub fn new(registry: Arc<JudgeRegistry>) -> Self {
        Self { registry }
    }

    /// Judge and aggregate one option set.
    pub fn evaluate(
        &self,
        profile: &GovernanceProfile,
        options: &[OptionInput],
    ) -> Result<Decision, InvarianceError> {
        let report = self
            .registry
            .evaluate_options(options, &profile.judge_context());
        let mut seen = BTreeSet::new();
        let option_ids: Vec<OptionId> = options
            .iter()
            .filter(|o| seen.insert(&o.option_id))
            .map(|o| o.option_id.clone())
            .collect();
        Ok(Aggregator::decide(profile, &option_ids, &report)?)
    }

    #[instrument(skip_all, fields(profile_id = %profile.profile_id, transform = %transform.name))]
    pub fn check(
        &self,
        profile: &GovernanceProfile,
        options: &[OptionInput],
        transform: &Transform,
    ) -> Result<InvarianceReport, InvarianceError> {
        let mut run = CheckRun::new();

        let applied = transform.apply(options)?;
        let base_identity = content_identity(options)?;
        content_identity(&applied.options)?;

        // Transformed labels inherit the identity of the option they came from.
        let transformed_identity: BTreeMap<OptionId, ContentHash> = applied
            .label_map
            .iter()
            .filter_map(|(from, to)| base_identity.get(from).map(|h| (to.clone(), *h)))
            .collect();

        let base_decision = self.evaluate(profile, options)?;
        let transformed_decision = self.evaluate(profile, &applied.options)?;
        run.advance(CheckState::EvaluatedBoth, "pipeline ran on both option sets")?;

        let base = CanonicalDecision::from_decision(&base_decision, &base_identity)?;
        let transformed =
            CanonicalDecision::from_decision(&transformed_decision, &transformed_identity)?;
        let (base_digest, transformed_digest) = (base.digest(), transformed.digest());
        run.advance(
            CheckState::Canonicalized,
            format!("base {} / transformed {}", base_digest, transformed_digest),
        )?;

        let witness = find_witness(&base, &transformed);
        let outcome = match (transform.kind, witness) {
            (_, None) => CheckState::Pass,
            (TransformKind::BondPreserving, Some(witness)) => CheckState::Fail { witness },
            (TransformKind::BondChanging, Some(witness)) => {
                let changes = attribute(options, &applied.options, &applied.label_map);
                if changes.is_empty() {
                    CheckState::Fail { witness }
                } else {
                    CheckState::Changed {
                        attribution: Attribution { changes, witness },
                    }
                }
            }
        };

        let note = match &outcome {
            CheckState::Pass => "decisions match".to_string(),
            CheckState::Fail { witness } => witness.describe(),
            CheckState::Changed { attribution } => {
                format!("{} field(s) changed", attribution.changes.len())
            }
            _ => String::new(),
        };
        match &outcome {
            CheckState::Fail { .. } => warn!(witness = %note, "Invariance check failed"),
            _ => info!(outcome = outcome.name(), "Invariance check finished"),
        }
        run.advance(outcome.clone(), note)?;

        Ok(InvarianceReport {
            transform: transform.name.clone(),
            kind: transform.kind,
            outcome,
            base_digest,
            transformed_digest,
            base_decision,
            transformed_decision,
            history: run.history,
        })
    }

    /// Check every transform in `catalog`, in catalog order.
    pub fn check_catalog(
        &self,
        profile: &GovernanceProfile,
        options: &[OptionInput],
        catalog: &TransformCatalog,
    ) -> Result<Vec<InvarianceReport>, InvarianceError> {
        catalog
            .iter()
            .map(|t| self.check(profile, options, t))
            .collect()
    }
}

/// Label → content hash, rejecting two labels with the same content.
fn content_identity(options: &[OptionInput]) -> Result<BTreeMap<OptionId, ContentHash>, InvarianceError> {
    let mut by_hash: BTreeMap<ContentHash, &OptionId> = BTreeMap::new();
    let mut identity = BTreeMap::new();
    for option in options {
        let hash = option.fact_record.content_hash();
        if let Some(first) = by_hash.insert(hash, &option.option_id) {
            return Err(InvarianceError::DuplicateContent {
                first: first.clone(),
                second: option.option_id.clone(),
                hash,
            });
        }
        identity.insert(option.option_id.clone(), hash);
    }
    Ok(identity)
}
