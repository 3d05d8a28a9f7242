use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use deme_types::{
    EvaluationError, EvaluationReport, FactRecord, JudgeFailure, JudgeId, Judgment, OptionInput,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ingest::admit;
use crate::reference::{consequences, fairness, rights, universal_floor};
use crate::veto::VetoPredicate;

/// Read-only context shared by every judge call of one request.
#[derive(Clone, Debug, Default)]
pub struct JudgeContext {
    /// Extra veto predicates activated by the governing profile.
    pub vetoes: Arc<BTreeSet<VetoPredicate>>,
}

impl JudgeContext {
    pub fn with_vetoes(vetoes: impl IntoIterator<Item = VetoPredicate>) -> Self {
        Self {
            vetoes: Arc::new(vetoes.into_iter().collect()),
        }
    }
}

/// Signature of a judge: pure function of its own record and the context.
pub type JudgeFn = fn(&JudgeId, &FactRecord, &JudgeContext) -> Result<Judgment, EvaluationError>;

/// Built-in reference judges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JudgeKind {
    UniversalFloor,
    Consequences,
    RightsAndDuties,
    Fairness,
}

impl JudgeKind {
    pub const ALL: [JudgeKind; 4] = [
        JudgeKind::UniversalFloor,
        JudgeKind::Consequences,
        JudgeKind::RightsAndDuties,
        JudgeKind::Fairness,
    ];

    /// Identifier the judge is registered under by default.
    pub fn default_id(&self) -> &'static str {
        match self {
            JudgeKind::UniversalFloor => "universal_floor",
            JudgeKind::Consequences => "consequences",
            JudgeKind::RightsAndDuties => "rights_and_duties",
            JudgeKind::Fairness => "fairness",
        }
    }

    pub fn evaluate(
        &self,
        judge_id: &JudgeId,
        fact: &FactRecord,
        ctx: &JudgeContext,
    ) -> Result<Judgment, EvaluationError> {
        match self {
            JudgeKind::UniversalFloor => universal_floor::judge(judge_id, fact, ctx),
            JudgeKind::Consequences => consequences::judge(judge_id, fact, ctx),
            JudgeKind::RightsAndDuties => rights::judge(judge_id, fact, ctx),
            JudgeKind::Fairness => fairness::judge(judge_id, fact, ctx),
        }
    }
}

/// An entry in the capability table.
#[derive(Clone, Copy, Debug)]
pub enum JudgeImpl {
    Builtin(JudgeKind),
    Function(JudgeFn),
}

impl JudgeImpl {
    pub fn evaluate(
        &self,
        judge_id: &JudgeId,
        fact: &FactRecord,
        ctx: &JudgeContext,
    ) -> Result<Judgment, EvaluationError> {
        match self {
            JudgeImpl::Builtin(kind) => kind.evaluate(judge_id, fact, ctx),
            JudgeImpl::Function(f) => f(judge_id, fact, ctx),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("judge already registered: {0}")]
    DuplicateJudge(JudgeId),
}

/// Capability table `judge_id → judge`.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct JudgeRegistry {
    judges: BTreeMap<JudgeId, JudgeImpl>,
}

impl JudgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four reference judges under their default ids.
    pub fn with_reference_judges() -> Self {
        let mut registry = Self::new();
        for kind in JudgeKind::ALL {
            registry.judges.insert(kind.default_id().into(), JudgeImpl::Builtin(kind));
        }
        registry
    }

    pub fn register(&mut self, judge_id: JudgeId, judge: JudgeImpl) -> Result<(), RegistryError> {
        if self.judges.contains_key(&judge_id) {
            return Err(RegistryError::DuplicateJudge(judge_id));
        }
        info!(judge_id = %judge_id, "Judge registered");
        self.judges.insert(judge_id, judge);
        Ok(())
    }

    pub fn contains(&self, judge_id: &JudgeId) -> bool {
        self.judges.contains_key(judge_id)
    }

    pub fn get(&self, judge_id: &JudgeId) -> Option<JudgeImpl> {
        self.judges.get(judge_id).copied()
    }

    /// Registered ids in sorted order.
    pub fn judge_ids(&self) -> BTreeSet<JudgeId> {
        self.judges.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.judges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JudgeId, &JudgeImpl)> {
        self.judges.iter()
    }

    /// Run one judge on one record.
    pub fn evaluate(
        &self,
        judge_id: &JudgeId,
        fact: &FactRecord,
        ctx: &JudgeContext,
    ) -> Result<Judgment, EvaluationError> {
        let judge = self
            .get(judge_id)
            .ok_or_else(|| EvaluationError::UnknownJudge {
                judge_id: judge_id.clone(),
            })?;
        judge.evaluate(judge_id, fact, ctx)
    }

    /// Run every registered judge over every admitted option, sequentially,
    /// in (input order, judge id) order.
    ///
    /// Invalid records are rejected individually; a failing judge only
    /// loses its own (option, judge) pair.
    pub fn evaluate_options(&self, options: &[OptionInput], ctx: &JudgeContext) -> EvaluationReport {
        let (admitted, rejected) = admit(options);
        let mut report = EvaluationReport {
            rejected,
            ..EvaluationReport::default()
        };

        for option in admitted {
            for (judge_id, judge) in &self.judges {
                match judge.evaluate(judge_id, &option.fact_record, ctx) {
                    Ok(judgment) => {
                        debug!(
                            option_id = %option.option_id,
                            judge_id = %judge_id,
                            score = judgment.score,
                            verdict = %judgment.verdict,
                            "Judgment produced"
                        );
                        report.judgments.push(judgment);
                    }
                    Err(error) => {
                        warn!(
                            option_id = %option.option_id,
                            judge_id = %judge_id,
                            error = %error,
                            "Judge failed"
                        );
                        report.failures.push(JudgeFailure {
                            option_id: option.option_id.clone(),
                            judge_id: judge_id.clone(),
                            error,
                        });
                    }
                }
            }
        }
        report
    }
}
