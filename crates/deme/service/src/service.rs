//! The DEME service surface.
//!
//! Judges run on the blocking pool, one task per (option, judge) pair,
//! bounded by a semaphore and a per-call timeout. A panic or timeout only
//! costs its own pair. Aggregation and invariance checking are synchronous
//! and run on the caller's task.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use deme_governance::{Aggregator, GovernanceProfile, ProfileStore, ProfileSummary};
use deme_invariance::{InvarianceChecker, InvarianceReport, TransformCatalog};
use deme_judges::{admit, JudgeRegistry};
use deme_types::{
    Decision, EvaluationError, EvaluationReport, JudgeFailure, JudgeId, Judgment, OptionId,
    OptionInput, ProfileId,
};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceResult;

type JudgeTask = JoinHandle<Result<Judgment, EvaluationError>>;

/// Entry point for the three external operations.
#[derive(Clone, Debug)]
pub struct DemeService {
    config: ServiceConfig,
    registry: Arc<JudgeRegistry>,
    profiles: Arc<ProfileStore>,
    limiter: Arc<Semaphore>,
}

impl DemeService {
    /// Build a service over `registry`, loading profiles as configured.
    pub fn new(config: ServiceConfig, registry: JudgeRegistry) -> ServiceResult<Self> {
        config.validate()?;
        let known = registry.judge_ids();
        let mut profiles = if config.include_builtin_profiles {
            ProfileStore::with_builtins(known)?
        } else {
            ProfileStore::new(known)
        };
        for dir in &config.profile_dirs {
            let loaded = profiles.load_dir(dir)?;
            info!(dir = %dir.display(), count = loaded.len(), "Profile directory loaded");
        }
        Ok(Self::with_store(config, Arc::new(registry), profiles))
    }

    /// A service with the reference judges.
    pub fn from_config(config: ServiceConfig) -> ServiceResult<Self> {
        Self::new(config, JudgeRegistry::with_reference_judges())
    }

    /// Assemble a service from an already loaded profile store.
    pub fn with_store(
        config: ServiceConfig,
        registry: Arc<JudgeRegistry>,
        profiles: ProfileStore,
    ) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_parallel_judges.max(1)));
        Self {
            config,
            registry,
            profiles: Arc::new(profiles),
            limiter,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JudgeRegistry> {
        &self.registry
    }

    pub fn profile(&self, profile_id: &ProfileId) -> ServiceResult<Arc<GovernanceProfile>> {
        Ok(self.profiles.get(profile_id)?)
    }

    /// Loaded profiles in id order.
    pub fn list_profiles(&self) -> Vec<ProfileSummary> {
        self.profiles.list()
    }

    /// Run every registered judge over every admitted option.
    ///
    /// Invalid records and repeated ids are rejected individually. The
    /// report lists judgments and failures in (input order, judge id)
    /// order regardless of completion order.
    #[instrument(skip(self, options), fields(options = options.len()))]
    pub async fn evaluate_options(
        &self,
        profile_id: &ProfileId,
        options: Vec<OptionInput>,
    ) -> ServiceResult<EvaluationReport> {
        let profile = self.profile(profile_id)?;
        let ctx = profile.judge_context();
        let timeout = Duration::from_millis(self.config.judge_timeout_ms);
        let (admitted, rejected) = admit(&options);

        let mut pending: Vec<(OptionId, JudgeId, JudgeTask)> =
            Vec::with_capacity(admitted.len() * self.registry.len());
        for option in admitted {
            let record = Arc::new(option.fact_record.clone());
            for (judge_id, judge) in self.registry.iter() {
                let limiter = Arc::clone(&self.limiter);
                let record = Arc::clone(&record);
                let ctx = ctx.clone();
                let (judge, task_judge_id) = (*judge, judge_id.clone());
                let timeout_ms = self.config.judge_timeout_ms;

                let handle = tokio::spawn(async move {
                    let _permit = limiter.acquire_owned().await.ok();
                    let option_id = record.option_id.clone();
                    let call_judge_id = task_judge_id.clone();
                    let call = tokio::task::spawn_blocking(move || {
                        judge.evaluate(&call_judge_id, &record, &ctx)
                    });
                    match tokio::time::timeout(timeout, call).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(join_err)) => Err(EvaluationError::Crashed {
                            judge_id: task_judge_id,
                            option_id,
                            reason: panic_reason(join_err),
                        }),
                        Err(_) => Err(EvaluationError::TimedOut {
                            judge_id: task_judge_id,
                            option_id,
                            timeout_ms,
                        }),
                    }
                });
                pending.push((option.option_id.clone(), judge_id.clone(), handle));
            }
        }

        let mut report = EvaluationReport {
            rejected,
            ..EvaluationReport::default()
        };
        for (option_id, judge_id, handle) in pending {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(EvaluationError::Crashed {
                    judge_id: judge_id.clone(),
                    option_id: option_id.clone(),
                    reason: panic_reason(join_err),
                }),
            };
            match outcome {
                Ok(judgment) => {
                    debug!(
                        option_id = %option_id,
                        judge_id = %judge_id,
                        score = judgment.score,
                        verdict = %judgment.verdict,
                        "Judgment produced"
                    );
                    report.judgments.push(judgment);
                }
                Err(error) => {
                    warn!(option_id = %option_id, judge_id = %judge_id, error = %error, "Judge failed");
                    report.failures.push(JudgeFailure {
                        option_id,
                        judge_id,
                        error,
                    });
                }
            }
        }

        info!(
            profile_id = %profile_id,
            judgments = report.judgments.len(),
            failures = report.failures.len(),
            rejected = report.rejected.len(),
            "Options evaluated"
        );
        Ok(report)
    }

    /// Aggregate a report under the profile's policy.
    pub fn govern_decision(
        &self,
        profile_id: &ProfileId,
        option_ids: &[OptionId],
        report: &EvaluationReport,
    ) -> ServiceResult<Decision> {
        let profile = self.profile(profile_id)?;
        let decision = Aggregator::decide(&profile, option_ids, report)?;
        info!(
            profile_id = %profile_id,
            selected = ?decision.selected_option.as_ref().map(|s| s.as_str()),
            deciding_layer = %decision.audit.deciding_layer,
            "Decision governed"
        );
        Ok(decision)
    }

    /// Evaluate then govern. Repeated ids count once.
    pub async fn decide(
        &self,
        profile_id: &ProfileId,
        options: Vec<OptionInput>,
    ) -> ServiceResult<Decision> {
        let option_ids = distinct_ids(&options);
        let report = self.evaluate_options(profile_id, options).await?;
        self.govern_decision(profile_id, &option_ids, &report)
    }

    /// Run every transform of `catalog` against `options`.
    pub fn check_invariance(
        &self,
        profile_id: &ProfileId,
        options: &[OptionInput],
        catalog: &TransformCatalog,
    ) -> ServiceResult<Vec<InvarianceReport>> {
        let profile = self.profile(profile_id)?;
        let checker = InvarianceChecker::new(Arc::clone(&self.registry));
        Ok(checker.check_catalog(&profile, options, catalog)?)
    }
}

fn distinct_ids(options: &[OptionInput]) -> Vec<OptionId> {
    let mut seen = BTreeSet::new();
    options
        .iter()
        .filter(|o| seen.insert(&o.option_id))
        .map(|o| o.option_id.clone())
        .collect()
}

fn panic_reason(err: JoinError) -> String {
    if err.is_cancelled() {
        return "judge task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("judge panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("judge panicked: {}", message)
    } else {
        "judge panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deme_governance::{FailurePolicy, LexicalLayer, OverrideMode, TieBreak};
    use deme_judges::{JudgeContext, JudgeImpl};
    use deme_types::FactRecord;
    use std::collections::{BTreeMap, BTreeSet as Set};

    fn steady(
        judge_id: &JudgeId,
        fact: &FactRecord,
        _ctx: &JudgeContext,
    ) -> Result<Judgment, EvaluationError> {
        Ok(Judgment::scored(
            fact.option_id.clone(),
            judge_id.clone(),
            fact.consequences.expected_benefit,
            vec![],
        ))
    }

    fn slow(
        judge_id: &JudgeId,
        fact: &FactRecord,
        ctx: &JudgeContext,
    ) -> Result<Judgment, EvaluationError> {
        std::thread::sleep(Duration::from_millis(300));
        steady(judge_id, fact, ctx)
    }

    fn panicky(
        judge_id: &JudgeId,
        fact: &FactRecord,
        ctx: &JudgeContext,
    ) -> Result<Judgment, EvaluationError> {
        if fact.option_id.as_str() == "b" {
            panic!("boom");
        }
        steady(judge_id, fact, ctx)
    }

    fn service(extra: (&str, deme_judges::JudgeFn), policy: FailurePolicy) -> DemeService {
        let mut registry = JudgeRegistry::new();
        registry.register("steady".into(), JudgeImpl::Function(steady)).unwrap();
        registry.register(extra.0.into(), JudgeImpl::Function(extra.1)).unwrap();
        let mut store = ProfileStore::new(registry.judge_ids());
        store
            .insert(GovernanceProfile {
                profile_id: "p".into(),
                stakeholder_label: "test".into(),
                domain: "test".into(),
                override_mode: OverrideMode::Balanced,
                layers: vec![LexicalLayer::new("all", false, &["steady", extra.0])],
                weights: BTreeMap::new(),
                acceptance_floor: 0.4,
                tie_break: TieBreak::Lexicographic,
                hard_vetoes: Set::new(),
                failure_policy: policy,
            })
            .unwrap();
        let config = ServiceConfig {
            judge_timeout_ms: 50,
            max_parallel_judges: 2,
            ..ServiceConfig::default()
        };
        DemeService::with_store(config, Arc::new(registry), store)
    }

    fn options() -> Vec<OptionInput> {
        ["a", "b"]
            .iter()
            .zip([0.9, 0.6])
            .map(|(id, benefit)| {
                let mut record = crate::tests::fact(id);
                record.consequences.expected_benefit = benefit;
                OptionInput::new(record)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_report_is_in_input_then_judge_order() {
        let svc = service(("other", steady), FailurePolicy::ExcludeVote);
        let mut opts = options();
        opts.reverse();
        let report = svc.evaluate_options(&"p".into(), opts).await.unwrap();
        let pairs: Vec<(&str, &str)> = report
            .judgments
            .iter()
            .map(|j| (j.option_id.as_str(), j.judge_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("b", "other"), ("b", "steady"), ("a", "other"), ("a", "steady")]);
    }

    #[tokio::test]
    async fn test_timeout_is_isolated_to_its_pair() {
        let svc = service(("slow", slow), FailurePolicy::ExcludeVote);
        let report = svc.evaluate_options(&"p".into(), options()).await.unwrap();
        assert_eq!(report.judgments.len(), 2);
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| matches!(f.error, EvaluationError::TimedOut { timeout_ms: 50, .. })));
    }

    #[tokio::test]
    async fn test_panic_becomes_crash_and_conservative_veto() {
        let svc = service(("panicky", panicky), FailurePolicy::ConservativeVeto);
        let decision = svc.decide(&"p".into(), options()).await.unwrap();
        assert_eq!(decision.selected_option, Some("a".into()));
        assert!(decision.is_forbidden(&"b".into()));

        let failure = &decision.audit.suppressed_failures[0];
        assert_eq!(failure.judge_id.as_str(), "panicky");
        match &failure.error {
            EvaluationError::Crashed { reason, .. } => assert!(reason.contains("boom")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_excluded_vote_renormalizes() {
        let svc = service(("panicky", panicky), FailurePolicy::ExcludeVote);
        let decision = svc.decide(&"p".into(), options()).await.unwrap();
        assert_eq!(decision.selected_option, Some("a".into()));
        assert!(decision.forbidden_options.is_empty());
        assert!((decision.audit.aggregate_scores[&OptionId::from("b")] - 0.6).abs() < 1e-12);
        assert_eq!(decision.audit.suppressed_failures.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_profile_aborts() {
        let svc = service(("other", steady), FailurePolicy::ExcludeVote);
        let err = svc.evaluate_options(&"missing".into(), options()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::ServiceError::Profile(deme_governance::ProfileConfigError::UnknownProfile(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected_individually() {
        let svc = service(("other", steady), FailurePolicy::ExcludeVote);
        let mut opts = options();
        opts.push(opts[0].clone());
        let decision = svc.decide(&"p".into(), opts).await.unwrap();
        assert_eq!(decision.audit.rejected_options.len(), 1);
        assert_eq!(decision.selected_option, Some("a".into()));
        assert_eq!(decision.ranked_alternatives, vec![OptionId::from("b")]);
    }

    #[test]
    fn test_distinct_ids_keep_first_occurrence() {
        let mut opts = options();
        opts.insert(0, opts[1].clone());
        let ids = distinct_ids(&opts);
        assert_eq!(ids, vec![OptionId::from("b"), OptionId::from("a")]);
    }
}
