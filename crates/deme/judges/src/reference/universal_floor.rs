//! The universal floor: the baseline every profile runs.
//!
//! 1. Hard-veto predicates (rights violation, protected-attribute
//!    discrimination, plus any the profile activates). Any hit
//!    short-circuits to forbid / 0.0.
//! 2. Base 1.0 adjusted by the single sum of all penalty and bonus terms.
//! 3. Epistemic multiplier `max(0.5, 1 - penalty)`.
//! 4. Clamp, then verdict by the fixed thresholds.

use deme_types::{EvaluationError, FactRecord, JudgeId, Judgment};
use tracing::info;

use super::require_valid;
use crate::registry::JudgeContext;
use crate::scoring::{finalize, ScoreTerms};
use crate::veto::VetoPredicate;

/// Predicates that fire for this record, floor set first, then the
/// profile's extra predicates in their canonical order.
pub fn triggered_vetoes(fact: &FactRecord, ctx: &JudgeContext) -> Vec<VetoPredicate> {
    let mut fired: Vec<VetoPredicate> = VetoPredicate::FLOOR
        .iter()
        .copied()
        .filter(|p| p.holds(fact))
        .collect();
    for predicate in ctx.vetoes.iter() {
        if !fired.contains(predicate) && predicate.holds(fact) {
            fired.push(*predicate);
        }
    }
    fired
}

pub fn judge(
    judge_id: &JudgeId,
    fact: &FactRecord,
    ctx: &JudgeContext,
) -> Result<Judgment, EvaluationError> {
    require_valid(judge_id, fact)?;

    let fired = triggered_vetoes(fact, ctx);
    if !fired.is_empty() {
        info!(
            judge_id = %judge_id,
            option_id = %fact.option_id,
            predicates = ?fired.iter().map(VetoPredicate::as_str).collect::<Vec<_>>(),
            "Hard veto"
        );
        let reasons = fired
            .iter()
            .map(|p| format!("hard veto: {}", p.as_str()))
            .collect();
        return Ok(Judgment::veto(fact.option_id.clone(), judge_id.clone(), reasons));
    }

    let (score, reasons) = finalize(1.0, &terms(fact), fact);
    Ok(Judgment::scored(
        fact.option_id.clone(),
        judge_id.clone(),
        score,
        reasons,
    ))
}

fn terms(fact: &FactRecord) -> ScoreTerms {
    let mut t = ScoreTerms::new();

    let rd = &fact.rights_and_duties;
    t.penalty_if(!rd.has_valid_consent, "no_valid_consent", 0.20)
        .penalty_if(rd.violates_explicit_rule, "violates_explicit_rule", 0.25)
        .penalty_if(rd.role_duty_conflict, "role_duty_conflict", 0.10);

    let jf = &fact.justice_and_fairness;
    t.penalty_if(jf.exploits_vulnerable_population, "exploits_vulnerable", 0.30)
        .penalty_if(jf.exacerbates_power_imbalance, "power_imbalance", 0.10)
        .penalty_if(!jf.distributes_burdens_fairly, "unfair_burdens", 0.10)
        .bonus_if(jf.prioritizes_most_disadvantaged, "prioritizes_disadvantaged", 0.05);

    if let Some(a) = &fact.autonomy_and_agency {
        t.penalty_if(a.coercion_or_undue_influence, "coercion", 0.25)
            .penalty_if(a.manipulative_design_present, "manipulative_design", 0.15)
            .penalty_if(!a.can_withdraw_without_penalty, "no_withdrawal", 0.10)
            .penalty_if(!a.has_meaningful_choice, "no_meaningful_choice", 0.10);
    }

    if let Some(p) = &fact.privacy_and_data {
        t.penalty("privacy_invasion", 0.20 * p.privacy_invasion_level)
            .penalty("reidentification_risk", 0.10 * p.reidentification_risk)
            .penalty_if(p.secondary_use_without_consent, "secondary_use", 0.15)
            .penalty_if(p.data_retention_excessive, "excessive_retention", 0.05)
            .penalty_if(!p.data_minimization_respected, "no_data_minimization", 0.05);
    }

    if let Some(s) = &fact.societal_and_environmental {
        t.penalty("environmental_harm", 0.15 * s.environmental_harm)
            .penalty("long_term_societal_risk", 0.15 * s.long_term_societal_risk)
            .penalty("burden_on_vulnerable", 0.15 * s.burden_on_vulnerable_groups)
            .bonus("future_generations", 0.05 * s.benefits_to_future_generations);
    }

    if let Some(v) = &fact.virtue_and_care {
        t.penalty_if(v.betrays_trust, "betrays_trust", 0.15)
            .penalty_if(!v.respects_person_as_end, "treats_person_as_means", 0.15)
            .bonus_if(v.expresses_compassion, "compassion", 0.05);
    }

    if let Some(p) = &fact.procedural_legitimacy {
        t.penalty_if(!p.followed_approved_procedures, "procedures_skipped", 0.10)
            .penalty_if(!p.contestation_available, "no_contestation", 0.05);
    }

    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use deme_types::{AutonomyAndAgency, Verdict};

    fn run(fact: &FactRecord, ctx: &JudgeContext) -> Judgment {
        judge(&"universal_floor".into(), fact, ctx).unwrap()
    }

    #[test]
    fn clean_record_strongly_preferred() {
        let judgment = run(&crate::tests::fact("a"), &JudgeContext::default());
        assert!(!judgment.hard_veto);
        assert_eq!(judgment.verdict, Verdict::StronglyPrefer);
        assert!(judgment.validate().is_ok());
    }

    #[test]
    fn rights_violation_vetoes() {
        let mut fact = crate::tests::fact("a");
        fact.rights_and_duties.violates_rights = true;
        let judgment = run(&fact, &JudgeContext::default());
        assert!(judgment.hard_veto);
        assert_eq!(judgment.score, 0.0);
        assert_eq!(judgment.reasons, vec!["hard veto: rights_violation".to_string()]);
    }

    #[test]
    fn discrimination_vetoes() {
        let mut fact = crate::tests::fact("a");
        fact.justice_and_fairness.discriminates_on_protected_attr = true;
        let judgment = run(&fact, &JudgeContext::default());
        assert!(judgment.hard_veto);
        assert!(judgment.reasons[0].contains("protected_attribute_discrimination"));
    }

    #[test]
    fn profile_vetoes_extend_the_floor() {
        let mut fact = crate::tests::fact("a");
        fact.autonomy_and_agency = Some(AutonomyAndAgency {
            has_meaningful_choice: true,
            coercion_or_undue_influence: true,
            can_withdraw_without_penalty: true,
            manipulative_design_present: false,
        });
        assert!(!run(&fact, &JudgeContext::default()).hard_veto);

        let ctx = JudgeContext::with_vetoes([VetoPredicate::CoercionOrUndueInfluence]);
        assert!(run(&fact, &ctx).hard_veto);
    }

    #[test]
    fn penalties_accumulate_once() {
        let mut fact = crate::tests::fact("a");
        fact.rights_and_duties.has_valid_consent = false;
        fact.rights_and_duties.violates_explicit_rule = true;
        fact.justice_and_fairness.prioritizes_most_disadvantaged = false;
        let judgment = run(&fact, &JudgeContext::default());
        // 1.0 - 0.20 - 0.25 = 0.55, no epistemic status on the fixture
        assert!((judgment.score - 0.55).abs() < 1e-12);
        assert_eq!(judgment.verdict, Verdict::Neutral);
    }

    #[test]
    fn malformed_record_is_evaluation_error() {
        let mut fact = crate::tests::fact("a");
        fact.consequences.expected_benefit = -0.1;
        let err = judge(&"universal_floor".into(), &fact, &JudgeContext::default()).unwrap_err();
        assert!(matches!(err, EvaluationError::MalformedFact { .. }));
    }
}
