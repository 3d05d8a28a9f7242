//! Deontic judge: consent, explicit rules, duties, autonomy and
//! procedural legitimacy. Scores only; vetoes belong to the floor.

use deme_types::{EvaluationError, FactRecord, JudgeId, Judgment};

use super::require_valid;
use crate::registry::JudgeContext;
use crate::scoring::{finalize, ScoreTerms};

pub fn judge(
    judge_id: &JudgeId,
    fact: &FactRecord,
    _ctx: &JudgeContext,
) -> Result<Judgment, EvaluationError> {
    require_valid(judge_id, fact)?;

    let rd = &fact.rights_and_duties;
    let mut t = ScoreTerms::new();
    t.penalty_if(rd.violates_rights, "violates_rights", 0.60)
        .penalty_if(!rd.has_valid_consent, "no_valid_consent", 0.30)
        .penalty_if(rd.violates_explicit_rule, "violates_explicit_rule", 0.30)
        .penalty_if(rd.role_duty_conflict, "role_duty_conflict", 0.15);

    if let Some(a) = &fact.autonomy_and_agency {
        t.penalty_if(a.coercion_or_undue_influence, "coercion", 0.30)
            .penalty_if(a.manipulative_design_present, "manipulative_design", 0.20)
            .penalty_if(!a.can_withdraw_without_penalty, "no_withdrawal", 0.15)
            .penalty_if(!a.has_meaningful_choice, "no_meaningful_choice", 0.10);
    }

    if let Some(p) = &fact.procedural_legitimacy {
        t.penalty_if(!p.followed_approved_procedures, "procedures_skipped", 0.15)
            .penalty_if(!p.stakeholders_consulted, "stakeholders_not_consulted", 0.05)
            .penalty_if(!p.decision_is_explainable, "not_explainable", 0.10)
            .penalty_if(!p.contestation_available, "no_contestation", 0.10);
    }

    if let Some(v) = &fact.virtue_and_care {
        t.penalty_if(!v.respects_person_as_end, "treats_person_as_means", 0.20)
            .penalty_if(v.betrays_trust, "betrays_trust", 0.15);
    }

    let (score, reasons) = finalize(1.0, &t, fact);
    Ok(Judgment::scored(
        fact.option_id.clone(),
        judge_id.clone(),
        score,
        reasons,
    ))
}
