//! Distributive-justice judge.

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

    let jf = &fact.justice_and_fairness;
    let mut t = ScoreTerms::new();
    t.penalty_if(jf.discriminates_on_protected_attr, "discrimination", 0.70)
        .penalty_if(jf.exploits_vulnerable_population, "exploits_vulnerable", 0.40)
        .penalty_if(jf.exacerbates_power_imbalance, "power_imbalance", 0.15)
        .bonus_if(jf.prioritizes_most_disadvantaged, "prioritizes_disadvantaged", 0.15);
    if jf.distributes_burdens_fairly {
        t.bonus("fair_burdens", 0.10);
    } else {
        t.penalty("unfair_burdens", 0.15);
    }

    if let Some(s) = &fact.societal_and_environmental {
        t.penalty("burden_on_vulnerable", 0.30 * s.burden_on_vulnerable_groups);
    }

    let (score, reasons) = finalize(0.7, &t, fact);
    Ok(Judgment::scored(
        fact.option_id.clone(),
        judge_id.clone(),
        score,
        reasons,
    ))
}
