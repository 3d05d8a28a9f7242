//! Outcome-focused judge: net benefit, amplified by urgency and scale,
//! adjusted for societal and environmental effects.

use deme_types::{EvaluationError, FactRecord, JudgeId, Judgment};

use super::require_valid;
use crate::registry::JudgeContext;
use crate::scoring::{finalize, ScoreTerms};

/// Affected-party count at which the scale factor saturates.
const SCALE_SATURATION: f64 = 1000.0;

/// `ln(1 + n) / ln(1 + saturation)`, capped at 1.
fn scale_factor(affected_count: u32) -> f64 {
    let n = f64::from(affected_count);
    ((1.0 + n).ln() / (1.0 + SCALE_SATURATION).ln()).min(1.0)
}

pub fn judge(
    judge_id: &JudgeId,
    fact: &FactRecord,
    _ctx: &JudgeContext,
) -> Result<Judgment, EvaluationError> {
    require_valid(judge_id, fact)?;

    let c = &fact.consequences;
    let net = c.expected_benefit - c.expected_harm;

    let mut t = ScoreTerms::new();
    t.bonus("expected_benefit", 0.5 * c.expected_benefit)
        .penalty("expected_harm", 0.5 * c.expected_harm)
        .bonus("urgency", 0.2 * c.urgency * net)
        .bonus("scale", 0.1 * scale_factor(c.affected_count) * net);

    if let Some(s) = &fact.societal_and_environmental {
        t.penalty("environmental_harm", 0.2 * s.environmental_harm)
            .penalty("long_term_societal_risk", 0.2 * s.long_term_societal_risk)
            .penalty("burden_on_vulnerable", 0.1 * s.burden_on_vulnerable_groups)
            .bonus("future_generations", 0.15 * s.benefits_to_future_generations);
    }

    let (score, reasons) = finalize(0.5, &t, fact);
    Ok(Judgment::scored(
        fact.option_id.clone(),
        judge_id.clone(),
        score,
        reasons,
    ))
}
