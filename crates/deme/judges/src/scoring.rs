//! Shared scoring helpers used by every judge.
//!
//! Adjustments are collected as labelled terms and summed once, in label
//! order, before being applied to the base score. The order in which a
//! judge discovers its conditions therefore never changes the result.

use deme_types::{EpistemicStatus, EvidenceQuality, FactRecord, Verdict};

/// Lower bound of the epistemic multiplier.
pub const MIN_EPISTEMIC_MULTIPLIER: f64 = 0.5;

pub fn clamp_unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Verdict bucket for a score; see [`Verdict::from_score`].
pub fn verdict_for_score(score: f64) -> Verdict {
    Verdict::from_score(score)
}

/// Labelled, signed score adjustments.
#[derive(Clone, Debug, Default)]
pub struct ScoreTerms {
    terms: Vec<(&'static str, f64)>,
}

impl ScoreTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a penalty (subtracted). Zero-sized terms are skipped.
    pub fn penalty(&mut self, label: &'static str, amount: f64) -> &mut Self {
        self.push(label, -amount)
    }

    /// Record a bonus (added). Zero-sized terms are skipped.
    pub fn bonus(&mut self, label: &'static str, amount: f64) -> &mut Self {
        self.push(label, amount)
    }

    /// Penalty applied only when `condition` holds.
    pub fn penalty_if(&mut self, condition: bool, label: &'static str, amount: f64) -> &mut Self {
        if condition {
            self.penalty(label, amount);
        }
        self
    }

    /// Bonus applied only when `condition` holds.
    pub fn bonus_if(&mut self, condition: bool, label: &'static str, amount: f64) -> &mut Self {
        if condition {
            self.bonus(label, amount);
        }
        self
    }

    fn push(&mut self, label: &'static str, delta: f64) -> &mut Self {
        if delta != 0.0 {
            self.terms.push((label, delta));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in canonical (label, value) order.
    fn canonical(&self) -> Vec<(&'static str, f64)> {
        let mut terms = self.terms.clone();
        terms.sort_by(|a, b| a.0.cmp(b.0).then(a.1.total_cmp(&b.1)));
        terms
    }

    /// Single sum of every term, independent of insertion order.
    pub fn total(&self) -> f64 {
        self.canonical().iter().map(|(_, delta)| delta).sum()
    }

    /// Apply the summed adjustment to `base` in one pass.
    pub fn apply(&self, base: f64) -> f64 {
        base + self.total()
    }

    /// Human-readable reasons, one per term, in canonical order.
    pub fn reasons(&self) -> Vec<String> {
        self.canonical()
            .iter()
            .map(|(label, delta)| format!("{} {:+.3}", label, delta))
            .collect()
    }
}

/// Epistemic penalty for a record: uncertainty, weak evidence and novelty.
pub fn epistemic_penalty(status: &EpistemicStatus) -> f64 {
    let mut terms = ScoreTerms::new();
    terms.penalty("uncertainty", 0.4 * status.uncertainty_level);
    match status.evidence_quality {
        EvidenceQuality::Low => {
            terms.penalty("evidence_low", 0.2);
        }
        EvidenceQuality::Medium => {
            terms.penalty("evidence_medium", 0.1);
        }
        EvidenceQuality::High => {}
    }
    terms.penalty_if(status.novel_situation_flag, "novel_situation", 0.1);
    -terms.total()
}

/// `max(0.5, 1 - epistemic_penalty)`; 1.0 when the record carries no
/// epistemic status.
pub fn epistemic_multiplier(fact: &FactRecord) -> f64 {
    match &fact.epistemic_status {
        Some(status) => (1.0 - epistemic_penalty(status)).max(MIN_EPISTEMIC_MULTIPLIER),
        None => 1.0,
    }
}

/// Base + terms, times the epistemic multiplier, clamped to `[0, 1]`.
pub fn finalize(base: f64, terms: &ScoreTerms, fact: &FactRecord) -> (f64, Vec<String>) {
    let multiplier = epistemic_multiplier(fact);
    let score = clamp_unit(terms.apply(base) * multiplier);
    let mut reasons = vec![format!(
        "base {:.3}, adjustment {:+.3}, epistemic x{:.3}",
        base,
        terms.total(),
        multiplier
    )];
    reasons.extend(terms.reasons());
    (score, reasons)
}
