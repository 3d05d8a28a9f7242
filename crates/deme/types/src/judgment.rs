use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::JudgmentError;
use crate::ids::{JudgeId, OptionId};

/// Tolerance for score equality (ties, invariance comparisons).
pub const SCORE_EPSILON: f64 = 1e-9;

/// Ordered verdict scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Forbid,
    Avoid,
    Neutral,
    Prefer,
    StronglyPrefer,
}

impl Verdict {
    /// The verdict bucket implied by a score. Fixed thresholds:
    /// 0.8 / 0.6 / 0.4 / 0.2.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Verdict::StronglyPrefer
        } else if score >= 0.6 {
            Verdict::Prefer
        } else if score >= 0.4 {
            Verdict::Neutral
        } else if score >= 0.2 {
            Verdict::Avoid
        } else {
            Verdict::Forbid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Forbid => "forbid",
            Verdict::Avoid => "avoid",
            Verdict::Neutral => "neutral",
            Verdict::Prefer => "prefer",
            Verdict::StronglyPrefer => "strongly_prefer",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One judge's assessment of one option.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Judgment {
    pub option_id: OptionId,
    pub judge_id: JudgeId,
    pub verdict: Verdict,
    pub score: f64,
    pub hard_veto: bool,
    pub reasons: Vec<String>,
}

impl Judgment {
    /// A scored (non-veto) judgment. The verdict is derived from the score,
    /// so the two can never disagree.
    pub fn scored(
        option_id: OptionId,
        judge_id: JudgeId,
        score: f64,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            option_id,
            judge_id,
            verdict: Verdict::from_score(score),
            score,
            hard_veto: false,
            reasons,
        }
    }

    /// A hard veto: always forbid / 0.0.
    pub fn veto(option_id: OptionId, judge_id: JudgeId, reasons: Vec<String>) -> Self {
        Self {
            option_id,
            judge_id,
            verdict: Verdict::Forbid,
            score: 0.0,
            hard_veto: true,
            reasons,
        }
    }

    /// Validate a judgment received across the service boundary.
    pub fn validate(&self) -> Result<(), JudgmentError> {
        if !self.score.is_finite() || !(0.0..=1.0).contains(&self.score) {
            return Err(JudgmentError::ScoreOutOfRange {
                option_id: self.option_id.clone(),
                judge_id: self.judge_id.clone(),
                score: self.score,
            });
        }
        if self.hard_veto {
            if self.verdict != Verdict::Forbid || self.score != 0.0 {
                return Err(JudgmentError::VetoNotForbidding {
                    option_id: self.option_id.clone(),
                    judge_id: self.judge_id.clone(),
                });
            }
            return Ok(());
        }
        if self.verdict != Verdict::from_score(self.score) {
            return Err(JudgmentError::VerdictMismatch {
                option_id: self.option_id.clone(),
                judge_id: self.judge_id.clone(),
                verdict: self.verdict.to_string(),
                score: self.score,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(Verdict::from_score(1.0), Verdict::StronglyPrefer);
        assert_eq!(Verdict::from_score(0.8), Verdict::StronglyPrefer);
        assert_eq!(Verdict::from_score(0.7999), Verdict::Prefer);
        assert_eq!(Verdict::from_score(0.6), Verdict::Prefer);
        assert_eq!(Verdict::from_score(0.4), Verdict::Neutral);
        assert_eq!(Verdict::from_score(0.2), Verdict::Avoid);
        assert_eq!(Verdict::from_score(0.1999), Verdict::Forbid);
        assert_eq!(Verdict::from_score(0.0), Verdict::Forbid);
    }

    #[test]
    fn verdict_ordering() {
        assert!(Verdict::Forbid < Verdict::Avoid);
        assert!(Verdict::Avoid < Verdict::Neutral);
        assert!(Verdict::Neutral < Verdict::Prefer);
        assert!(Verdict::Prefer < Verdict::StronglyPrefer);
    }

    #[test]
    fn veto_constructor_enforces_invariant() {
        let j = Judgment::veto("a".into(), "universal_floor".into(), vec!["rights".into()]);
        assert_eq!(j.verdict, Verdict::Forbid);
        assert_eq!(j.score, 0.0);
        assert!(j.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inconsistent_verdict() {
        let mut j = Judgment::scored("a".into(), "j".into(), 0.65, vec![]);
        j.verdict = Verdict::StronglyPrefer;
        assert!(matches!(
            j.validate(),
            Err(JudgmentError::VerdictMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_scored_veto() {
        let mut j = Judgment::scored("a".into(), "j".into(), 0.5, vec![]);
        j.hard_veto = true;
        assert!(matches!(
            j.validate(),
            Err(JudgmentError::VetoNotForbidding { .. })
        ));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let j = Judgment {
            option_id: "a".into(),
            judge_id: "j".into(),
            verdict: Verdict::StronglyPrefer,
            score: 1.2,
            hard_veto: false,
            reasons: vec![],
        };
        assert!(matches!(
            j.validate(),
            Err(JudgmentError::ScoreOutOfRange { .. })
        ));
    }

    #[test]
    fn wire_format_uses_snake_case_verdicts() {
        let j = Judgment::scored("a".into(), "j".into(), 0.9, vec![]);
        let json = serde_json::to_string(&j).unwrap();
        assert!(json.contains("\"strongly_prefer\""));
    }
}
