use std::collections::{BTreeMap, BTreeSet};

use deme_types::{
    Decision, DecisionAudit, EvaluationReport, JudgeFailure, JudgeId, Judgment, LayerTrace,
    OptionId, VetoRecord, SCORE_EPSILON,
};
use tracing::{debug, info, instrument, warn};

use crate::error::AggregationError;
use crate::profile::{FailurePolicy, GovernanceProfile, LexicalLayer};

/// `deciding_layer` value when the veto pass alone settled the decision.
pub const HARD_VETO: &str = "hard_veto";

/// `deciding_layer` value when the final ranking settled the decision.
pub const CUMULATIVE_SCORE: &str = "cumulative_score";

type JudgmentMatrix = BTreeMap<OptionId, BTreeMap<JudgeId, Judgment>>;

/// Aggregator: combines a judgment matrix into one [`Decision`] under a
/// governance profile.
///
/// The result depends only on the set of judgments, never on their
/// arrival order: judgments are indexed into ordered maps first, layer
/// sums run in judge id order, and ties are broken by the profile's
/// tie-break rule.
pub struct Aggregator;

impl Aggregator {
    /// Decide among `option_ids` using everything the judge stage
    /// reported.
    ///
    /// Options listed in `report.rejected` with no judgments or failures
    /// are not candidates; they are carried into the audit. Judge
    /// failures are handled by the profile's [`FailurePolicy`] and
    /// recorded in `audit.suppressed_failures`.
    #[instrument(skip_all, fields(profile_id = %profile.profile_id, options = option_ids.len()))]
    pub fn decide(
        profile: &GovernanceProfile,
        option_ids: &[OptionId],
        report: &EvaluationReport,
    ) -> Result<Decision, AggregationError> {
        profile.check_weights()?;

        let mut known = BTreeSet::new();
        for id in option_ids {
            if !known.insert(id.clone()) {
                return Err(AggregationError::DuplicateOption(id.clone()));
            }
        }

        let mut audit = DecisionAudit::default();
        let mut matrix = index_judgments(&known, &report.judgments)?;
        for (option_id, judgments) in &matrix {
            audit.per_judge_scores.insert(
                option_id.clone(),
                judgments.iter().map(|(j, jd)| (j.clone(), jd.score)).collect(),
            );
        }
        apply_failure_policy(profile, &known, &report.failures, &mut matrix, &mut audit)?;

        // Candidates, in id order
        let rejected_ids: BTreeSet<&OptionId> =
            report.rejected.iter().map(|r| &r.option_id).collect();
        let candidates: BTreeSet<OptionId> = known
            .into_iter()
            .filter(|id| !rejected_ids.contains(&id) || matrix.contains_key(id))
            .collect();
        let mut rejected = report.rejected.clone();
        rejected.sort_by(|a, b| a.option_id.cmp(&b.option_id));
        audit.rejected_options = rejected;

        let members = profile.member_judges();
        let failed: BTreeSet<(&OptionId, &JudgeId)> = audit
            .suppressed_failures
            .iter()
            .map(|f| (&f.option_id, &f.judge_id))
            .collect();
        let mut missing = Vec::new();
        for option_id in &candidates {
            for judge_id in &members {
                let judged = matrix
                    .get(option_id)
                    .is_some_and(|m| m.contains_key(judge_id));
                if !judged && !failed.contains(&(option_id, judge_id)) {
                    missing.push((option_id.clone(), judge_id.clone()));
                }
            }
        }
        audit.missing_judgments = missing;

        // Hard-veto pass
        let mut forbidden = BTreeSet::new();
        for option_id in &candidates {
            let Some(judgments) = matrix.get(option_id) else {
                continue;
            };
            for judgment in judgments.values().filter(|j| j.hard_veto) {
                warn!(
                    option_id = %option_id,
                    judge_id = %judgment.judge_id,
                    "Hard veto fired"
                );
                forbidden.insert(option_id.clone());
                audit.vetoes.push(VetoRecord {
                    option_id: option_id.clone(),
                    judge_id: judgment.judge_id.clone(),
                    reasons: judgment.reasons.clone(),
                });
            }
        }
        audit.veto_triggered = !audit.vetoes.is_empty();

        let mut live: Vec<OptionId> = candidates
            .iter()
            .filter(|id| !forbidden.contains(*id))
            .cloned()
            .collect();

        if live.is_empty() {
            audit.deciding_layer = if audit.veto_triggered {
                HARD_VETO.to_string()
            } else {
                CUMULATIVE_SCORE.to_string()
            };
            let rationale = if candidates.is_empty() {
                "No permissible option: no candidate options were supplied.".to_string()
            } else {
                format!(
                    "No permissible option: every candidate was vetoed ({}).",
                    describe_vetoes(&audit.vetoes)
                )
            };
            info!(forbidden = forbidden.len(), "No permissible option");
            return Ok(Decision {
                profile_id: profile.profile_id.clone(),
                selected_option: None,
                forbidden_options: forbidden,
                ranked_alternatives: Vec::new(),
                rationale,
                audit,
            });
        }
        let survived_vetoes = live.len();

        // Lexical layer pass
        let mut received: BTreeMap<OptionId, Vec<(f64, f64)>> = BTreeMap::new();
        let mut last_cut: Option<(String, BTreeSet<OptionId>)> = None;
        for layer in profile.ordered_layers() {
            let scores: BTreeMap<OptionId, f64> = live
                .iter()
                .filter_map(|id| {
                    layer_score(profile, layer, matrix.get(id)).map(|s| (id.clone(), s))
                })
                .collect();

            let mut eliminated = BTreeSet::new();
            if layer.hard_stop {
                // Options without a layer score never pass the gate.
                let passing: BTreeSet<&OptionId> = scores
                    .iter()
                    .filter(|(_, s)| **s > profile.acceptance_floor)
                    .map(|(id, _)| id)
                    .collect();
                let failing: BTreeSet<OptionId> = live
                    .iter()
                    .filter(|id| !passing.contains(id))
                    .cloned()
                    .collect();
                if !passing.is_empty() && !failing.is_empty() {
                    live.retain(|id| !failing.contains(id));
                    eliminated = failing;
                    info!(
                        layer = %layer.name,
                        eliminated = eliminated.len(),
                        remaining = live.len(),
                        "Hard-stop layer eliminated options"
                    );
                    last_cut = Some((layer.name.clone(), eliminated.clone()));
                }
            }

            for (id, score) in &scores {
                if !eliminated.contains(id) {
                    received
                        .entry(id.clone())
                        .or_default()
                        .push((layer.weight, *score));
                }
            }
            debug!(layer = %layer.name, scored = scores.len(), "Layer processed");
            audit.layers.push(LayerTrace {
                name: layer.name.clone(),
                hard_stop: layer.hard_stop,
                scores,
                eliminated,
            });
        }

        // Final ranking
        let mut ranked: Vec<(OptionId, f64)> = live
            .iter()
            .map(|id| {
                let score = cumulative_score(received.get(id).map(Vec::as_slice).unwrap_or(&[]));
                (id.clone(), score)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| profile.tie_break.compare(&a.0, &b.0))
        });
        let (order, top_cluster) = resolve_ties(profile, ranked.clone());

        audit.aggregate_scores = ranked.iter().cloned().collect();
        audit.tie_broken = top_cluster.len() > 1;
        if audit.tie_broken {
            audit.tied_options = top_cluster;
        }
        audit.deciding_layer = if audit.veto_triggered && survived_vetoes == 1 {
            HARD_VETO.to_string()
        } else if let Some((name, _)) = &last_cut {
            name.clone()
        } else {
            CUMULATIVE_SCORE.to_string()
        };

        let mut order = order.into_iter();
        let selected = order.next();
        let ranked_alternatives: Vec<OptionId> = order.collect();
        let rationale = rationale(
            profile,
            selected.as_ref(),
            &audit,
            last_cut.as_ref().map(|(name, cut)| (name.as_str(), cut)),
        );

        info!(
            selected = selected.as_ref().map(|s| s.as_str()).unwrap_or("none"),
            deciding_layer = %audit.deciding_layer,
            forbidden = forbidden.len(),
            tie_broken = audit.tie_broken,
            "Decision reached"
        );

        Ok(Decision {
            profile_id: profile.profile_id.clone(),
            selected_option: selected,
            forbidden_options: forbidden,
            ranked_alternatives,
            rationale,
            audit,
        })
    }

    /// Decide from a bare judgment list with no failures or rejections.
    pub fn decide_judgments(
        profile: &GovernanceProfile,
        option_ids: &[OptionId],
        judgments: &[Judgment],
    ) -> Result<Decision, AggregationError> {
        Self::decide(
            profile,
            option_ids,
            &EvaluationReport::from_judgments(judgments.to_vec()),
        )
    }
}

fn index_judgments(
    known: &BTreeSet<OptionId>,
    judgments: &[Judgment],
) -> Result<JudgmentMatrix, AggregationError> {
    let mut matrix = JudgmentMatrix::new();
    for judgment in judgments {
        judgment.validate()?;
        if !known.contains(&judgment.option_id) {
            return Err(AggregationError::UnknownOption {
                option_id: judgment.option_id.clone(),
                judge_id: judgment.judge_id.clone(),
            });
        }
        let row = matrix.entry(judgment.option_id.clone()).or_default();
        if row
            .insert(judgment.judge_id.clone(), judgment.clone())
            .is_some()
        {
            return Err(AggregationError::DuplicateJudgment {
                option_id: judgment.option_id.clone(),
                judge_id: judgment.judge_id.clone(),
            });
        }
    }
    Ok(matrix)
}

fn apply_failure_policy(
    profile: &GovernanceProfile,
    known: &BTreeSet<OptionId>,
    failures: &[JudgeFailure],
    matrix: &mut JudgmentMatrix,
    audit: &mut DecisionAudit,
) -> Result<(), AggregationError> {
    let mut failures = failures.to_vec();
    failures.sort_by(|a, b| {
        (&a.option_id, &a.judge_id).cmp(&(&b.option_id, &b.judge_id))
    });

    let mut seen = BTreeSet::new();
    for failure in failures {
        let duplicate = || AggregationError::DuplicateJudgment {
            option_id: failure.option_id.clone(),
            judge_id: failure.judge_id.clone(),
        };
        if !known.contains(&failure.option_id) {
            return Err(AggregationError::UnknownOption {
                option_id: failure.option_id.clone(),
                judge_id: failure.judge_id.clone(),
            });
        }
        if !seen.insert((failure.option_id.clone(), failure.judge_id.clone())) {
            return Err(duplicate());
        }
        let row = matrix.entry(failure.option_id.clone()).or_default();
        if row.contains_key(&failure.judge_id) {
            return Err(duplicate());
        }
        match profile.failure_policy {
            FailurePolicy::ConservativeVeto => {
                warn!(
                    option_id = %failure.option_id,
                    judge_id = %failure.judge_id,
                    error = %failure.error,
                    "Judge failure converted to veto"
                );
                row.insert(
                    failure.judge_id.clone(),
                    Judgment::veto(
                        failure.option_id.clone(),
                        failure.judge_id.clone(),
                        vec![format!("evaluation failed: {}", failure.error)],
                    ),
                );
            }
            FailurePolicy::ExcludeVote => {
                warn!(
                    option_id = %failure.option_id,
                    judge_id = %failure.judge_id,
                    error = %failure.error,
                    "Judge failure excluded from scoring"
                );
            }
        }
        audit.suppressed_failures.push(failure);
    }
    matrix.retain(|_, row| !row.is_empty());
    Ok(())
}

/// Weighted mean of the layer members' scores, renormalized over the
/// members that produced a judgment with positive weight. `None` when no
/// such member exists.
fn layer_score(
    profile: &GovernanceProfile,
    layer: &LexicalLayer,
    judgments: Option<&BTreeMap<JudgeId, Judgment>>,
) -> Option<f64> {
    let judgments = judgments?;
    let members: BTreeSet<&JudgeId> = layer.members.iter().collect();
    let (mut weighted, mut total) = (0.0, 0.0);
    for judge_id in members {
        let Some(judgment) = judgments.get(judge_id) else {
            continue;
        };
        let weight = profile.weight_of(judge_id);
        if weight > 0.0 {
            weighted += weight * judgment.score;
            total += weight;
        }
    }
    (total > 0.0).then(|| weighted / total)
}

/// Layer-weight-weighted mean of `(layer_weight, layer_score)` pairs, in
/// layer processing order.
fn cumulative_score(received: &[(f64, f64)]) -> f64 {
    let (weighted, total) = received
        .iter()
        .fold((0.0, 0.0), |(w, t), (lw, s)| (w + lw * s, t + lw));
    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

/// Group options whose consecutive scores differ by at most epsilon and
/// order each group by the tie-break. Returns the final order and the
/// top group.
fn resolve_ties(
    profile: &GovernanceProfile,
    ranked: Vec<(OptionId, f64)>,
) -> (Vec<OptionId>, Vec<OptionId>) {
    let mut order = Vec::with_capacity(ranked.len());
    let mut top = Vec::new();
    let mut start = 0;
    while start < ranked.len() {
        let mut end = start + 1;
        while end < ranked.len() && (ranked[end - 1].1 - ranked[end].1).abs() <= SCORE_EPSILON {
            end += 1;
        }
        let mut cluster: Vec<OptionId> = ranked[start..end].iter().map(|(id, _)| id.clone()).collect();
        cluster.sort_by(|a, b| profile.tie_break.compare(a, b));
        if start == 0 {
            top = cluster.clone();
        }
        order.extend(cluster);
        start = end;
    }
    (order, top)
}

fn describe_vetoes(vetoes: &[VetoRecord]) -> String {
    let mut by_option: BTreeMap<&OptionId, Vec<&str>> = BTreeMap::new();
    for veto in vetoes {
        by_option
            .entry(&veto.option_id)
            .or_default()
            .push(veto.judge_id.as_str());
    }
    by_option
        .iter()
        .map(|(option, judges)| format!("{} by {}", option, judges.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn rationale(
    profile: &GovernanceProfile,
    selected: Option<&OptionId>,
    audit: &DecisionAudit,
    last_cut: Option<(&str, &BTreeSet<OptionId>)>,
) -> String {
    let Some(selected) = selected else {
        return "No permissible option.".to_string();
    };
    let score = audit.aggregate_scores.get(selected).copied().unwrap_or(0.0);
    let mut parts = vec![format!(
        "Selected {} under profile {} with cumulative score {:.3} (deciding layer: {}).",
        selected, profile.profile_id, score, audit.deciding_layer
    )];
    if audit.veto_triggered {
        parts.push(format!("Vetoed: {}.", describe_vetoes(&audit.vetoes)));
    }
    if let Some((name, cut)) = last_cut {
        let cut: Vec<&str> = cut.iter().map(|o| o.as_str()).collect();
        parts.push(format!(
            "Layer {} eliminated {} at floor {:.3}.",
            name,
            cut.join(", "),
            profile.acceptance_floor
        ));
    }
    if audit.tie_broken {
        let tied: Vec<&str> = audit.tied_options.iter().map(|o| o.as_str()).collect();
        parts.push(format!(
            "Tie among {} broken by {} order.",
            tied.join(", "),
            profile.tie_break.describe()
        ));
    }
    if !audit.suppressed_failures.is_empty() {
        parts.push(format!(
            "{} judge failure(s) handled by policy {:?}.",
            audit.suppressed_failures.len(),
            profile.failure_policy
        ));
    }
    parts.join(" ")
}
