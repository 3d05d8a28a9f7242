//! Evaluation and decision commands

use anyhow::Result;
use colored::Colorize;
use deme_service::DemeService;
use deme_types::{Decision, EvaluationReport, OptionId};
use tabled::Tabled;

use crate::commands::load_options;
use crate::output::{self, print_heading, print_warning, score, OutputFormat};
use crate::OptionsArgs;

#[derive(Debug, Tabled)]
struct JudgmentRow {
    option: String,
    judge: String,
    verdict: String,
    score: String,
    veto: String,
    reasons: String,
}

#[derive(Debug, Tabled)]
struct FailureRow {
    option: String,
    judge: String,
    error: String,
}

#[derive(Debug, Tabled)]
struct RejectedRow {
    option: String,
    error: String,
}

#[derive(Debug, Tabled)]
struct DecisionRow {
    rank: String,
    option: String,
    standing: String,
    score: String,
    judges: String,
}

#[derive(Debug, Tabled)]
struct VetoRow {
    option: String,
    judge: String,
    reasons: String,
}

pub async fn evaluate(args: &OptionsArgs, service: &DemeService, format: OutputFormat) -> Result<()> {
    let options = load_options(&args.options)?;
    let report = service
        .evaluate_options(&args.profile.as_str().into(), options)
        .await?;
    if format != OutputFormat::Table {
        return output::print_single(&report, format);
    }
    print_report(&report)
}

pub async fn decide(args: &OptionsArgs, service: &DemeService, format: OutputFormat) -> Result<()> {
    let options = load_options(&args.options)?;
    let decision = service.decide(&args.profile.as_str().into(), options).await?;
    if format != OutputFormat::Table {
        return output::print_single(&decision, format);
    }
    print_decision(&decision)
}

fn print_report(report: &EvaluationReport) -> Result<()> {
    let rows: Vec<JudgmentRow> = report
        .judgments
        .iter()
        .map(|j| JudgmentRow {
            option: j.option_id.to_string(),
            judge: j.judge_id.to_string(),
            verdict: j.verdict.to_string(),
            score: format!("{:.3}", j.score),
            veto: if j.hard_veto { "yes".red().to_string() } else { "no".into() },
            reasons: j.reasons.join("; "),
        })
        .collect();
    output::print_rows(rows, report, OutputFormat::Table)?;

    if !report.failures.is_empty() {
        print_heading("Failures");
        let rows: Vec<FailureRow> = report
            .failures
            .iter()
            .map(|f| FailureRow {
                option: f.option_id.to_string(),
                judge: f.judge_id.to_string(),
                error: f.error.to_string(),
            })
            .collect();
        output::print_rows(rows, &report.failures, OutputFormat::Table)?;
    }
    print_rejected(report.rejected.iter().map(|r| (&r.option_id, r.error.to_string())))
}

fn print_rejected<'a>(rejected: impl Iterator<Item = (&'a OptionId, String)>) -> Result<()> {
    let rows: Vec<RejectedRow> = rejected
        .map(|(id, error)| RejectedRow {
            option: id.to_string(),
            error,
        })
        .collect();
    if !rows.is_empty() {
        print_heading("Rejected");
        println!("{}", tabled::Table::new(rows));
    }
    Ok(())
}

fn print_decision(decision: &Decision) -> Result<()> {
    let audit = &decision.audit;
    let judges_of = |id: &OptionId| {
        audit
            .per_judge_scores
            .get(id)
            .map(|scores| {
                scores
                    .iter()
                    .map(|(judge, s)| format!("{}={:.3}", judge, s))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    };

    let mut rows: Vec<DecisionRow> = decision
        .ranking()
        .iter()
        .enumerate()
        .map(|(i, id)| DecisionRow {
            rank: (i + 1).to_string(),
            option: id.to_string(),
            standing: if i == 0 && decision.selected_option.is_some() {
                "selected".green().bold().to_string()
            } else {
                "alternative".into()
            },
            score: score(audit.aggregate_scores.get(id).copied()),
            judges: judges_of(id),
        })
        .collect();
    rows.extend(decision.forbidden_options.iter().map(|id| DecisionRow {
        rank: "-".into(),
        option: id.to_string(),
        standing: "forbidden".red().to_string(),
        score: score(audit.aggregate_scores.get(id).copied()),
        judges: judges_of(id),
    }));
    output::print_rows(rows, decision, OutputFormat::Table)?;

    if !audit.vetoes.is_empty() {
        print_heading("Vetoes");
        let rows: Vec<VetoRow> = audit
            .vetoes
            .iter()
            .map(|v| VetoRow {
                option: v.option_id.to_string(),
                judge: v.judge_id.to_string(),
                reasons: v.reasons.join("; "),
            })
            .collect();
        output::print_rows(rows, &audit.vetoes, OutputFormat::Table)?;
    }
    print_rejected(
        audit
            .rejected_options
            .iter()
            .map(|r| (&r.option_id, r.error.to_string())),
    )?;

    println!();
    println!("{} {}", "Deciding layer:".bold(), audit.deciding_layer);
    if audit.tie_broken {
        let tied: Vec<String> = audit.tied_options.iter().map(|o| o.to_string()).collect();
        print_warning(&format!("tie broken among {}", tied.join(", ")));
    }
    println!("{} {}", "Rationale:".bold(), decision.rationale);
    Ok(())
}
