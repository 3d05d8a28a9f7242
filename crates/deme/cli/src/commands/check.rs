//! Invariance checking command

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use deme_invariance::{CheckState, InvarianceReport};
use deme_service::DemeService;
use tabled::Tabled;

use crate::commands::{load_catalog, load_options};
use crate::output::{self, print_failure, print_success, OutputFormat};
use crate::OptionsArgs;

#[derive(Debug, Tabled)]
struct CheckRow {
    transform: String,
    kind: String,
    outcome: String,
    detail: String,
}

impl From<&InvarianceReport> for CheckRow {
    fn from(report: &InvarianceReport) -> Self {
        let (outcome, detail) = match &report.outcome {
            CheckState::Pass => ("pass".green().to_string(), "decisions match".to_string()),
            CheckState::Fail { witness } => ("fail".red().bold().to_string(), witness.describe()),
            CheckState::Changed { attribution } => {
                let changes: Vec<String> = attribution
                    .changes
                    .iter()
                    .map(|c| {
                        let show = |v: &Option<deme_types::FieldValue>| {
                            v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".into())
                        };
                        format!("{}.{}: {} -> {}", c.option_id, c.field, show(&c.before), show(&c.after))
                    })
                    .collect();
                (
                    "changed".yellow().to_string(),
                    format!("{}; {}", changes.join(", "), attribution.witness.describe()),
                )
            }
            other => (other.name().to_string(), String::new()),
        };
        Self {
            transform: report.transform.clone(),
            kind: report.kind.to_string(),
            outcome,
            detail,
        }
    }
}

/// Fails when any bond-preserving transform moved the decision.
pub fn execute(
    args: &OptionsArgs,
    catalog: Option<&Path>,
    service: &DemeService,
    format: OutputFormat,
) -> Result<()> {
    let options = load_options(&args.options)?;
    let catalog = load_catalog(catalog)?;
    let reports = service.check_invariance(&args.profile.as_str().into(), &options, &catalog)?;

    let rows: Vec<CheckRow> = reports.iter().map(CheckRow::from).collect();
    output::print_rows(rows, &reports, format)?;

    let violations = reports.iter().filter(|r| r.violation().is_some()).count();
    if violations > 0 {
        if format == OutputFormat::Table {
            print_failure(&format!("{} of {} checks failed", violations, reports.len()));
        }
        bail!("{} invariance violation(s)", violations);
    }
    if format == OutputFormat::Table {
        print_success(&format!("no invariance violations in {} checks", reports.len()));
    }
    Ok(())
}
