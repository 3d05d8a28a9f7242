//! Governance profile commands

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use deme_governance::{FailurePolicy, LayerFocus, ProfileSummary};
use deme_service::DemeService;
use tabled::Tabled;

use crate::output::{self, print_heading, OutputFormat};

/// Profile subcommands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List loaded profiles
    List,

    /// Show one profile, layers in processing order
    Show {
        /// Profile ID
        profile_id: String,
    },
}

/// Table row for profile listing
#[derive(Debug, Tabled)]
struct ProfileRow {
    id: String,
    stakeholder: String,
    domain: String,
    mode: String,
}

impl From<ProfileSummary> for ProfileRow {
    fn from(summary: ProfileSummary) -> Self {
        Self {
            id: summary.profile_id.to_string(),
            stakeholder: summary.stakeholder_label,
            domain: summary.domain,
            mode: summary.override_mode.to_string(),
        }
    }
}

/// Table row for one lexical layer
#[derive(Debug, Tabled)]
struct LayerRow {
    order: usize,
    layer: String,
    focus: &'static str,
    hard_stop: String,
    weight: String,
    members: String,
}

pub fn execute(command: ProfileCommands, service: &DemeService, format: OutputFormat) -> Result<()> {
    match command {
        ProfileCommands::List => {
            let summaries = service.list_profiles();
            let rows: Vec<ProfileRow> = summaries.iter().cloned().map(ProfileRow::from).collect();
            output::print_rows(rows, &summaries, format)
        }
        ProfileCommands::Show { profile_id } => {
            let profile = service.profile(&profile_id.into())?;
            if format != OutputFormat::Table {
                return output::print_single(profile.as_ref(), format);
            }

            println!("{} {}", "Profile".bold(), profile.profile_id.to_string().cyan());
            println!("  stakeholder:      {}", profile.stakeholder_label);
            println!("  domain:           {}", profile.domain);
            println!("  override mode:    {}", profile.override_mode);
            println!("  acceptance floor: {}", profile.acceptance_floor);
            println!("  tie break:        {}", profile.tie_break.describe());
            println!(
                "  failure policy:   {}",
                match profile.failure_policy {
                    FailurePolicy::ExcludeVote => "exclude_vote",
                    FailurePolicy::ConservativeVeto => "conservative_veto",
                }
            );
            let vetoes: Vec<&str> = profile.hard_vetoes.iter().map(|v| v.as_str()).collect();
            println!(
                "  hard vetoes:      {}",
                if vetoes.is_empty() { "-".to_string() } else { vetoes.join(", ") }
            );

            print_heading("Layers");
            let rows: Vec<LayerRow> = profile
                .ordered_layers()
                .into_iter()
                .enumerate()
                .map(|(i, layer)| LayerRow {
                    order: i + 1,
                    layer: layer.name.clone(),
                    focus: match layer.focus {
                        LayerFocus::Rights => "rights",
                        LayerFocus::Consequences => "consequences",
                        LayerFocus::General => "general",
                    },
                    hard_stop: if layer.hard_stop { "yes".into() } else { "no".into() },
                    weight: format!("{}", layer.weight),
                    members: layer
                        .members
                        .iter()
                        .map(|m| format!("{} ({})", m, profile.weight_of(m)))
                        .collect::<Vec<_>>()
                        .join(", "),
                })
                .collect();
            output::print_rows(rows, profile.as_ref(), format)
        }
    }
}
