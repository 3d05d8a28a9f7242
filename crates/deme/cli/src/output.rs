//! Output formatting utilities

use anyhow::Result;
use colored::*;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Print rows as a table, or the machine-readable value in its place.
pub fn print_rows<T: Tabled, V: Serialize + ?Sized>(
    rows: Vec<T>,
    value: &V,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No results".dimmed());
            } else {
                println!("{}", Table::new(rows));
            }
            Ok(())
        }
        _ => print_single(value, format),
    }
}

/// Print a single item in the specified format
pub fn print_single<T: Serialize + ?Sized>(data: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(data)?);
        }
    }
    Ok(())
}

/// Print a section heading (table output only)
pub fn print_heading(title: &str) {
    println!();
    println!("{}", title.bold().cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print a failure message
pub fn print_failure(message: &str) {
    println!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Format an optional score
pub fn score(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".into())
}
