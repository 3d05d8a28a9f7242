//! CLI command implementations

pub mod check;
pub mod evaluate;
pub mod profiles;
pub mod transforms;

use std::path::Path;

use anyhow::{Context, Result};
use deme_invariance::TransformCatalog;
use deme_types::{FactRecord, OptionInput};
use serde::Deserialize;

/// An options file holds either full option inputs or bare fact records.
#[derive(Deserialize)]
#[serde(untagged)]
enum OptionsFile {
    Inputs(Vec<OptionInput>),
    Records(Vec<FactRecord>),
}

/// Read options from a JSON or YAML file (by extension; JSON otherwise).
pub fn load_options(path: &Path) -> Result<Vec<OptionInput>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading options file {}", path.display()))?;
    let parsed: OptionsFile = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("parsing options file {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("parsing options file {}", path.display()))?,
    };
    Ok(match parsed {
        OptionsFile::Inputs(inputs) => inputs,
        OptionsFile::Records(records) => records.into_iter().map(OptionInput::new).collect(),
    })
}

/// The catalog at `path`, or the standard catalog.
pub fn load_catalog(path: Option<&Path>) -> Result<TransformCatalog> {
    match path {
        Some(path) => TransformCatalog::load(path)
            .with_context(|| format!("loading transform catalog {}", path.display())),
        None => Ok(TransformCatalog::standard().clone()),
    }
}
