//! Transform catalog listing

use std::path::Path;

use anyhow::Result;
use deme_invariance::{Transform, TransformOp};
use tabled::Tabled;

use crate::commands::load_catalog;
use crate::output::{self, OutputFormat};

#[derive(Debug, Tabled)]
struct TransformRow {
    name: String,
    kind: String,
    operation: String,
}

impl From<&Transform> for TransformRow {
    fn from(transform: &Transform) -> Self {
        Self {
            name: transform.name.clone(),
            kind: transform.kind.to_string(),
            operation: describe_op(&transform.op),
        }
    }
}

fn describe_op(op: &TransformOp) -> String {
    match op {
        TransformOp::Reverse => "reverse order".into(),
        TransformOp::Rotate(n) => format!("rotate left by {}", n),
        TransformOp::Permutation(p) => format!("permute {:?}", p),
        TransformOp::RelabelPrefix(prefix) => format!("prefix labels with {:?}", prefix),
        TransformOp::RelabelMap(map) => map
            .iter()
            .map(|(from, to)| format!("{} -> {}", from, to))
            .collect::<Vec<_>>()
            .join(", "),
        TransformOp::FactEdits(edits) => edits
            .iter()
            .map(|e| format!("{}.{} = {}", e.option_id, e.field, e.value))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub fn execute(catalog: Option<&Path>, format: OutputFormat) -> Result<()> {
    let catalog = load_catalog(catalog)?;
    let rows: Vec<TransformRow> = catalog.iter().map(TransformRow::from).collect();
    output::print_rows(rows, &catalog, format)
}
