use std::path::Path;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::InvarianceError;
use crate::transform::{Transform, TransformKind};

/// Prefix used by the standard relabeling transform.
pub const STANDARD_RELABEL_PREFIX: &str = "relabeled-";

lazy_static! {
    static ref STANDARD: TransformCatalog = TransformCatalog {
        transforms: vec![
            Transform::reverse(),
            Transform::rotate(1),
            Transform::relabel_prefix(STANDARD_RELABEL_PREFIX),
        ],
    };
}

/// Read-only list of transforms, looked up by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformCatalog {
    #[serde(default, rename = "transform")]
    pub transforms: Vec<Transform>,
}

impl TransformCatalog {
    /// The process-wide standard catalog of bond-preserving transforms.
    pub fn standard() -> &'static TransformCatalog {
        &STANDARD
    }

    /// Parse a catalog document:
    ///
    /// ```toml
    /// [[transform]]
    /// name = "flag_c"
    /// kind = "bond_changing"
    /// op = { fact_edits = [{ option_id = "c", field = "rights_and_duties.violates_rights", value = true }] }
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, InvarianceError> {
        let catalog: TransformCatalog =
            toml::from_str(content).map_err(|e| InvarianceError::Parse(e.to_string()))?;
        let mut names = std::collections::BTreeSet::new();
        for t in &catalog.transforms {
            if !names.insert(t.name.as_str()) {
                return Err(InvarianceError::Parse(format!(
                    "duplicate transform name: {}",
                    t.name
                )));
            }
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, InvarianceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| InvarianceError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn get(&self, name: &str) -> Result<&Transform, InvarianceError> {
        self.transforms
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| InvarianceError::UnknownTransform(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transform> {
        self.transforms.iter()
    }

    pub fn of_kind(&self, kind: TransformKind) -> impl Iterator<Item = &Transform> {
        self.transforms.iter().filter(move |t| t.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}
