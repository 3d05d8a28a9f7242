//! Persisted profile documents (TOML or YAML).
//!
//! Documents are produced outside the core (e.g. by a stakeholder
//! dialogue) and consumed here. Unknown fields are rejected. Layers may
//! `include` other layers by name; includes are flattened at load time
//! and cycles are rejected.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use deme_judges::VetoPredicate;
use deme_types::{JudgeId, ProfileId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProfileConfigError;
use crate::profile::{
    FailurePolicy, GovernanceProfile, LayerFocus, LexicalLayer, OverrideMode, TieBreak,
    DEFAULT_ACCEPTANCE_FLOOR,
};

fn default_floor() -> f64 {
    DEFAULT_ACCEPTANCE_FLOOR
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerDocument {
    pub name: String,
    #[serde(default)]
    pub hard_stop: bool,
    #[serde(default)]
    pub focus: LayerFocus,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDocument {
    pub profile_id: String,
    #[serde(default)]
    pub stakeholder_label: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub override_mode: OverrideMode,
    #[serde(default)]
    pub deme_dimension_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub hard_vetoes: Vec<String>,
    pub lexical_layers: Vec<LayerDocument>,
    #[serde(default = "default_floor")]
    pub acceptance_floor: f64,
    #[serde(default)]
    pub tie_break: TieBreak,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl ProfileDocument {
    pub fn from_toml(content: &str) -> Result<Self, ProfileConfigError> {
        toml::from_str(content).map_err(|e| ProfileConfigError::Parse(e.to_string()))
    }

    pub fn from_yaml(content: &str) -> Result<Self, ProfileConfigError> {
        serde_yaml::from_str(content).map_err(|e| ProfileConfigError::Parse(e.to_string()))
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file.
    pub fn from_path(path: &Path) -> Result<Self, ProfileConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ProfileConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            other => Err(ProfileConfigError::Parse(format!(
                "unsupported profile document extension: {:?}",
                other
            ))),
        }
    }

    pub fn to_toml(&self) -> Result<String, ProfileConfigError> {
        toml::to_string_pretty(self).map_err(|e| ProfileConfigError::Parse(e.to_string()))
    }

    /// Resolve includes, parse veto names and validate against the
    /// registered judges.
    pub fn into_profile(
        self,
        known_judges: &BTreeSet<JudgeId>,
    ) -> Result<GovernanceProfile, ProfileConfigError> {
        let layers = resolve_layers(&self.lexical_layers)?;

        let hard_vetoes = self
            .hard_vetoes
            .iter()
            .map(|name| {
                name.parse::<VetoPredicate>()
                    .map_err(|_| ProfileConfigError::UnknownVetoPredicate(name.clone()))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        let profile = GovernanceProfile {
            profile_id: ProfileId::new(self.profile_id),
            stakeholder_label: self.stakeholder_label,
            domain: self.domain,
            override_mode: self.override_mode,
            layers,
            weights: self
                .deme_dimension_weights
                .into_iter()
                .map(|(k, v)| (JudgeId::new(k), v))
                .collect(),
            acceptance_floor: self.acceptance_floor,
            tie_break: self.tie_break,
            hard_vetoes,
            failure_policy: self.failure_policy,
        };
        profile.validate(known_judges)?;
        debug!(profile_id = %profile.profile_id, layers = profile.layers.len(), "Profile document resolved");
        Ok(profile)
    }
}

fn resolve_layers(docs: &[LayerDocument]) -> Result<Vec<LexicalLayer>, ProfileConfigError> {
    let mut by_name: BTreeMap<&str, &LayerDocument> = BTreeMap::new();
    for doc in docs {
        if by_name.insert(doc.name.as_str(), doc).is_some() {
            return Err(ProfileConfigError::DuplicateLayer(doc.name.clone()));
        }
    }

    docs.iter()
        .map(|doc| {
            let mut members = Vec::new();
            let mut stack = Vec::new();
            collect_members(doc, &by_name, &mut stack, &mut members)?;
            Ok(LexicalLayer {
                name: doc.name.clone(),
                hard_stop: doc.hard_stop,
                focus: doc.focus,
                weight: doc.weight,
                members,
            })
        })
        .collect()
}

/// Depth-first include expansion. `stack` holds the include path so a
/// revisit is reported as the cycle it closes.
fn collect_members<'a>(
    doc: &'a LayerDocument,
    by_name: &BTreeMap<&str, &'a LayerDocument>,
    stack: &mut Vec<&'a str>,
    members: &mut Vec<JudgeId>,
) -> Result<(), ProfileConfigError> {
    if let Some(pos) = stack.iter().position(|n| *n == doc.name) {
        let mut cycle: Vec<String> = stack[pos..].iter().map(|s| s.to_string()).collect();
        cycle.push(doc.name.clone());
        return Err(ProfileConfigError::CyclicInclude(cycle));
    }
    stack.push(doc.name.as_str());

    for member in &doc.members {
        let id = JudgeId::from(member.as_str());
        if !members.contains(&id) {
            members.push(id);
        }
    }
    for include in &doc.include {
        let target = by_name
            .get(include.as_str())
            .ok_or_else(|| ProfileConfigError::UnknownInclude {
                layer: doc.name.clone(),
                include: include.clone(),
            })?;
        collect_members(target, by_name, stack, members)?;
    }

    stack.pop();
    Ok(())
}
