use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use deme_types::{JudgeId, ProfileId};
use tracing::{debug, info};

use crate::canonical::builtin_profiles;
use crate::document::ProfileDocument;
use crate::error::ProfileConfigError;
use crate::profile::{GovernanceProfile, ProfileSummary};

/// Validated profiles keyed by id. Loaded once, read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct ProfileStore {
    known_judges: BTreeSet<JudgeId>,
    profiles: BTreeMap<ProfileId, Arc<GovernanceProfile>>,
}

impl ProfileStore {
    /// An empty store validating against `known_judges`.
    pub fn new(known_judges: BTreeSet<JudgeId>) -> Self {
        Self {
            known_judges,
            profiles: BTreeMap::new(),
        }
    }

    /// A store pre-loaded with the built-in profiles.
    pub fn with_builtins(known_judges: BTreeSet<JudgeId>) -> Result<Self, ProfileConfigError> {
        let mut store = Self::new(known_judges);
        for profile in builtin_profiles() {
            store.insert(profile)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, profile: GovernanceProfile) -> Result<(), ProfileConfigError> {
        profile.validate(&self.known_judges)?;
        if self.profiles.contains_key(&profile.profile_id) {
            return Err(ProfileConfigError::DuplicateProfile(profile.profile_id));
        }
        info!(
            profile_id = %profile.profile_id,
            override_mode = %profile.override_mode,
            layers = profile.layers.len(),
            "Profile registered"
        );
        self.profiles
            .insert(profile.profile_id.clone(), Arc::new(profile));
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<ProfileId, ProfileConfigError> {
        let profile = ProfileDocument::from_path(path)?.into_profile(&self.known_judges)?;
        let id = profile.profile_id.clone();
        self.insert(profile)?;
        debug!(path = %path.display(), profile_id = %id, "Profile document loaded");
        Ok(id)
    }

    /// Load every `.toml`, `.yaml` and `.yml` file in `dir`, in file name
    /// order. Other files are ignored.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<ProfileId>, ProfileConfigError> {
        let io_err = |e: std::io::Error| ProfileConfigError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        };
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("toml") | Some("yaml") | Some("yml")
                    )
            })
            .collect();
        paths.sort();

        paths.iter().map(|p| self.load_file(p)).collect()
    }

    pub fn get(&self, profile_id: &ProfileId) -> Result<Arc<GovernanceProfile>, ProfileConfigError> {
        self.profiles
            .get(profile_id)
            .cloned()
            .ok_or_else(|| ProfileConfigError::UnknownProfile(profile_id.clone()))
    }

    /// Summaries in profile id order.
    pub fn list(&self) -> Vec<ProfileSummary> {
        self.profiles.values().map(|p| p.summary()).collect()
    }

    pub fn known_judges(&self) -> &BTreeSet<JudgeId> {
        &self.known_judges
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::balanced_profile;
    use deme_judges::JudgeRegistry;

    fn store() -> ProfileStore {
        ProfileStore::with_builtins(JudgeRegistry::with_reference_judges().judge_ids()).unwrap()
    }

    #[test]
    fn builtins_are_listed_in_id_order() {
        let ids: Vec<String> = store()
            .list()
            .into_iter()
            .map(|s| s.profile_id.to_string())
            .collect();
        assert_eq!(ids, vec!["balanced", "consequences_first", "rights_first"]);
    }

    #[test]
    fn duplicate_profile_rejected() {
        let mut store = store();
        assert_eq!(
            store.insert(balanced_profile()),
            Err(ProfileConfigError::DuplicateProfile("balanced".into()))
        );
    }

    #[test]
    fn unknown_profile_is_an_error() {
        assert_eq!(
            store().get(&"nope".into()).unwrap_err(),
            ProfileConfigError::UnknownProfile("nope".into())
        );
    }

    #[test]
    fn load_dir_reads_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "profile_id: second\nlexical_layers:\n  - name: all\n    members: [fairness]\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.toml"),
            "profile_id = \"first\"\n[[lexical_layers]]\nname = \"all\"\nmembers = [\"consequences\"]\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut store = ProfileStore::new(JudgeRegistry::with_reference_judges().judge_ids());
        let loaded = store.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, vec![ProfileId::from("first"), "second".into()]);
        assert_eq!(store.len(), 2);
    }
}
