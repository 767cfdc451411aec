//! Per-source sync bookkeeping (`.metadata/sources.json`)
//!
//! Purely informational: nothing reads this file to decide what to import or
//! remove, so a failed write is logged by callers and never fails a sync.

use std::collections::BTreeMap;

use aimgr_fs::{ConfigStore, NormalizedPath, RepoPath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

pub const SOURCE_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSyncState {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_id: String,
    pub added: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<DateTime<Utc>>,
}

/// Contents of `sources.json`, keyed by source name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceState {
    pub version: u32,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceSyncState>,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            version: SOURCE_STATE_VERSION,
            sources: BTreeMap::new(),
        }
    }
}

impl SourceState {
    pub fn path(repo_root: &NormalizedPath) -> NormalizedPath {
        repo_root.join(RepoPath::SourceState.as_str())
    }

    /// Load the state file; a missing file is an empty state.
    pub fn load(repo_root: &NormalizedPath) -> Result<Self> {
        Ok(ConfigStore::new()
            .load_optional(&Self::path(repo_root))?
            .unwrap_or_default())
    }

    pub fn save(&self, repo_root: &NormalizedPath) -> Result<()> {
        ConfigStore::new().save(&Self::path(repo_root), self)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SourceSyncState> {
        self.sources.get(name)
    }

    /// Record a completed sync; `added` is set the first time only.
    pub fn record_sync(&mut self, name: &str, source_id: &str, now: DateTime<Utc>) {
        let entry = self
            .sources
            .entry(name.to_string())
            .or_insert_with(|| SourceSyncState {
                source_id: source_id.to_string(),
                added: now,
                last_synced: None,
            });
        entry.source_id = source_id.to_string();
        entry.last_synced = Some(now);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.sources.remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_state() {
        let temp = TempDir::new().unwrap();
        let state = SourceState::load(&NormalizedPath::new(temp.path())).unwrap();
        assert_eq!(state, SourceState::default());
    }

    #[test]
    fn added_is_kept_across_syncs() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(1);
        let mut state = SourceState::default();

        state.record_sync("team", "src-1", t0);
        state.record_sync("team", "src-1", t1);

        let entry = state.get("team").unwrap();
        assert_eq!(entry.added, t0);
        assert_eq!(entry.last_synced, Some(t1));
    }

    #[test]
    fn save_load_remove() {
        let temp = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp.path());
        let mut state = SourceState::default();
        state.record_sync("team", "src-1", Utc::now());

        state.save(&root).unwrap();
        let mut loaded = SourceState::load(&root).unwrap();
        assert_eq!(loaded, state);

        assert!(loaded.remove("team"));
        assert!(!loaded.remove("team"));
    }
}
