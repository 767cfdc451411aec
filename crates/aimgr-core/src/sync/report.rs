//! Sync report types

use serde::Serialize;

use crate::import::ImportReport;
use crate::resource::ResourceKind;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Synced,
    Failed,
}

/// What happened to one manifest source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub name: String,
    pub id: String,
    pub status: SourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub import: ImportReport,
}

impl SourceOutcome {
    pub fn synced(name: &str, id: &str, import: ImportReport) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            status: SourceStatus::Synced,
            error: None,
            import,
        }
    }

    pub fn failed(name: &str, id: &str, error: &Error) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            status: SourceStatus::Failed,
            error: Some(error.to_string()),
            import: ImportReport::default(),
        }
    }
}

/// A resource removed (or, in dry run, to be removed) because its source no
/// longer provides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Removal {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    pub source: String,
}

/// Report from a sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub sources: Vec<SourceOutcome>,
    pub removed: Vec<Removal>,
    /// Removal failures; the resource is left in place
    pub errors: Vec<String>,
    /// Human-readable action log, `[dry-run] Would ...` in dry run
    pub actions: Vec<String>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.status == SourceStatus::Failed)
            .count()
    }

    /// True when there were sources and none of them could be synced.
    pub fn all_failed(&self) -> bool {
        !self.sources.is_empty() && self.failed_sources() == self.sources.len()
    }

    /// Convert an all-sources-failed report into an error.
    pub fn ensure_success(&self) -> Result<()> {
        if self.all_failed() {
            return Err(Error::AllSourcesFailed {
                count: self.sources.len(),
            });
        }
        Ok(())
    }

    /// Import outcomes summed over all sources.
    pub fn totals(&self) -> ImportReport {
        let mut totals = ImportReport {
            dry_run: self.dry_run,
            ..Default::default()
        };
        for source in &self.sources {
            totals.merge(source.import.clone());
        }
        totals
    }

    /// Whether anything was (or would be) written or removed.
    pub fn changed(&self) -> bool {
        !self.removed.is_empty() || self.sources.iter().any(|s| s.import.changed())
    }

    pub fn summary(&self) -> String {
        let totals = self.totals();
        format!(
            "{} source(s), {} failed: {}, {} removed",
            self.sources.len(),
            self.failed_sources(),
            totals.summary(),
            self.removed.len()
        )
    }

    pub(crate) fn action(&mut self, action: String) {
        let action = if self.dry_run {
            format!("[dry-run] Would {}", lowercase_first(&action))
        } else {
            action
        };
        self.actions.push(action);
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
