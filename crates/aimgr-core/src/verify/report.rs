//! Verification and repair report types

use serde::Serialize;

use crate::resource::ResourceKind;

/// A resource in the content tree without a metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIssue {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub path: String,
}

/// A metadata record that is orphaned or points at a vanished source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataIssue {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

/// A record whose `type` differs from the directory it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMismatch {
    pub name: String,
    pub resource_type: ResourceKind,
    pub metadata_type: ResourceKind,
    pub resource_path: String,
    pub metadata_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIssue {
    pub name: String,
    pub path: String,
    pub missing_resources: Vec<String>,
}

/// Result of cross-checking the content tree against the metadata directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub resources_without_metadata: Vec<ResourceIssue>,
    pub orphaned_metadata: Vec<MetadataIssue>,
    pub missing_source_paths: Vec<MetadataIssue>,
    pub type_mismatches: Vec<TypeMismatch>,
    pub packages_with_missing_refs: Vec<PackageIssue>,
    /// Metadata files that could not be parsed
    pub unreadable_metadata: Vec<String>,
    /// Repairs applied (or, in dry run, planned)
    pub fixes: Vec<String>,
    /// Resources whose metadata a fix run recreated
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata_created: Vec<ResourceIssue>,
    /// Orphaned records a fix run deleted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphaned_removed: Vec<MetadataIssue>,
    /// Repairs that were attempted and failed
    pub fix_errors: Vec<String>,
    pub has_errors: bool,
    pub has_warnings: bool,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        !self.has_errors && !self.has_warnings
    }

    /// Number of issues that only manual intervention can resolve.
    pub fn unfixable_count(&self) -> usize {
        self.type_mismatches.len()
            + self.packages_with_missing_refs.len()
            + self.unreadable_metadata.len()
    }

    /// Resources still lacking metadata after any fix run.
    pub fn remaining_without_metadata(&self) -> impl Iterator<Item = &ResourceIssue> {
        self.resources_without_metadata
            .iter()
            .filter(|issue| !self.metadata_created.contains(issue))
    }

    /// Orphaned records that are still on disk after any fix run.
    pub fn remaining_orphaned(&self) -> impl Iterator<Item = &MetadataIssue> {
        self.orphaned_metadata
            .iter()
            .filter(|issue| !self.orphaned_removed.contains(issue))
    }

    /// Number of issues a repair addresses.
    pub fn fixable_count(&self) -> usize {
        self.resources_without_metadata.len() + self.orphaned_metadata.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} without metadata, {} orphaned metadata, {} missing source paths, {} type mismatches, {} packages with missing refs",
            self.resources_without_metadata.len(),
            self.orphaned_metadata.len(),
            self.missing_source_paths.len(),
            self.type_mismatches.len(),
            self.packages_with_missing_refs.len()
        )
    }
}

/// Result of the repair command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub dry_run: bool,
    pub metadata_created: Vec<ResourceIssue>,
    pub orphaned_removed: Vec<MetadataIssue>,
    pub type_mismatches: Vec<TypeMismatch>,
    pub packages_with_missing_refs: Vec<PackageIssue>,
    pub unreadable_metadata: Vec<String>,
    pub actions: Vec<String>,
    pub errors: Vec<String>,
    pub fixed_count: usize,
    pub unfixable_count: usize,
}

impl RepairReport {
    pub fn summary(&self) -> String {
        if self.dry_run {
            format!(
                "{} action(s) planned, {} unfixable issue(s)",
                self.fixed_count, self.unfixable_count
            )
        } else {
            format!("{} fixed, {} unfixable", self.fixed_count, self.unfixable_count)
        }
    }
}
