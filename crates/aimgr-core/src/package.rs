//! Package descriptors: named bundles of resource references

use aimgr_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::resource::{ResourceKind, ResourceRef, validate_name};
use crate::{Error, Result};

/// Contents of a `<name>.package.json` file.
///
/// References are not checked for existence when a package is written;
/// dangling ones are reported by verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub resources: Vec<String>,
}

impl Package {
    /// Load and validate a package descriptor.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let package: Package = ConfigStore::new().load(path).map_err(|e| match e {
            aimgr_fs::Error::ConfigParse { message, .. } => {
                Error::invalid("package", format!("{path}: {message}"))
            }
            other => other.into(),
        })?;
        package.validate()?;
        Ok(package)
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        self.validate()?;
        ConfigStore::new().save(path, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(Some(ResourceKind::Package), &self.name)?;
        if self.description.trim().is_empty() {
            return Err(Error::invalid(
                "package",
                format!("'{}' has no description", self.name),
            ));
        }
        Ok(())
    }

    /// References that are malformed or for which `exists` returns false.
    pub fn missing_references(&self, exists: impl Fn(&ResourceRef) -> bool) -> Vec<String> {
        self.resources
            .iter()
            .filter(|reference| match reference.parse::<ResourceRef>() {
                Ok(parsed) => !exists(&parsed),
                Err(_) => true,
            })
            .cloned()
            .collect()
    }
}
