//! Resource identity: kinds, `type/name` references, and name rules

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

static NAME_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap());

const MAX_SEGMENT_LEN: usize = 64;

/// The four kinds of artifact a repository stores.
///
/// Declaration order is the processing order of a bulk import: packages come
/// last so the resources they reference are already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A single markdown file, possibly nested (`commands/api/deploy.md`)
    Command,
    /// A directory containing `SKILL.md`
    Skill,
    /// A single markdown file
    Agent,
    /// A `.package.json` descriptor referencing other resources
    Package,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [Self::Command, Self::Skill, Self::Agent, Self::Package];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Skill => "skill",
            Self::Agent => "agent",
            Self::Package => "package",
        }
    }

    /// Directory under the repository root (and under `.metadata/`).
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Command => "commands",
            Self::Skill => "skills",
            Self::Agent => "agents",
            Self::Package => "packages",
        }
    }

    /// Path of a resource relative to the repository root.
    pub fn relative_path(&self, name: &str) -> String {
        match self {
            Self::Command => format!("commands/{name}.md"),
            Self::Skill => format!("skills/{name}"),
            Self::Agent => format!("agents/{name}.md"),
            Self::Package => format!("packages/{name}.package.json"),
        }
    }

    /// Only commands may have slash-separated names.
    pub fn allows_nested_names(&self) -> bool {
        matches!(self, Self::Command)
    }

    /// Parse a `type` prefix, accepting singular or plural spelling.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "command" | "commands" => Some(Self::Command),
            "skill" | "skills" => Some(Self::Skill),
            "agent" | "agents" => Some(Self::Agent),
            "package" | "packages" => Some(Self::Package),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_prefix(s).ok_or_else(|| {
            Error::invalid(
                "resource type",
                format!("'{s}' (expected command, skill, agent or package)"),
            )
        })
    }
}

/// A `type/name` reference to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

impl FromStr for ResourceRef {
    type Err = Error;

    /// Parse `type/name`; the name may itself contain slashes.
    fn from_str(s: &str) -> Result<Self> {
        let (kind, name) = s.split_once('/').ok_or_else(|| {
            Error::invalid("resource reference", format!("'{s}' (expected type/name)"))
        })?;
        let kind: ResourceKind = kind.parse()?;
        if name.is_empty() {
            return Err(Error::invalid(
                "resource reference",
                format!("'{s}' has an empty name"),
            ));
        }
        Ok(Self::new(kind, name))
    }
}

/// Validate a resource or source name.
///
/// Each slash-separated segment must be 1-64 lowercase alphanumerics or
/// hyphens, must not start or end with a hyphen, and must not contain `--`.
/// Slashes are only accepted for kinds that allow nesting.
pub fn validate_name(kind: Option<ResourceKind>, name: &str) -> Result<()> {
    let invalid = |message: String| Error::invalid("name", format!("'{name}': {message}"));

    if name.is_empty() {
        return Err(invalid("name cannot be empty".into()));
    }
    let nested = name.contains('/');
    if nested && !kind.is_some_and(|k| k.allows_nested_names()) {
        return Err(invalid("only command names may contain '/'".into()));
    }

    for segment in name.split('/') {
        if segment.is_empty() {
            return Err(invalid("empty path segment".into()));
        }
        if segment.len() > MAX_SEGMENT_LEN {
            return Err(invalid(format!(
                "segment '{segment}' exceeds {MAX_SEGMENT_LEN} characters"
            )));
        }
        if segment.contains("--") {
            return Err(invalid("consecutive hyphens are not allowed".into()));
        }
        if !NAME_SEGMENT.is_match(segment) {
            return Err(invalid(
                "use lowercase letters, digits and single hyphens, not starting or ending with a hyphen"
                    .into(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn kinds_sort_packages_last() {
        let mut kinds = vec![ResourceKind::Package, ResourceKind::Agent, ResourceKind::Command];
        kinds.sort();
        assert_eq!(kinds.last(), Some(&ResourceKind::Package));
        assert_eq!(kinds.first(), Some(&ResourceKind::Command));
    }

    #[test]
    fn relative_paths_follow_layout() {
        assert_eq!(ResourceKind::Command.relative_path("api/deploy"), "commands/api/deploy.md");
        assert_eq!(ResourceKind::Skill.relative_path("pdf"), "skills/pdf");
        assert_eq!(ResourceKind::Agent.relative_path("reviewer"), "agents/reviewer.md");
        assert_eq!(
            ResourceKind::Package.relative_path("bundle"),
            "packages/bundle.package.json"
        );
    }

    #[test]
    fn parses_references_with_nested_names() {
        let r: ResourceRef = "command/api/deploy".parse().unwrap();
        assert_eq!(r, ResourceRef::new(ResourceKind::Command, "api/deploy"));
        assert_eq!(r.to_string(), "command/api/deploy");
    }

    #[rstest]
    #[case("invalid")]
    #[case("widget/x")]
    #[case("skill/")]
    fn rejects_bad_references(#[case] input: &str) {
        assert!(input.parse::<ResourceRef>().is_err());
    }

    #[rstest]
    #[case("pdf-parser")]
    #[case("a")]
    #[case("v2")]
    fn accepts_valid_names(#[case] name: &str) {
        assert!(validate_name(Some(ResourceKind::Skill), name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("-lead")]
    #[case("trail-")]
    #[case("double--hyphen")]
    #[case("Upper")]
    #[case("under_score")]
    fn rejects_invalid_names(#[case] name: &str) {
        assert!(validate_name(Some(ResourceKind::Skill), name).is_err());
    }

    #[test]
    fn rejects_overlong_segment() {
        let name = "a".repeat(65);
        assert!(validate_name(None, &name).is_err());
        assert!(validate_name(None, &"a".repeat(64)).is_ok());
    }

    #[test]
    fn nesting_only_for_commands() {
        assert!(validate_name(Some(ResourceKind::Command), "api/deploy").is_ok());
        assert!(validate_name(Some(ResourceKind::Agent), "api/deploy").is_err());
        assert!(validate_name(Some(ResourceKind::Command), "api//deploy").is_err());
    }
}
