//! Glob-style addressing over `type/name` references
//!
//! A pattern is either `name-glob` (any kind) or `type/name-glob`. Globs are
//! compiled to an anchored regular expression:
//!
//! | glob      | meaning                                   |
//! |-----------|-------------------------------------------|
//! | `*`       | any sequence, including `/`               |
//! | `?`       | any single character                      |
//! | `[a-c]`   | character class; `[!x]` or `[^x]` negates |
//! | `{a,b}`   | alternatives (may nest)                   |

use regex::Regex;

use crate::resource::{ResourceKind, ResourceRef};
use crate::{Error, Result};

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Whether `s` contains any glob metacharacter.
pub fn is_pattern(s: &str) -> bool {
    s.contains(GLOB_CHARS)
}

/// Split an optional `type/` prefix off `input`.
///
/// A prefix that is not a resource kind stays part of the name, so
/// `api/deploy` addresses the nested command name. Only singular spellings
/// are recognized here; `commands/x` is a name pattern.
pub fn parse_pattern(input: &str) -> (Option<ResourceKind>, &str) {
    if let Some((prefix, rest)) = input.split_once('/') {
        let kind = match prefix {
            "command" => Some(ResourceKind::Command),
            "skill" => Some(ResourceKind::Skill),
            "agent" => Some(ResourceKind::Agent),
            "package" => Some(ResourceKind::Package),
            _ => None,
        };
        if kind.is_some() {
            return (kind, rest);
        }
    }
    (None, input)
}

/// A compiled resource pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    kind: Option<ResourceKind>,
    name: Regex,
    is_glob: bool,
}

impl Pattern {
    pub fn new(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::invalid("pattern", "pattern cannot be empty"));
        }
        let (kind, name_glob) = parse_pattern(input);
        let regex = glob_to_regex(name_glob)
            .map_err(|message| Error::invalid("pattern", format!("'{input}': {message}")))?;
        let name = Regex::new(&regex)
            .map_err(|e| Error::invalid("pattern", format!("'{input}': {e}")))?;

        Ok(Self {
            source: input.to_string(),
            kind,
            name,
            is_glob: is_pattern(name_glob),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The kind restriction from a `type/` prefix, if any.
    pub fn kind(&self) -> Option<ResourceKind> {
        self.kind
    }

    /// Whether the name part contains glob metacharacters.
    pub fn is_pattern(&self) -> bool {
        self.is_glob
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.is_match(name)
    }

    pub fn matches(&self, kind: ResourceKind, name: &str) -> bool {
        self.kind.is_none_or(|k| k == kind) && self.matches_name(name)
    }

    pub fn matches_ref(&self, reference: &ResourceRef) -> bool {
        self.matches(reference.kind, &reference.name)
    }

    /// The matching subset of `listing`, in listing order.
    pub fn filter<'a, I>(&self, listing: I) -> Vec<ResourceRef>
    where
        I: IntoIterator<Item = &'a ResourceRef>,
    {
        listing
            .into_iter()
            .filter(|r| self.matches_ref(r))
            .cloned()
            .collect()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn glob_to_regex(glob: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    let mut brace_depth = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let end = class_end(&chars, i).ok_or("unclosed '['")?;
                out.push('[');
                let mut j = i + 1;
                if matches!(chars.get(j), Some('!' | '^')) {
                    out.push('^');
                    j += 1;
                }
                for &ch in &chars[j..end] {
                    if matches!(ch, '\\' | '[' | ']' | '^' | '&' | '~') {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push(']');
                i = end;
            }
            '{' => {
                brace_depth += 1;
                out.push_str("(?:");
            }
            ',' if brace_depth > 0 => out.push('|'),
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                out.push(')');
            }
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&regex::escape(&chars[i].to_string()));
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }

    if brace_depth > 0 {
        return Err("unclosed '{'".into());
    }

    out.push('$');
    Ok(out)
}

/// Index of the `]` closing the class opened at `start`.
///
/// A `]` directly after `[` or `[!` is a literal member.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if matches!(chars.get(j), Some('!' | '^')) {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn listing() -> Vec<ResourceRef> {
        vec![
            ResourceRef::new(ResourceKind::Skill, "pdf-parser"),
            ResourceRef::new(ResourceKind::Command, "pdf-parser"),
            ResourceRef::new(ResourceKind::Skill, "image-tool"),
        ]
    }

    #[rstest]
    #[case("skill/pdf*", &["skill/pdf-parser"])]
    #[case("*", &["skill/pdf-parser", "command/pdf-parser", "skill/image-tool"])]
    #[case("pdf*", &["skill/pdf-parser", "command/pdf-parser"])]
    #[case("skill/*", &["skill/pdf-parser", "skill/image-tool"])]
    #[case("{pdf,image}-*", &["skill/pdf-parser", "command/pdf-parser", "skill/image-tool"])]
    #[case("[!p]*", &["skill/image-tool"])]
    #[case("pdf-parse?", &["skill/pdf-parser", "command/pdf-parser"])]
    #[case("PDF*", &[])]
    fn filters_listing(#[case] pattern: &str, #[case] expected: &[&str]) {
        let matched: Vec<String> = Pattern::new(pattern)
            .unwrap()
            .filter(&listing())
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(matched, expected);
    }

    #[rstest]
    #[case("skill/pdf", Some(ResourceKind::Skill), "pdf")]
    #[case("package/bundle", Some(ResourceKind::Package), "bundle")]
    #[case("api/deploy", None, "api/deploy")]
    #[case("command/api/deploy", Some(ResourceKind::Command), "api/deploy")]
    #[case("skills/pdf", None, "skills/pdf")]
    fn parses_type_prefix(
        #[case] input: &str,
        #[case] kind: Option<ResourceKind>,
        #[case] name: &str,
    ) {
        assert_eq!(parse_pattern(input), (kind, name));
    }

    #[rstest]
    #[case("test*", true)]
    #[case("test?", true)]
    #[case("test[abc]", true)]
    #[case("test{a,b}", true)]
    #[case("test-command", false)]
    fn detects_glob_characters(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_pattern(input), expected);
    }

    #[test]
    fn star_crosses_nested_segments() {
        let pattern = Pattern::new("command/api*").unwrap();
        assert!(pattern.matches(ResourceKind::Command, "api/deploy"));
        assert!(!pattern.matches(ResourceKind::Skill, "api"));
    }

    #[test]
    fn is_anchored_to_full_name() {
        let pattern = Pattern::new("pdf").unwrap();
        assert!(pattern.matches_name("pdf"));
        assert!(!pattern.matches_name("pdf-parser"));
        assert!(!pattern.is_pattern());
    }

    #[test]
    fn ranges_and_caret_negation() {
        let pattern = Pattern::new("v[0-9]").unwrap();
        assert!(pattern.matches_name("v7"));
        assert!(!pattern.matches_name("vx"));
        assert!(Pattern::new("[^a]b").unwrap().matches_name("cb"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(Pattern::new("a.b").unwrap().matches_name("a.b"));
        assert!(!Pattern::new("a.b").unwrap().matches_name("axb"));
        assert!(Pattern::new("a+(b)").unwrap().matches_name("a+(b)"));
    }

    #[rstest]
    #[case("")]
    #[case("pdf[")]
    #[case("{a,b")]
    fn rejects_malformed(#[case] input: &str) {
        assert!(matches!(Pattern::new(input), Err(Error::Invalid { .. })));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn literal_names_match_only_themselves(
                name in "[a-z0-9]{1,10}(-[a-z0-9]{1,10}){0,2}",
                other in "[a-z0-9]{1,12}",
            ) {
                let pattern = Pattern::new(&name).unwrap();
                prop_assert!(pattern.matches_name(&name));
                prop_assert_eq!(pattern.matches_name(&other), other == name);
            }

            #[test]
            fn star_suffix_matches_every_extension(
                prefix in "[a-z]{1,8}",
                suffix in "[a-z0-9/-]{0,12}",
            ) {
                let pattern = Pattern::new(&format!("{prefix}*")).unwrap();
                let candidate = format!("{prefix}{suffix}");
                prop_assert!(pattern.matches_name(&candidate));
            }
        }
    }
}
