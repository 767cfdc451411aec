//! Git URL normalization

/// Canonical form of a Git URL used for identity comparisons.
///
/// Lowercases, trims whitespace, and strips trailing slashes and a `.git`
/// suffix, so `https://GitHub.com/Owner/Repo.git/` and
/// `https://github.com/owner/repo` compare equal.
pub fn normalize_url(url: &str) -> String {
    let mut normalized = url.trim().to_lowercase();
    loop {
        let before = normalized.len();
        while normalized.ends_with('/') {
            normalized.pop();
        }
        if let Some(stripped) = normalized.strip_suffix(".git") {
            let len = stripped.len();
            normalized.truncate(len);
        }
        if normalized.len() == before {
            break;
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_case_slashes_and_suffix() {
        for input in [
            "https://github.com/anthropics/skills",
            "https://github.com/anthropics/skills.git",
            "https://github.com/anthropics/skills/",
            "https://GitHub.com/Anthropics/Skills",
            "  https://github.com/anthropics/skills.git/  ",
        ] {
            assert_eq!(normalize_url(input), "https://github.com/anthropics/skills");
        }
    }

    #[test]
    fn leaves_inner_git_segments_alone() {
        assert_eq!(
            normalize_url("https://example.com/my.github/repo"),
            "https://example.com/my.github/repo"
        );
    }
}
