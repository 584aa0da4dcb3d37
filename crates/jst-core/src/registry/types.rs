//! Registry response types

use serde::Deserialize;

/// A published release
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub published_at: Option<String>,

    #[serde(default)]
    pub html_url: Option<String>,
}

impl Release {
    /// The release's version tag, falling back to its display name
    pub fn tag(&self) -> Option<&str> {
        self.tag_name
            .as_deref()
            .or(self.name.as_deref())
            .filter(|t| !t.is_empty())
    }
}

/// Object a git ref points at
#[derive(Debug, Clone, Deserialize)]
pub struct RefObject {
    #[serde(default)]
    pub sha: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref", default)]
    pub name: String,

    pub object: Option<RefObject>,
}

/// `git/refs/tags/{tag}` answers with a single ref for an exact match and an
/// array when the tag only matches as a prefix.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GitRefResponse {
    Single(GitRef),
    Many(Vec<GitRef>),
}

impl GitRefResponse {
    /// Commit hash of `refs/tags/<tag>`, if the response contains it
    pub fn commit_for(self, tag: &str) -> Option<String> {
        let full = format!("refs/tags/{}", tag);
        let found = match self {
            GitRefResponse::Single(r) if r.name.is_empty() || r.name == full => Some(r),
            GitRefResponse::Single(_) => None,
            GitRefResponse::Many(refs) => refs.into_iter().find(|r| r.name == full),
        };
        found
            .and_then(|r| r.object)
            .and_then(|o| o.sha)
            .filter(|sha| !sha.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub name: String,
}

/// Selects which branches are worth offering to the operator
#[derive(Debug, Clone)]
pub struct BranchFilter {
    /// Branches whose name starts with this prefix are kept
    pub prefix: String,
    /// Branches kept regardless of prefix
    pub allow: Vec<String>,
}

impl Default for BranchFilter {
    fn default() -> Self {
        Self {
            prefix: "V".to_string(),
            allow: vec!["main".to_string(), "dev".to_string()],
        }
    }
}

impl BranchFilter {
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) || self.allow.iter().any(|a| a == name)
    }

    /// Keep matching names, newest naming convention first
    pub fn apply<I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut kept: Vec<String> = names.into_iter().filter(|n| self.matches(n)).collect();
        kept.reverse();
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_tag_prefers_tag_name() {
        let release: Release =
            serde_json::from_str(r#"{"tag_name": "v1.2.0", "name": "Release 1.2"}"#).unwrap();
        assert_eq!(release.tag(), Some("v1.2.0"));

        let release: Release = serde_json::from_str(r#"{"name": "v1.0.0"}"#).unwrap();
        assert_eq!(release.tag(), Some("v1.0.0"));

        let release: Release = serde_json::from_str(r#"{"tag_name": ""}"#).unwrap();
        assert_eq!(release.tag(), None);
    }

    #[test]
    fn test_ref_single_and_many() {
        let single: GitRefResponse = serde_json::from_str(
            r#"{"ref": "refs/tags/v1.0.0", "object": {"sha": "abc123", "type": "commit"}}"#,
        )
        .unwrap();
        assert_eq!(single.commit_for("v1.0.0").as_deref(), Some("abc123"));

        let many: GitRefResponse = serde_json::from_str(
            r#"[
                {"ref": "refs/tags/v1.0.0-rc", "object": {"sha": "111"}},
                {"ref": "refs/tags/v1.0.0", "object": {"sha": "222"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(many.commit_for("v1.0.0").as_deref(), Some("222"));
    }

    #[test]
    fn test_ref_prefix_only_match_is_unresolved() {
        let many: GitRefResponse =
            serde_json::from_str(r#"[{"ref": "refs/tags/v1.0.0-rc", "object": {"sha": "111"}}]"#)
                .unwrap();
        assert_eq!(many.commit_for("v1.0.0"), None);
    }

    #[test]
    fn test_branch_filter_reverses() {
        let names = ["dev", "feature/x", "V1", "main", "V2", "hotfix"]
            .iter()
            .map(|s| s.to_string());
        let filtered = BranchFilter::default().apply(names);
        assert_eq!(filtered, vec!["V2", "main", "V1", "dev"]);
    }
}
