use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub default_branch: String,
}

/// What a reference turned out to be on the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Branch,
    Tag,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReference {
    /// Full commit SHA, lowercase.
    pub sha: String,
    pub kind: RefKind,
}

impl ResolvedReference {
    pub fn new(sha: impl Into<String>, kind: RefKind) -> Self {
        Self {
            sha: sha.into().to_ascii_lowercase(),
            kind,
        }
    }
}
