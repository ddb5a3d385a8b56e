use crate::reference::ReferenceKind;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `owner/name` of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`. Extra path segments are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, name) = s.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// `org/repo[/path]@ref` pointing at an action.
    Action,
    /// `org/repo/.github/workflows/x.yml@ref`.
    ReusableWorkflow,
    /// `./path/to/workflow.yml`, resolved inside the current repository.
    LocalWorkflow,
}

/// One `uses:` occurrence in a workflow or action file.
///
/// `raw_line` is the exact line text without its terminator; it is the only
/// basis for textual rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCall {
    pub file_path: Utf8PathBuf,
    /// 1-based.
    pub line_number: usize,
    pub raw_line: String,
    pub call_kind: CallKind,
    pub organization: String,
    pub repository: String,

    /// Sub-path after the repository (`init` in `github/codeql-action/init`),
    /// or the whole path for local workflows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_path: Option<String>,

    pub reference: String,
    pub reference_kind: ReferenceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_comment: Option<String>,
}

impl ActionCall {
    pub fn is_remote(&self) -> bool {
        self.call_kind != CallKind::LocalWorkflow
    }

    pub fn repo(&self) -> Option<RepoSlug> {
        if !self.is_remote() {
            return None;
        }
        Some(RepoSlug::new(&self.organization, &self.repository))
    }

    /// The part of the `uses:` value before `@`.
    pub fn target(&self) -> String {
        match (self.call_kind, &self.action_path) {
            (CallKind::LocalWorkflow, Some(path)) => path.clone(),
            (_, Some(path)) => format!("{}/{}/{}", self.organization, self.repository, path),
            (_, None) => format!("{}/{}", self.organization, self.repository),
        }
    }

    /// The full `uses:` value as written.
    pub fn uses_token(&self) -> String {
        if self.is_remote() {
            format!("{}@{}", self.target(), self.reference)
        } else {
            self.target()
        }
    }
}
