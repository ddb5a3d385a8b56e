use crate::validation::ValidationError;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One rewritten line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileEdit {
    /// 1-based.
    pub line_number: usize,
    pub old_text: String,
    pub new_text: String,
}

/// The fixer's decision for one finding, before any text is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub error: ValidationError,
    /// Reference the line is being moved to (may equal the current one).
    pub target_reference: String,
    pub sha: String,
    /// Trailing version comment text; `None` keeps the line's own comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfixedError {
    pub error: ValidationError,
    pub reason: String,
}

/// A file that could not be rewritten. Other files are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: Utf8PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: Utf8PathBuf,
    pub sha256_before: String,
    pub sha256_after: String,
    pub edits: Vec<FileEdit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOutcome {
    /// Edits that were applied (or would be, on a dry run), per file.
    pub applied: BTreeMap<Utf8PathBuf, Vec<FileEdit>>,

    #[serde(default)]
    pub unfixed: Vec<UnfixedError>,

    #[serde(default)]
    pub failures: Vec<FileFailure>,

    #[serde(default)]
    pub changes: Vec<FileChange>,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub patch: String,
}

impl FixOutcome {
    pub fn files_fixed(&self) -> usize {
        self.applied.len()
    }

    pub fn lines_fixed(&self) -> usize {
        self.applied.values().map(Vec::len).sum()
    }
}
