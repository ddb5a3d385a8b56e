use crate::fix::{FileChange, FileFailure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintReport {
    pub schema: String,
    pub tool: ReportToolInfo,
    pub run: ReportRunInfo,
    pub verdict: ReportVerdict,

    #[serde(default)]
    pub findings: Vec<ReportFinding>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<FileChange>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unfixed: Vec<ReportUnfixed>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_failures: Vec<FileFailure>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ReportWarning>,

    /// Set when the run stopped on a network, auth or rate-limit failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<ReportAbort>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRunInfo {
    pub started_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    pub validation_method: String,

    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportVerdict {
    pub status: ReportStatus,
    pub counts: ReportCounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub files_scanned: u64,
    pub action_calls: u64,
    pub invalid_references: u64,
    pub not_pinned: u64,
    pub lines_fixed: u64,
    pub files_fixed: u64,
    pub unfixed: u64,
    pub write_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLocation {
    pub path: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFinding {
    /// `invalid_reference` or `not_pinned_to_sha`.
    pub code: String,
    pub message: String,
    pub location: ReportLocation,
    pub uses: String,
    pub reference_kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportUnfixed {
    pub location: ReportLocation,
    pub uses: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportWarning {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAbort {
    /// `network_error`, `validation_timeout`, `authentication_error` or `rate_limited`.
    pub kind: String,
    pub message: String,
    pub remediation: String,
}
