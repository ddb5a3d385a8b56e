use crate::action::ActionCall;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    InvalidReference,
    NotPinnedToSha,
    NetworkError,
    AuthenticationError,
    RateLimited,
    ValidationTimeout,
}

impl ValidationResult {
    /// Policy findings attach to a line; the rest describe a failed run.
    pub fn is_policy_finding(self) -> bool {
        matches!(
            self,
            ValidationResult::InvalidReference | ValidationResult::NotPinnedToSha
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValidationResult::Valid => "valid",
            ValidationResult::InvalidReference => "invalid_reference",
            ValidationResult::NotPinnedToSha => "not_pinned_to_sha",
            ValidationResult::NetworkError => "network_error",
            ValidationResult::AuthenticationError => "authentication_error",
            ValidationResult::RateLimited => "rate_limited",
            ValidationResult::ValidationTimeout => "validation_timeout",
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    pub require_pinned_sha: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            require_pinned_sha: true,
        }
    }
}

/// A per-line policy finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub file_path: Utf8PathBuf,
    pub action_call: ActionCall,
    pub result: ValidationResult,
    pub error_message: String,
}

impl ValidationError {
    pub fn new(call: &ActionCall, result: ValidationResult) -> Self {
        let error_message = match result {
            ValidationResult::InvalidReference => format!(
                "{} does not resolve to a branch, tag or commit",
                call.uses_token()
            ),
            ValidationResult::NotPinnedToSha => format!(
                "{} is not pinned to a full commit SHA",
                call.uses_token()
            ),
            other => format!("{}: {}", call.uses_token(), other),
        };
        Self {
            file_path: call.file_path.clone(),
            action_call: call.clone(),
            result,
            error_message,
        }
    }

    pub fn line_number(&self) -> usize {
        self.action_call.line_number
    }
}
