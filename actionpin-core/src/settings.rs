//! Clap-free settings for the lint pipeline.

use actionpin_domain::NetworkPolicy;
use actionpin_types::ValidationPolicy;
use camino::Utf8PathBuf;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMethod {
    /// Hosted GitHub API (GraphQL with a token, REST without).
    Api,
    /// `git ls-remote` against the clone URL.
    Git,
}

impl ValidationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationMethod::Api => "api",
            ValidationMethod::Git => "git",
        }
    }
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub rate_limit_delay: Duration,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubApiSettings {
    pub token: Option<String>,
    pub base_url: String,
    pub graphql_url: String,
}

impl Default for GithubApiSettings {
    fn default() -> Self {
        Self {
            token: None,
            base_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    pub base_url: String,
    pub binary: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            binary: "git".to_string(),
        }
    }
}

/// Settings for one lint run.
#[derive(Debug, Clone, PartialEq)]
pub struct LintSettings {
    pub root: Utf8PathBuf,

    // Policy
    pub require_pinned_sha: bool,
    pub auto_fix: bool,
    pub auto_latest: bool,
    pub two_space_comments: bool,
    pub dry_run: bool,

    // Scanning
    pub skip_actions: bool,

    // Remote
    /// `None` picks `Api` when a token is configured, else `Git`.
    pub validation_method: Option<ValidationMethod>,
    pub parallel_workers: usize,
    pub network: NetworkSettings,
    pub github_api: GithubApiSettings,
    pub git: GitSettings,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            require_pinned_sha: true,
            auto_fix: true,
            auto_latest: false,
            two_space_comments: false,
            dry_run: false,
            skip_actions: false,
            validation_method: None,
            parallel_workers: 4,
            network: NetworkSettings::default(),
            github_api: GithubApiSettings::default(),
            git: GitSettings::default(),
        }
    }
}

impl LintSettings {
    pub fn effective_validation_method(&self) -> ValidationMethod {
        match self.validation_method {
            Some(method) => method,
            None if self.has_token() => ValidationMethod::Api,
            None => ValidationMethod::Git,
        }
    }

    pub fn has_token(&self) -> bool {
        self.github_api
            .token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            require_pinned_sha: self.require_pinned_sha,
        }
    }

    pub fn network_policy(&self) -> NetworkPolicy {
        NetworkPolicy {
            max_retries: self.network.max_retries,
            retry_delay: self.network.retry_delay,
            rate_limit_delay: self.network.rate_limit_delay,
        }
    }

    /// At least one worker, whatever was configured.
    pub fn workers(&self) -> usize {
        self.parallel_workers.max(1)
    }
}
