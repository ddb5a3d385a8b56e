//! Configuration file loading for actionpin.
//!
//! Discovers and loads `actionpin.toml` from the scan root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use actionpin_core::settings::{GitSettings, GithubApiSettings, NetworkSettings};
use actionpin_core::{LintSettings, ValidationMethod};
use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "actionpin.toml";

/// Top-level configuration from actionpin.toml.
///
/// Every key is optional; unset keys fall back to the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionpinConfig {
    pub require_pinned_sha: Option<bool>,
    pub auto_fix: Option<bool>,
    pub auto_latest: Option<bool>,
    pub two_space_comments: Option<bool>,
    pub validation_method: Option<MethodConfig>,
    pub parallel_workers: Option<usize>,
    pub skip_actions: Option<bool>,
    pub network: NetworkConfig,
    pub github_api: GithubApiConfig,
    pub git: GitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodConfig {
    Api,
    Git,
}

impl From<MethodConfig> for ValidationMethod {
    fn from(m: MethodConfig) -> Self {
        match m {
            MethodConfig::Api => ValidationMethod::Api,
            MethodConfig::Git => ValidationMethod::Git,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_seconds: Option<f64>,
    pub rate_limit_delay_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubApiConfig {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub graphql_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    pub base_url: Option<String>,
    pub binary: Option<String>,
}

/// Discover the actionpin.toml config file.
///
/// Returns `None` if no config file is found in `root`.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.is_file() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an actionpin.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<ActionpinConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<ActionpinConfig> {
    let config: ActionpinConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from `root`, or return the default if there is none.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<ActionpinConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(ActionpinConfig::default()),
    }
}

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Utf8PathBuf,
    pub require_pinned_sha: Option<bool>,
    pub auto_fix: Option<bool>,
    pub auto_latest: Option<bool>,
    pub two_space_comments: Option<bool>,
    pub validation_method: Option<ValidationMethod>,
    pub workers: Option<usize>,
    pub skip_actions: bool,
    pub dry_run: bool,
    /// `--github-token`, or `GITHUB_TOKEN` from the environment.
    pub github_token: Option<String>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: ActionpinConfig,
}

impl ConfigMerger {
    pub fn new(config: ActionpinConfig) -> Self {
        Self { config }
    }

    /// Overlay CLI values on the file, then the file on the defaults.
    pub fn merge(self, cli: CliOverrides) -> anyhow::Result<LintSettings> {
        let defaults = LintSettings::default();
        let file = self.config;

        let network = NetworkSettings {
            timeout: file
                .network
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.network.timeout),
            max_retries: file
                .network
                .max_retries
                .unwrap_or(defaults.network.max_retries),
            retry_delay: seconds(
                "network.retry_delay_seconds",
                file.network.retry_delay_seconds,
                defaults.network.retry_delay,
            )?,
            rate_limit_delay: seconds(
                "network.rate_limit_delay_seconds",
                file.network.rate_limit_delay_seconds,
                defaults.network.rate_limit_delay,
            )?,
        };
        if network.timeout.is_zero() {
            bail!("network.timeout_seconds must be greater than zero");
        }

        let token = cli
            .github_token
            .filter(|t| !t.trim().is_empty())
            .or(file.github_api.token);
        let github_api = GithubApiSettings {
            token,
            base_url: file
                .github_api
                .base_url
                .unwrap_or(defaults.github_api.base_url),
            graphql_url: file
                .github_api
                .graphql_url
                .unwrap_or(defaults.github_api.graphql_url),
        };

        let git = GitSettings {
            base_url: file.git.base_url.unwrap_or(defaults.git.base_url),
            binary: file.git.binary.unwrap_or(defaults.git.binary),
        };

        Ok(LintSettings {
            root: cli.root,
            require_pinned_sha: cli
                .require_pinned_sha
                .or(file.require_pinned_sha)
                .unwrap_or(defaults.require_pinned_sha),
            auto_fix: cli
                .auto_fix
                .or(file.auto_fix)
                .unwrap_or(defaults.auto_fix),
            auto_latest: cli
                .auto_latest
                .or(file.auto_latest)
                .unwrap_or(defaults.auto_latest),
            two_space_comments: cli
                .two_space_comments
                .or(file.two_space_comments)
                .unwrap_or(defaults.two_space_comments),
            dry_run: cli.dry_run,
            skip_actions: cli.skip_actions || file.skip_actions.unwrap_or(defaults.skip_actions),
            validation_method: cli
                .validation_method
                .or(file.validation_method.map(ValidationMethod::from)),
            parallel_workers: cli
                .workers
                .or(file.parallel_workers)
                .unwrap_or(defaults.parallel_workers),
            network,
            github_api,
            git,
        })
    }
}

fn seconds(key: &str, value: Option<f64>, default: Duration) -> anyhow::Result<Duration> {
    match value {
        None => Ok(default),
        Some(v) => Duration::try_from_secs_f64(v)
            .with_context(|| format!("{key} must be a non-negative number of seconds, got {v}")),
    }
}
