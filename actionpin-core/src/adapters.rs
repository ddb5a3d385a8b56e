//! Default port implementations and resolver construction.

use crate::ports::WritePort;
use crate::settings::{LintSettings, ValidationMethod};
use actionpin_domain::RemoteResolver;
use actionpin_remote::{GitConfig, GitResolver, GithubApiConfig, GithubApiResolver};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Build the resolver for the configured validation method.
///
/// The resolver (HTTP client, token, listing cache) lives for one run.
pub fn build_resolver(settings: &LintSettings) -> anyhow::Result<Arc<dyn RemoteResolver>> {
    let method = settings.effective_validation_method();
    debug!(method = %method, "building resolver");

    let resolver: Arc<dyn RemoteResolver> = match method {
        ValidationMethod::Api => {
            let config = GithubApiConfig {
                base_url: settings.github_api.base_url.clone(),
                graphql_url: settings.github_api.graphql_url.clone(),
                token: settings.github_api.token.clone(),
                timeout: settings.network.timeout,
            };
            Arc::new(GithubApiResolver::new(config).context("build GitHub API client")?)
        }
        ValidationMethod::Git => Arc::new(GitResolver::new(GitConfig {
            base_url: settings.git.base_url.clone(),
            binary: settings.git.binary.clone(),
            timeout: settings.network.timeout,
        })),
    };
    Ok(resolver)
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {path}"))?;
        }
        fs::write(path, contents).with_context(|| format!("write {path}"))
    }
}

/// Collects writes in memory for embedding and testing.
#[derive(Debug, Default)]
pub struct InMemoryWritePort {
    files: Mutex<BTreeMap<Utf8PathBuf, Vec<u8>>>,
}

impl InMemoryWritePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Utf8Path) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        self.files.lock().keys().cloned().collect()
    }
}

impl WritePort for InMemoryWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        self.files
            .lock()
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builds_git_resolver_without_token() {
        let resolver = build_resolver(&LintSettings::default()).expect("resolver");
        assert_eq!(resolver.name(), "git");
    }

    #[test]
    fn builds_api_resolver_with_token() {
        let mut settings = LintSettings::default();
        settings.github_api.token = Some("ghp_example".to_string());
        let resolver = build_resolver(&settings).expect("resolver");
        assert_eq!(resolver.name(), "github-api");
    }

    #[test]
    fn bad_token_is_an_error() {
        let mut settings = LintSettings {
            validation_method: Some(ValidationMethod::Api),
            ..LintSettings::default()
        };
        settings.github_api.token = Some("line\nbreak".to_string());
        assert!(build_resolver(&settings).is_err());
    }

    #[test]
    fn fs_write_port_creates_parents() {
        let td = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8");
        let path = root.join("out").join("nested").join("report.json");

        FsWritePort.write_file(&path, b"{}").expect("write");

        assert_eq!(std::fs::read(&path).expect("read"), b"{}");
    }

    #[test]
    fn in_memory_write_port_records_files() {
        let port = InMemoryWritePort::new();
        port.write_file(Utf8Path::new("b.json"), b"2").expect("write");
        port.write_file(Utf8Path::new("a.json"), b"1").expect("write");

        assert_eq!(
            port.paths(),
            vec![Utf8PathBuf::from("a.json"), Utf8PathBuf::from("b.json")]
        );
        assert_eq!(port.get(Utf8Path::new("a.json")), Some(b"1".to_vec()));
    }
}
