//! In-memory resolver for embedding and tests.

use crate::ports::{RemoteError, RemoteResolver};
use actionpin_types::{RefKind, RepoSlug, RepositoryInfo, ResolvedReference};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepo {
    pub default_branch: String,
    pub branches: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
    /// Commits reachable only by SHA.
    pub commits: Vec<String>,
    pub latest_tag: Option<String>,
}

impl InMemoryRepo {
    pub fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            ..Self::default()
        }
    }

    pub fn branch(mut self, name: &str, sha: &str) -> Self {
        self.branches.insert(name.to_string(), sha.to_string());
        self
    }

    pub fn tag(mut self, name: &str, sha: &str) -> Self {
        self.tags.insert(name.to_string(), sha.to_string());
        self
    }

    pub fn commit(mut self, sha: &str) -> Self {
        self.commits.push(sha.to_string());
        self
    }

    pub fn latest(mut self, tag: &str) -> Self {
        self.latest_tag = Some(tag.to_string());
        self
    }

    fn find_commit(&self, prefix: &str) -> Option<String> {
        if prefix.len() < 7 || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let prefix = prefix.to_ascii_lowercase();
        self.commits
            .iter()
            .chain(self.branches.values())
            .chain(self.tags.values())
            .find(|sha| sha.starts_with(&prefix))
            .cloned()
    }
}

#[derive(Debug)]
struct Failure {
    error: RemoteError,
    /// `None` fails forever.
    remaining: Option<usize>,
}

/// Resolver over a fixed set of repositories, with call counters and
/// failure injection.
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    repos: BTreeMap<RepoSlug, InMemoryRepo>,
    failure: Mutex<Option<Failure>>,
    repository_info_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
    latest_tag_calls: AtomicUsize,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, slug: &str, repo: InMemoryRepo) -> Self {
        if let Some(slug) = RepoSlug::parse(slug) {
            self.repos.insert(slug, repo);
        }
        self
    }

    /// Every call fails with `error`.
    pub fn failing_with(self, error: RemoteError) -> Self {
        *self.failure.lock() = Some(Failure {
            error,
            remaining: None,
        });
        self
    }

    /// The next `times` calls fail with `error`, then calls succeed.
    pub fn failing_times(self, times: usize, error: RemoteError) -> Self {
        *self.failure.lock() = Some(Failure {
            error,
            remaining: Some(times),
        });
        self
    }

    pub fn repository_info_calls(&self) -> usize {
        self.repository_info_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn latest_tag_calls(&self) -> usize {
        self.latest_tag_calls.load(Ordering::SeqCst)
    }

    fn injected_failure(&self) -> Result<(), RemoteError> {
        let mut slot = self.failure.lock();
        let Some(failure) = slot.as_mut() else {
            return Ok(());
        };
        let error = failure.error.clone();
        let remaining = failure.remaining;
        match remaining {
            None => Err(error),
            Some(0) => {
                *slot = None;
                Ok(())
            }
            Some(n) => {
                failure.remaining = Some(n - 1);
                Err(error)
            }
        }
    }

    fn repo(&self, slug: &RepoSlug) -> Result<&InMemoryRepo, RemoteError> {
        self.repos
            .get(slug)
            .ok_or_else(|| RemoteError::NotFound(format!("repository {slug}")))
    }
}

impl RemoteResolver for InMemoryResolver {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn repository_info(&self, repo: &RepoSlug) -> Result<RepositoryInfo, RemoteError> {
        self.repository_info_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        Ok(RepositoryInfo {
            default_branch: self.repo(repo)?.default_branch.clone(),
        })
    }

    fn resolve_reference(
        &self,
        repo: &RepoSlug,
        reference: &str,
    ) -> Result<ResolvedReference, RemoteError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        let data = self.repo(repo)?;

        if let Some(sha) = data.branches.get(reference) {
            return Ok(ResolvedReference::new(sha, RefKind::Branch));
        }
        if let Some(sha) = data.tags.get(reference) {
            return Ok(ResolvedReference::new(sha, RefKind::Tag));
        }
        if let Some(sha) = data.find_commit(reference) {
            return Ok(ResolvedReference::new(sha, RefKind::Commit));
        }
        Err(RemoteError::NotFound(format!("{repo}@{reference}")))
    }

    fn latest_tag(&self, repo: &RepoSlug) -> Result<Option<String>, RemoteError> {
        self.latest_tag_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        Ok(self.repo(repo)?.latest_tag.clone())
    }
}
