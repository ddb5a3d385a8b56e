use crate::cache::SingleFlight;
use crate::guard::{NetworkGuard, NetworkPolicy, RunAbort};
use crate::ports::RemoteResolver;
use actionpin_types::{RepoSlug, RepositoryInfo, ResolvedReference};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

type RefKey = (RepoSlug, String);

/// Everything one run shares: the resolver, the guard, and the caches.
///
/// Each (repository, reference) resolves at most once per session.
pub struct RemoteSession {
    resolver: Arc<dyn RemoteResolver>,
    guard: NetworkGuard,
    workers: usize,
    repos: SingleFlight<RepoSlug, Option<RepositoryInfo>>,
    refs: SingleFlight<RefKey, Option<ResolvedReference>>,
    latest_tags: SingleFlight<RepoSlug, Option<String>>,
}

impl RemoteSession {
    pub fn new(resolver: Arc<dyn RemoteResolver>, policy: NetworkPolicy, workers: usize) -> Self {
        Self {
            resolver,
            guard: NetworkGuard::new(policy),
            workers: workers.max(1),
            repos: SingleFlight::new(),
            refs: SingleFlight::new(),
            latest_tags: SingleFlight::new(),
        }
    }

    pub fn guard(&self) -> &NetworkGuard {
        &self.guard
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn resolver_name(&self) -> &'static str {
        self.resolver.name()
    }

    pub fn repository_info(&self, repo: &RepoSlug) -> Result<Option<RepositoryInfo>, RunAbort> {
        self.repos.get_or_fetch(repo.clone(), || {
            self.guard
                .run(&format!("fetching repository info for {repo}"), || {
                    self.resolver.repository_info(repo)
                })
        })
    }

    pub fn resolve(
        &self,
        repo: &RepoSlug,
        reference: &str,
    ) -> Result<Option<ResolvedReference>, RunAbort> {
        let key = (repo.clone(), reference.to_string());
        self.refs.get_or_fetch(key, || {
            debug!(repo = %repo, reference, "resolving reference");
            self.guard
                .run(&format!("resolving {repo}@{reference}"), || {
                    self.resolver.resolve_reference(repo, reference)
                })
        })
    }

    /// Resolve several references of one repository, batching what is not
    /// cached yet into a single resolver call.
    pub fn resolve_many(
        &self,
        repo: &RepoSlug,
        references: &[String],
    ) -> Result<BTreeMap<String, Option<ResolvedReference>>, RunAbort> {
        let keys: Vec<RefKey> = references
            .iter()
            .map(|r| (repo.clone(), r.clone()))
            .collect();

        let resolved = self.refs.get_or_fetch_many(&keys, |missing| {
            let wanted: Vec<String> = missing.iter().map(|(_, r)| r.clone()).collect();
            debug!(repo = %repo, count = wanted.len(), "resolving references");

            let batch = self
                .guard
                .run(&format!("resolving {} reference(s) of {repo}", wanted.len()), || {
                    self.resolver.resolve_references(repo, &wanted)
                })?;

            // A missing repository leaves every reference unresolved.
            let mut batch = batch.unwrap_or_default();
            Ok::<_, RunAbort>(
                missing
                    .iter()
                    .map(|key| (key.clone(), batch.remove(&key.1).flatten()))
                    .collect::<HashMap<_, _>>(),
            )
        })?;

        Ok(resolved.into_iter().map(|((_, r), v)| (r, v)).collect())
    }

    /// Default branch of `repo`, taken from the cached repository info.
    /// `None` when the repository cannot be found.
    pub fn fallback_reference(
        &self,
        repo: &RepoSlug,
        invalid_reference: &str,
    ) -> Result<Option<String>, RunAbort> {
        let fallback = self.repository_info(repo)?.map(|info| info.default_branch);
        debug!(repo = %repo, invalid_reference, ?fallback, "fallback reference");
        Ok(fallback)
    }

    pub fn latest_tag(&self, repo: &RepoSlug) -> Result<Option<String>, RunAbort> {
        self.latest_tags.get_or_fetch(repo.clone(), || {
            let found = self
                .guard
                .run(&format!("finding the latest tag of {repo}"), || {
                    self.resolver.latest_tag(repo)
                })?;
            Ok(found.flatten())
        })
    }
}
