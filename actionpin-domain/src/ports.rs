use actionpin_types::{RepoSlug, RepositoryInfo, ResolvedReference};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Classified failure of a single remote call.
///
/// `NotFound` is the only variant that can turn into a policy finding; the
/// others are infrastructure failures handled by the guard.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Transport(_) | RemoteError::Timeout(_) | RemoteError::RateLimited { .. }
        )
    }
}

/// Source of truth for repository and reference state.
///
/// Implementations must never report an unresolved reference as resolved.
pub trait RemoteResolver: Send + Sync {
    /// Short name for logs and reports (`github-api`, `git`).
    fn name(&self) -> &'static str;

    fn repository_info(&self, repo: &RepoSlug) -> Result<RepositoryInfo, RemoteError>;

    fn resolve_reference(
        &self,
        repo: &RepoSlug,
        reference: &str,
    ) -> Result<ResolvedReference, RemoteError>;

    /// Batch form of [`RemoteResolver::resolve_reference`]. Missing references
    /// map to `None`; a missing repository is `Err(NotFound)`.
    fn resolve_references(
        &self,
        repo: &RepoSlug,
        references: &[String],
    ) -> Result<BTreeMap<String, Option<ResolvedReference>>, RemoteError> {
        let mut out = BTreeMap::new();
        for reference in references {
            let resolved = match self.resolve_reference(repo, reference) {
                Ok(r) => Some(r),
                Err(RemoteError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            out.insert(reference.clone(), resolved);
        }
        Ok(out)
    }

    /// Replacement for a reference that does not exist: the default branch.
    /// `None` only when the repository itself cannot be found.
    fn find_fallback_reference(
        &self,
        repo: &RepoSlug,
        _invalid_reference: &str,
    ) -> Result<Option<String>, RemoteError> {
        match self.repository_info(repo) {
            Ok(info) => Ok(Some(info.default_branch)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Latest release tag, or the highest version tag when there are no releases.
    fn latest_tag(&self, repo: &RepoSlug) -> Result<Option<String>, RemoteError>;
}
