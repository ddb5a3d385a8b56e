use crate::ls_remote::RefListing;
use crate::tags::latest_version;
use actionpin_domain::cache::SingleFlight;
use actionpin_domain::{RemoteError, RemoteResolver};
use actionpin_types::{RefKind, RepoSlug, RepositoryInfo, ResolvedReference};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Remote URLs are `{base_url}/{owner}/{name}.git`.
    pub base_url: String,
    pub binary: String,
    pub timeout: Duration,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            binary: "git".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Local-tooling strategy: one `git ls-remote` per repository per run.
pub struct GitResolver {
    config: GitConfig,
    listings: SingleFlight<RepoSlug, Arc<RefListing>>,
}

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl GitResolver {
    pub fn new(config: GitConfig) -> Self {
        Self {
            config,
            listings: SingleFlight::new(),
        }
    }

    fn url(&self, repo: &RepoSlug) -> String {
        format!(
            "{}/{}/{}.git",
            self.config.base_url.trim_end_matches('/'),
            repo.owner,
            repo.name
        )
    }

    fn run_git(&self, args: &[&str], what: &str) -> Result<GitOutput, RemoteError> {
        debug!(binary = %self.config.binary, ?args, "running git");
        let mut child = Command::new(&self.config.binary)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RemoteError::Transport(format!("{what}: failed to run {}: {e}", self.config.binary))
            })?;

        // Drain pipes on their own threads so a large listing cannot block
        // the child while we poll for exit.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.config.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RemoteError::Timeout(format!(
                        "{what}: git did not finish within {}s",
                        self.config.timeout.as_secs()
                    )));
                }
                Ok(None) => thread::sleep(Duration::from_millis(25)),
                Err(e) => return Err(RemoteError::Transport(format!("{what}: {e}"))),
            }
        };

        let join = |h: Option<thread::JoinHandle<String>>| {
            h.and_then(|h| h.join().ok()).unwrap_or_default()
        };
        Ok(GitOutput {
            success: status.success(),
            stdout: join(stdout),
            stderr: join(stderr),
        })
    }

    fn listing(&self, repo: &RepoSlug) -> Result<Arc<RefListing>, RemoteError> {
        self.listings.get_or_fetch(repo.clone(), || {
            let url = self.url(repo);
            let what = format!("git ls-remote {url}");
            let out = self.run_git(&["ls-remote", "--symref", &url], &what)?;
            if !out.success {
                return Err(classify_git_failure(&out.stderr, &what));
            }
            let listing = RefListing::parse(&out.stdout);
            debug!(
                repo = %repo,
                branches = listing.branches.len(),
                tags = listing.tags.len(),
                "listed remote refs"
            );
            Ok(Arc::new(listing))
        })
    }

    /// A full SHA that is not a ref tip may still be a commit in the
    /// repository; ask the server for exactly that object.
    fn verify_commit(&self, repo: &RepoSlug, sha: &str) -> Result<ResolvedReference, RemoteError> {
        let url = self.url(repo);
        let what = format!("git fetch {url} {sha}");
        let scratch = tempfile::TempDir::new()
            .map_err(|e| RemoteError::Transport(format!("{what}: scratch dir: {e}")))?;
        let dir = scratch.path().to_string_lossy().to_string();

        let init = self.run_git(&["init", "--bare", "--quiet", &dir], &what)?;
        if !init.success {
            return Err(RemoteError::Transport(format!(
                "{what}: git init failed: {}",
                init.stderr.trim()
            )));
        }

        let fetch = self.run_git(
            &["-C", &dir, "fetch", "--quiet", "--depth=1", "--filter=blob:none", &url, sha],
            &what,
        )?;
        if fetch.success {
            return Ok(ResolvedReference::new(sha, RefKind::Commit));
        }
        Err(classify_git_failure(&fetch.stderr, &what))
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

/// Map git's stderr onto the error taxonomy.
///
/// With prompts disabled, GitHub answers a missing (or private) repository
/// with a credential failure, so those count as "not found".
pub(crate) fn classify_git_failure(stderr: &str, what: &str) -> RemoteError {
    let lower = stderr.to_ascii_lowercase();
    let detail = stderr.trim().lines().last().unwrap_or("git failed").to_string();
    let message = format!("{what}: {detail}");

    let not_found = [
        "repository not found",
        "not found",
        "could not read username",
        "terminal prompts disabled",
        "not our ref",
        "couldn't find remote ref",
        "no such remote ref",
        "does not appear to be a git repository",
    ];
    let transport = [
        "could not resolve host",
        "failed to connect",
        "connection refused",
        "connection timed out",
        "network is unreachable",
        "ssl certificate problem",
        "ssl_connect",
        "gnutls",
        "tls handshake",
        "early eof",
        "the remote end hung up",
    ];

    if transport.iter().any(|p| lower.contains(p)) {
        if lower.contains("timed out") {
            return RemoteError::Timeout(message);
        }
        return RemoteError::Transport(message);
    }
    if lower.contains("429") || lower.contains("rate limit") {
        return RemoteError::RateLimited {
            message,
            retry_after: None,
        };
    }
    if not_found.iter().any(|p| lower.contains(p)) {
        return RemoteError::NotFound(message);
    }
    RemoteError::Transport(message)
}

impl RemoteResolver for GitResolver {
    fn name(&self) -> &'static str {
        "git"
    }

    fn repository_info(&self, repo: &RepoSlug) -> Result<RepositoryInfo, RemoteError> {
        self.listing(repo)?
            .default_branch()
            .map(|default_branch| RepositoryInfo { default_branch })
            .ok_or_else(|| RemoteError::NotFound(format!("{repo}: no branches advertised")))
    }

    fn resolve_reference(
        &self,
        repo: &RepoSlug,
        reference: &str,
    ) -> Result<ResolvedReference, RemoteError> {
        let listing = self.listing(repo)?;
        if let Some(resolved) = listing.resolve(reference) {
            return Ok(resolved);
        }
        if reference.len() == 40 && reference.chars().all(|c| c.is_ascii_hexdigit()) {
            return self.verify_commit(repo, &reference.to_ascii_lowercase());
        }
        Err(RemoteError::NotFound(format!("{repo}@{reference}")))
    }

    fn latest_tag(&self, repo: &RepoSlug) -> Result<Option<String>, RemoteError> {
        let listing = self.listing(repo)?;
        Ok(latest_version(listing.tags.keys().map(String::as_str)))
    }
}
