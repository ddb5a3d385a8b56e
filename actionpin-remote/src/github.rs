use crate::graphql::{self, MAX_REFS_PER_QUERY};
use crate::http_status::{RateHeaders, classify_failure, now_epoch, transport_error};
use crate::tags::latest_version;
use actionpin_domain::{RemoteError, RemoteResolver};
use actionpin_types::{RefKind, RepoSlug, RepositoryInfo, ResolvedReference};
use anyhow::Context;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GithubApiConfig {
    pub base_url: String,
    pub graphql_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for GithubApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Hosted-API strategy.
///
/// With a token, references are resolved with batched GraphQL queries. The
/// GraphQL endpoint refuses anonymous callers, so without a token the REST
/// endpoints are used one reference at a time.
pub struct GithubApiResolver {
    client: Client,
    config: GithubApiConfig,
}

impl GithubApiResolver {
    pub fn new(config: GithubApiConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("GitHub token contains invalid header characters")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(concat!("actionpin/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .context("build HTTP client")?;

        Ok(Self { client, config })
    }

    fn has_token(&self) -> bool {
        self.config.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Value, RemoteError> {
        let response = request.send().map_err(|e| transport_error(&e, what))?;
        let status = response.status();
        let rate = RateHeaders::from_headers(response.headers());
        let body = response.text().map_err(|e| transport_error(&e, what))?;

        if !status.is_success() {
            return Err(classify_failure(
                status.as_u16(),
                &rate,
                &body,
                what,
                now_epoch(),
            ));
        }
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::Transport(format!("{what}: malformed JSON: {e}")))
    }

    fn rest(&self, path: &str) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(url = %url, "GET");
        self.send(self.client.get(&url), &format!("GET {path}"))
    }

    fn graphql(&self, query: &Value, what: &str) -> Result<Value, RemoteError> {
        debug!(what, "POST graphql");
        self.send(self.client.post(&self.config.graphql_url).json(query), what)
    }

    fn rest_resolve(&self, repo: &RepoSlug, reference: &str) -> Result<ResolvedReference, RemoteError> {
        match self.rest(&format!("/repos/{repo}/git/ref/heads/{reference}")) {
            Ok(body) => {
                if let Some(sha) = body.pointer("/object/sha").and_then(Value::as_str) {
                    return Ok(ResolvedReference::new(sha, RefKind::Branch));
                }
            }
            Err(RemoteError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        match self.rest(&format!("/repos/{repo}/git/ref/tags/{reference}")) {
            Ok(body) => {
                let sha = body.pointer("/object/sha").and_then(Value::as_str);
                let kind = body.pointer("/object/type").and_then(Value::as_str);
                match (sha, kind) {
                    (Some(tag_sha), Some("tag")) => {
                        let tag = self.rest(&format!("/repos/{repo}/git/tags/{tag_sha}"))?;
                        if let Some(sha) = tag.pointer("/object/sha").and_then(Value::as_str) {
                            return Ok(ResolvedReference::new(sha, RefKind::Tag));
                        }
                    }
                    (Some(sha), _) => return Ok(ResolvedReference::new(sha, RefKind::Tag)),
                    _ => {}
                }
            }
            Err(RemoteError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if reference.len() >= 7 && reference.chars().all(|c| c.is_ascii_hexdigit()) {
            let body = self.rest(&format!("/repos/{repo}/commits/{reference}"))?;
            if let Some(sha) = body.get("sha").and_then(Value::as_str) {
                return Ok(ResolvedReference::new(sha, RefKind::Commit));
            }
        }

        Err(RemoteError::NotFound(format!("{repo}@{reference}")))
    }

    fn graphql_resolve(
        &self,
        repo: &RepoSlug,
        references: &[String],
    ) -> Result<BTreeMap<String, Option<ResolvedReference>>, RemoteError> {
        let mut out = BTreeMap::new();
        for chunk in references.chunks(MAX_REFS_PER_QUERY) {
            let what = format!("resolve {} reference(s) of {repo}", chunk.len());
            let body = self.graphql(&graphql::refs_query(repo, chunk), &what)?;
            out.extend(graphql::parse_refs(&body, chunk, &what)?.resolved);
        }
        Ok(out)
    }
}

impl RemoteResolver for GithubApiResolver {
    fn name(&self) -> &'static str {
        "github-api"
    }

    fn repository_info(&self, repo: &RepoSlug) -> Result<RepositoryInfo, RemoteError> {
        let body = self.rest(&format!("/repos/{repo}"))?;
        body.get("default_branch")
            .and_then(Value::as_str)
            .map(|b| RepositoryInfo {
                default_branch: b.to_string(),
            })
            .ok_or_else(|| RemoteError::Transport(format!("{repo}: response has no default_branch")))
    }

    fn resolve_reference(
        &self,
        repo: &RepoSlug,
        reference: &str,
    ) -> Result<ResolvedReference, RemoteError> {
        if self.has_token() {
            let refs = [reference.to_string()];
            return self
                .graphql_resolve(repo, &refs)?
                .remove(reference)
                .flatten()
                .ok_or_else(|| RemoteError::NotFound(format!("{repo}@{reference}")));
        }
        self.rest_resolve(repo, reference)
    }

    fn resolve_references(
        &self,
        repo: &RepoSlug,
        references: &[String],
    ) -> Result<BTreeMap<String, Option<ResolvedReference>>, RemoteError> {
        if self.has_token() {
            return self.graphql_resolve(repo, references);
        }

        let mut out = BTreeMap::new();
        for reference in references {
            let resolved = match self.rest_resolve(repo, reference) {
                Ok(r) => Some(r),
                Err(RemoteError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            out.insert(reference.clone(), resolved);
        }
        // Unresolvable references in a missing repository look like plain
        // misses over REST; confirm the repository exists.
        if out.values().all(Option::is_none) {
            self.repository_info(repo)?;
        }
        Ok(out)
    }

    fn latest_tag(&self, repo: &RepoSlug) -> Result<Option<String>, RemoteError> {
        if self.has_token() {
            let what = format!("latest tag of {repo}");
            let answer = graphql::parse_repo(&self.graphql(&graphql::repo_query(repo), &what)?, &what)?;
            return Ok(answer
                .latest_release
                .or_else(|| latest_version(answer.tags.iter().map(String::as_str))));
        }

        match self.rest(&format!("/repos/{repo}/releases/latest")) {
            Ok(body) => {
                if let Some(tag) = body.get("tag_name").and_then(Value::as_str) {
                    return Ok(Some(tag.to_string()));
                }
            }
            Err(RemoteError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let tags = self.rest(&format!("/repos/{repo}/tags?per_page=100"))?;
        let names: Vec<&str> = tags
            .as_array()
            .map(|a| a.iter().filter_map(|t| t.get("name").and_then(Value::as_str)).collect())
            .unwrap_or_default();
        Ok(latest_version(names))
    }
}
