//! GraphQL documents and response handling for the GitHub API.
//!
//! One query per repository chunk: each reference gets a branch alias, a tag
//! alias and, for hex-looking references, a commit alias.

use actionpin_domain::RemoteError;
use actionpin_types::{RefKind, RepoSlug, ResolvedReference};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub(crate) const MAX_REFS_PER_QUERY: usize = 25;

const TAG_TARGET: &str = "target { __typename oid ... on Tag { target { oid } } }";

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn looks_like_sha(reference: &str) -> bool {
    (7..=40).contains(&reference.len()) && reference.chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn refs_query(repo: &RepoSlug, references: &[String]) -> Value {
    let mut selection = String::from("defaultBranchRef { name } ");
    for (i, reference) in references.iter().enumerate() {
        let _ = write!(
            selection,
            "b{i}: ref(qualifiedName: {}) {{ target {{ oid }} }} ",
            quote(&format!("refs/heads/{reference}"))
        );
        let _ = write!(
            selection,
            "t{i}: ref(qualifiedName: {}) {{ {TAG_TARGET} }} ",
            quote(&format!("refs/tags/{reference}"))
        );
        if looks_like_sha(reference) {
            let _ = write!(
                selection,
                "c{i}: object(expression: {}) {{ ... on Commit {{ oid }} }} ",
                quote(reference)
            );
        }
    }

    json!({
        "query": format!(
            "query($owner: String!, $name: String!) {{ repository(owner: $owner, name: $name) {{ {selection}}} }}"
        ),
        "variables": { "owner": repo.owner, "name": repo.name },
    })
}

pub(crate) fn repo_query(repo: &RepoSlug) -> Value {
    json!({
        "query": "query($owner: String!, $name: String!) { repository(owner: $owner, name: $name) { \
                  defaultBranchRef { name } \
                  latestRelease { tagName } \
                  refs(refPrefix: \"refs/tags/\", first: 100, orderBy: {field: TAG_COMMIT_DATE, direction: DESC}) { nodes { name } } \
                  } }",
        "variables": { "owner": repo.owner, "name": repo.name },
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RefsAnswer {
    pub default_branch: Option<String>,
    pub resolved: BTreeMap<String, Option<ResolvedReference>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RepoAnswer {
    pub default_branch: Option<String>,
    pub latest_release: Option<String>,
    /// Most recent first.
    pub tags: Vec<String>,
}

/// Pull `data.repository` out of a response, mapping GraphQL-level errors.
fn repository<'a>(body: &'a Value, what: &str) -> Result<&'a Value, RemoteError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let kind = |t: &str| {
            errors
                .iter()
                .any(|e| e.get("type").and_then(Value::as_str) == Some(t))
        };
        let message = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; ");

        if kind("RATE_LIMITED") {
            return Err(RemoteError::RateLimited {
                message: format!("{what}: {message}"),
                retry_after: None,
            });
        }
        if kind("NOT_FOUND") {
            return Err(RemoteError::NotFound(format!("{what}: {message}")));
        }
        if body.pointer("/data/repository").is_none_or(Value::is_null) {
            return Err(RemoteError::Transport(format!(
                "{what}: graphql error: {message}"
            )));
        }
    }

    match body.pointer("/data/repository") {
        Some(repo) if !repo.is_null() => Ok(repo),
        _ => Err(RemoteError::NotFound(format!("{what}: repository not found"))),
    }
}

fn default_branch(repo: &Value) -> Option<String> {
    repo.pointer("/defaultBranchRef/name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn tag_commit(node: &Value) -> Option<&str> {
    let target = node.get("target")?;
    // Annotated tags point at a Tag object that points at the commit.
    target
        .pointer("/target/oid")
        .or_else(|| target.get("oid"))
        .and_then(Value::as_str)
}

pub(crate) fn parse_refs(
    body: &Value,
    references: &[String],
    what: &str,
) -> Result<RefsAnswer, RemoteError> {
    let repo = repository(body, what)?;
    let mut answer = RefsAnswer {
        default_branch: default_branch(repo),
        resolved: BTreeMap::new(),
    };

    for (i, reference) in references.iter().enumerate() {
        let branch = repo
            .pointer(&format!("/b{i}/target/oid"))
            .and_then(Value::as_str)
            .map(|sha| ResolvedReference::new(sha, RefKind::Branch));
        let tag = || {
            repo.get(format!("t{i}"))
                .and_then(tag_commit)
                .map(|sha| ResolvedReference::new(sha, RefKind::Tag))
        };
        let commit = || {
            repo.pointer(&format!("/c{i}/oid"))
                .and_then(Value::as_str)
                .map(|sha| ResolvedReference::new(sha, RefKind::Commit))
        };
        answer
            .resolved
            .insert(reference.clone(), branch.or_else(tag).or_else(commit));
    }

    Ok(answer)
}

pub(crate) fn parse_repo(body: &Value, what: &str) -> Result<RepoAnswer, RemoteError> {
    let repo = repository(body, what)?;
    Ok(RepoAnswer {
        default_branch: default_branch(repo),
        latest_release: repo
            .pointer("/latestRelease/tagName")
            .and_then(Value::as_str)
            .map(str::to_string),
        tags: repo
            .pointer("/refs/nodes")
            .and_then(Value::as_array)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| n.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn refs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn query_aliases_every_reference() {
        let repo = RepoSlug::new("actions", "checkout");
        let q = refs_query(&repo, &refs(&["main", "8ade135"]));
        let text = q["query"].as_str().expect("query string");

        assert!(text.contains(r#"b0: ref(qualifiedName: "refs/heads/main")"#));
        assert!(text.contains(r#"t1: ref(qualifiedName: "refs/tags/8ade135")"#));
        assert!(text.contains(r#"c1: object(expression: "8ade135")"#));
        assert!(!text.contains("c0:"));
        assert_eq!(q["variables"]["owner"], "actions");
    }

    #[test]
    fn parses_branch_annotated_tag_and_missing() {
        let body = json!({
            "data": { "repository": {
                "defaultBranchRef": { "name": "main" },
                "b0": { "target": { "oid": "8ADE135A41BC03EA155E62E844D188DF1EA18608" } },
                "t0": null,
                "b1": null,
                "t1": { "target": { "__typename": "Tag", "oid": "aaaa", "target": { "oid": "b4ffde65f46336ab88eb53be808477a3936bae11" } } },
                "b2": null,
                "t2": null
            } }
        });

        let answer = parse_refs(&body, &refs(&["main", "v4", "invalid-branch"]), "q").expect("ok");
        assert_eq!(answer.default_branch.as_deref(), Some("main"));
        assert_eq!(
            answer.resolved["main"],
            Some(ResolvedReference::new(
                "8ade135a41bc03ea155e62e844d188df1ea18608",
                RefKind::Branch
            ))
        );
        assert_eq!(
            answer.resolved["v4"],
            Some(ResolvedReference::new(
                "b4ffde65f46336ab88eb53be808477a3936bae11",
                RefKind::Tag
            ))
        );
        assert_eq!(answer.resolved["invalid-branch"], None);
    }

    #[test]
    fn missing_repository_and_rate_limits() {
        let body = json!({
            "data": { "repository": null },
            "errors": [{ "type": "NOT_FOUND", "message": "Could not resolve to a Repository" }]
        });
        assert!(matches!(
            parse_refs(&body, &refs(&["v1"]), "q"),
            Err(RemoteError::NotFound(_))
        ));

        let body = json!({ "errors": [{ "type": "RATE_LIMITED", "message": "API rate limit exceeded" }] });
        assert!(matches!(
            parse_repo(&body, "q"),
            Err(RemoteError::RateLimited { .. })
        ));
    }

    #[test]
    fn parses_release_and_tags() {
        let body = json!({
            "data": { "repository": {
                "defaultBranchRef": { "name": "trunk" },
                "latestRelease": null,
                "refs": { "nodes": [{ "name": "v2.1.0" }, { "name": "v2.0.0" }] }
            } }
        });
        let answer = parse_repo(&body, "q").expect("ok");
        assert_eq!(answer.default_branch.as_deref(), Some("trunk"));
        assert_eq!(answer.latest_release, None);
        assert_eq!(answer.tags, vec!["v2.1.0", "v2.0.0"]);
    }
}
