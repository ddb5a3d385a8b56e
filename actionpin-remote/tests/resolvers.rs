use actionpin_domain::{RemoteError, RemoteResolver};
use actionpin_remote::{GitConfig, GitResolver, GithubApiConfig, GithubApiResolver};
use actionpin_types::{RefKind, RepoSlug};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .current_dir(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "actionpin")
        .env("GIT_AUTHOR_EMAIL", "actionpin@example.invalid")
        .env("GIT_COMMITTER_NAME", "actionpin")
        .env("GIT_COMMITTER_EMAIL", "actionpin@example.invalid")
        .output()
        .expect("run git");
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// `<tmp>/remotes/octo/tool.git` with branch `main`, tags `v1.0.0`
/// (lightweight) and `v2.0.0` (annotated).
fn fixture_remote(temp: &TempDir) -> (String, String) {
    let work = temp.path().join("work");
    std::fs::create_dir_all(&work).expect("mkdir");
    git(&work, &["init", "--quiet"]);
    git(&work, &["checkout", "--quiet", "-b", "main"]);
    git(&work, &["commit", "--quiet", "--allow-empty", "-m", "first"]);
    git(&work, &["tag", "v1.0.0"]);
    git(&work, &["commit", "--quiet", "--allow-empty", "-m", "second"]);
    git(&work, &["tag", "-a", "v2.0.0", "-m", "release two"]);
    let head = git(&work, &["rev-parse", "HEAD"]);

    let remotes = temp.path().join("remotes");
    let bare = remotes.join("octo").join("tool.git");
    std::fs::create_dir_all(bare.parent().expect("parent")).expect("mkdir");
    git(
        temp.path(),
        &[
            "clone",
            "--quiet",
            "--bare",
            work.to_str().expect("utf8"),
            bare.to_str().expect("utf8"),
        ],
    );

    (remotes.to_string_lossy().to_string(), head)
}

#[test]
fn git_resolver_reads_local_remote() {
    if !git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let temp = TempDir::new().expect("temp dir");
    let (base_url, head) = fixture_remote(&temp);
    let resolver = GitResolver::new(GitConfig {
        base_url,
        timeout: Duration::from_secs(20),
        ..GitConfig::default()
    });
    let repo = RepoSlug::new("octo", "tool");

    let info = resolver.repository_info(&repo).expect("repo info");
    assert_eq!(info.default_branch, "main");

    let main = resolver.resolve_reference(&repo, "main").expect("main");
    assert_eq!((main.sha.as_str(), main.kind), (head.as_str(), RefKind::Branch));

    let annotated = resolver.resolve_reference(&repo, "v2.0.0").expect("v2");
    assert_eq!((annotated.sha.as_str(), annotated.kind), (head.as_str(), RefKind::Tag));

    let short = resolver.resolve_reference(&repo, &head[..7]).expect("short sha");
    assert_eq!(short.kind, RefKind::Commit);
    assert_eq!(short.sha, head);

    assert!(matches!(
        resolver.resolve_reference(&repo, "invalid-branch"),
        Err(RemoteError::NotFound(_))
    ));
    assert_eq!(
        resolver.latest_tag(&repo).expect("latest"),
        Some("v2.0.0".to_string())
    );
}

#[test]
fn git_resolver_reports_missing_repository_as_not_found() {
    if !git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let temp = TempDir::new().expect("temp dir");
    let resolver = GitResolver::new(GitConfig {
        base_url: temp.path().to_string_lossy().to_string(),
        ..GitConfig::default()
    });
    let err = resolver
        .repository_info(&RepoSlug::new("ghost", "repo"))
        .expect_err("missing");
    assert!(matches!(err, RemoteError::NotFound(_)), "{err:?}");
}

#[test]
fn api_resolver_unreachable_host_is_transport_failure() {
    let resolver = GithubApiResolver::new(GithubApiConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        graphql_url: "http://127.0.0.1:9/graphql".to_string(),
        token: None,
        timeout: Duration::from_secs(5),
    })
    .expect("client");

    let err = resolver
        .resolve_reference(&RepoSlug::new("actions", "checkout"), "v4")
        .expect_err("nothing listens there");
    assert!(
        matches!(err, RemoteError::Transport(_) | RemoteError::Timeout(_)),
        "{err:?}"
    );
}

#[test]
fn api_resolver_rejects_token_with_control_characters() {
    let result = GithubApiResolver::new(GithubApiConfig {
        token: Some("bad\ntoken".to_string()),
        ..GithubApiConfig::default()
    });
    assert!(result.is_err());
}
