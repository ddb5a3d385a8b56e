use actionpin_domain::adapters::{InMemoryRepo, InMemoryResolver};
use actionpin_domain::{NetworkPolicy, RemoteError, RemoteSession, RunAbort, Validator};
use actionpin_types::{
    ActionCall, CallKind, ValidationPolicy, ValidationResult, classify,
};
use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const MAIN_SHA: &str = "1111111111111111111111111111111111111111";
const V4_SHA: &str = "4444444444444444444444444444444444444444";
const MASTER_SHA: &str = "2222222222222222222222222222222222222222";
const V381_SHA: &str = "3333333333333333333333333333333333333333";
const V2_SHA: &str = "5555555555555555555555555555555555555555";

fn call(file: &str, line: usize, uses: &str) -> ActionCall {
    let (target, reference) = uses.split_once('@').expect("uses has @");
    let (organization, repository) = target.split_once('/').expect("owner/name");
    ActionCall {
        file_path: Utf8PathBuf::from(file),
        line_number: line,
        raw_line: format!("      - uses: {uses}"),
        call_kind: CallKind::Action,
        organization: organization.to_string(),
        repository: repository.to_string(),
        action_path: None,
        reference: reference.to_string(),
        reference_kind: classify(reference),
        trailing_comment: None,
    }
}

fn quick_policy() -> NetworkPolicy {
    NetworkPolicy {
        max_retries: 2,
        retry_delay: Duration::ZERO,
        rate_limit_delay: Duration::ZERO,
    }
}

fn fixture_resolver() -> InMemoryResolver {
    InMemoryResolver::new()
        .with_repo(
            "actions/checkout",
            InMemoryRepo::new("main").branch("main", MAIN_SHA).tag("v4", V4_SHA),
        )
        .with_repo(
            "actions/setup-python",
            InMemoryRepo::new("main").branch("main", MAIN_SHA).branch("master", MASTER_SHA),
        )
        .with_repo(
            "actions/setup-node",
            InMemoryRepo::new("main").tag("v3.8.1", V381_SHA),
        )
        .with_repo(
            "actions/upload-artifact",
            InMemoryRepo::new("main").tag("v2", V2_SHA).commit(V2_SHA),
        )
}

fn session(resolver: Arc<InMemoryResolver>, workers: usize) -> RemoteSession {
    RemoteSession::new(resolver, quick_policy(), workers)
}

#[test]
fn only_missing_reference_fails_when_pinning_is_not_required() {
    let resolver = Arc::new(fixture_resolver());
    let session = session(resolver, 4);
    let calls = vec![
        call("ci.yml", 8, "actions/checkout@invalid-branch"),
        call("ci.yml", 10, "actions/setup-python@master"),
        call("ci.yml", 12, "actions/checkout@v4"),
        call("ci.yml", 14, "actions/setup-node@v3.8.1"),
        call("ci.yml", 16, "actions/upload-artifact@v2"),
    ];

    let report = Validator::new(&session)
        .validate_calls(&calls, &ValidationPolicy { require_pinned_sha: false })
        .expect("no abort");

    let results: Vec<_> = report.outcomes.iter().map(|o| o.result).collect();
    assert_eq!(
        results,
        vec![
            ValidationResult::InvalidReference,
            ValidationResult::Valid,
            ValidationResult::Valid,
            ValidationResult::Valid,
            ValidationResult::Valid,
        ]
    );
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].action_call.reference, "invalid-branch");
}

#[test]
fn unpinned_references_are_reported_when_pinning_is_required() {
    let session = session(Arc::new(fixture_resolver()), 2);
    let calls = vec![
        call("ci.yml", 3, "actions/checkout@v4"),
        call("ci.yml", 4, &format!("actions/upload-artifact@{V2_SHA}")),
        call("ci.yml", 5, "actions/upload-artifact@5555555"),
    ];

    let errors = Validator::new(&session)
        .validate(&calls, &ValidationPolicy::default())
        .expect("no abort");

    let summary: Vec<_> = errors.iter().map(|e| (e.line_number(), e.result)).collect();
    assert_eq!(
        summary,
        vec![
            (3, ValidationResult::NotPinnedToSha),
            (5, ValidationResult::NotPinnedToSha),
        ]
    );
}

#[test]
fn all_pinned_file_has_no_findings() {
    let session = session(Arc::new(fixture_resolver()), 4);
    let calls = vec![
        call("ci.yml", 3, &format!("actions/checkout@{V4_SHA}")),
        call("ci.yml", 4, &format!("actions/setup-node@{V381_SHA}")),
    ];
    let errors = Validator::new(&session)
        .validate(&calls, &ValidationPolicy::default())
        .expect("no abort");
    assert!(errors.is_empty());
}

#[test]
fn duplicate_references_hit_the_resolver_once() {
    let resolver = Arc::new(fixture_resolver());
    let session = session(resolver.clone(), 8);
    let calls: Vec<_> = (1..=25)
        .map(|line| call(&format!("wf{}.yml", line % 5), line, "actions/checkout@v4"))
        .collect();

    let report = Validator::new(&session)
        .validate_calls(&calls, &ValidationPolicy { require_pinned_sha: false })
        .expect("no abort");

    assert_eq!(resolver.resolve_calls(), 1);
    assert!(report.outcomes.iter().all(|o| o.result == ValidationResult::Valid));
    assert!(
        report
            .outcomes
            .iter()
            .all(|o| o.resolved.as_ref().map(|r| r.sha.as_str()) == Some(V4_SHA))
    );
}

#[test]
fn concurrent_validations_share_the_run_cache() {
    let resolver = Arc::new(fixture_resolver());
    let session = session(resolver.clone(), 4);
    let calls = vec![
        call("a.yml", 1, "actions/checkout@v4"),
        call("a.yml", 2, "actions/setup-node@v3.8.1"),
    ];

    thread::scope(|s| {
        for _ in 0..6 {
            s.spawn(|| {
                Validator::new(&session)
                    .validate(&calls, &ValidationPolicy { require_pinned_sha: false })
                    .expect("no abort")
            });
        }
    });

    assert_eq!(resolver.resolve_calls(), 2);
}

#[test]
fn transport_failure_never_becomes_invalid_reference() {
    let resolver = Arc::new(
        fixture_resolver().failing_with(RemoteError::Transport("dns lookup failed".into())),
    );
    let session = session(resolver, 4);
    let calls = vec![
        call("ci.yml", 3, "actions/checkout@v4"),
        call("ci.yml", 4, "actions/checkout@invalid-branch"),
        call("ci.yml", 5, "actions/setup-node@v3.8.1"),
    ];

    let abort = Validator::new(&session)
        .validate(&calls, &ValidationPolicy::default())
        .expect_err("run must abort");

    assert!(matches!(abort, RunAbort::Connectivity { attempts: 3, .. }));
    assert_eq!(abort.result(), ValidationResult::NetworkError);
}

#[test]
fn authentication_failure_aborts_the_run() {
    let resolver = Arc::new(
        fixture_resolver().failing_with(RemoteError::Authentication("bad credentials".into())),
    );
    let session = session(resolver.clone(), 1);
    let calls = vec![call("ci.yml", 3, "actions/checkout@v4")];

    let abort = Validator::new(&session)
        .validate(&calls, &ValidationPolicy::default())
        .expect_err("run must abort");

    assert!(matches!(abort, RunAbort::Authentication { .. }));
    assert_eq!(resolver.resolve_calls(), 1);
}

#[test]
fn rate_limit_exhaustion_aborts_the_run() {
    let resolver = Arc::new(fixture_resolver().failing_with(RemoteError::RateLimited {
        message: "API rate limit exceeded".into(),
        retry_after: None,
    }));
    let session = session(resolver.clone(), 2);
    let calls = vec![
        call("ci.yml", 3, "actions/checkout@v4"),
        call("ci.yml", 4, "actions/checkout@invalid-branch"),
    ];

    let abort = Validator::new(&session)
        .validate(&calls, &ValidationPolicy::default())
        .expect_err("run must abort");

    assert!(matches!(abort, RunAbort::RateLimited { attempts: 3, .. }));
    assert_eq!(abort.result(), ValidationResult::RateLimited);
    assert!(session.guard().is_cancelled());
}

#[test]
fn transient_failures_recover_within_retry_budget() {
    let resolver = Arc::new(
        fixture_resolver().failing_times(2, RemoteError::Timeout("slow upstream".into())),
    );
    let session = session(resolver, 1);
    let calls = vec![call("ci.yml", 3, "actions/checkout@v4")];

    let errors = Validator::new(&session)
        .validate(&calls, &ValidationPolicy { require_pinned_sha: false })
        .expect("recovers");
    assert!(errors.is_empty());
}

#[test]
fn malformed_reference_is_invalid_without_a_remote_call() {
    let resolver = Arc::new(fixture_resolver());
    let session = session(resolver.clone(), 2);
    let mut bad = call("ci.yml", 3, "actions/checkout@main");
    bad.reference = "feature..x".into();
    bad.reference_kind = classify("feature..x");

    let errors = Validator::new(&session)
        .validate(&[bad], &ValidationPolicy::default())
        .expect("no abort");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].result, ValidationResult::InvalidReference);
    assert_eq!(resolver.resolve_calls(), 0);
}

#[test]
fn missing_repository_yields_invalid_reference() {
    let session = session(Arc::new(fixture_resolver()), 2);
    let errors = Validator::new(&session)
        .validate(
            &[call("ci.yml", 3, "nobody/nothing@v1")],
            &ValidationPolicy::default(),
        )
        .expect("no abort");
    assert_eq!(errors[0].result, ValidationResult::InvalidReference);
}

#[test]
fn local_workflows_are_skipped() {
    let resolver = Arc::new(fixture_resolver());
    let session = session(resolver.clone(), 2);
    let local = ActionCall {
        call_kind: CallKind::LocalWorkflow,
        organization: String::new(),
        repository: String::new(),
        action_path: Some("./.github/workflows/reuse.yml".into()),
        reference: String::new(),
        reference_kind: classify(""),
        ..call("ci.yml", 3, "x/y@z")
    };

    let report = Validator::new(&session)
        .validate_calls(&[local], &ValidationPolicy::default())
        .expect("no abort");
    assert!(report.outcomes.is_empty());
    assert_eq!(resolver.resolve_calls(), 0);
}

#[test]
fn findings_are_sorted_by_file_then_line() {
    let session = session(Arc::new(fixture_resolver()), 4);
    let calls = vec![
        call("b.yml", 2, "actions/checkout@nope"),
        call("a.yml", 9, "actions/checkout@nope"),
        call("a.yml", 1, "actions/checkout@v4"),
    ];
    let errors = Validator::new(&session)
        .validate(&calls, &ValidationPolicy::default())
        .expect("no abort");
    let order: Vec<_> = errors
        .iter()
        .map(|e| (e.file_path.as_str().to_string(), e.line_number()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("a.yml".to_string(), 1),
            ("a.yml".to_string(), 9),
            ("b.yml".to_string(), 2),
        ]
    );
}
