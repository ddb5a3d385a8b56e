use actionpin_types::{ActionCall, CallKind, ReferenceKind, classify};
use camino::Utf8Path;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

// A `uses:` key as a list item (`- uses:`) or a mapping key (job-level
// reusable workflow). Quotes around the value are optional.
static USES_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:-\s+)?uses:\s*(?P<open>["']?)(?P<value>[^\s"'#]+)(?P<close>["']?)(?P<rest>.*)$"#)
        .expect("static regex")
});

static TRAILING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\s?(?P<comment>.*)$").expect("static regex"));

/// Extract every `uses:` occurrence from a file's contents.
///
/// Line numbers are 1-based. `raw_line` excludes the line terminator.
pub fn extract_action_calls(path: &Utf8Path, contents: &str) -> Vec<ActionCall> {
    let mut out = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let Some(caps) = USES_LINE.captures(line) else {
            continue;
        };
        if caps["open"] != caps["close"] {
            debug!(path = %path, line = idx + 1, "skipping mismatched quotes");
            continue;
        }

        let value = &caps["value"];
        let trailing_comment = TRAILING_COMMENT
            .captures(&caps["rest"])
            .map(|c| c["comment"].trim_end().to_string());

        if let Some(call) = parse_uses_value(path, idx + 1, line, value, trailing_comment) {
            out.push(call);
        }
    }

    out
}

fn parse_uses_value(
    path: &Utf8Path,
    line_number: usize,
    raw_line: &str,
    value: &str,
    trailing_comment: Option<String>,
) -> Option<ActionCall> {
    if value.starts_with("docker://") {
        return None;
    }

    if value.starts_with("./") {
        return Some(ActionCall {
            file_path: path.to_path_buf(),
            line_number,
            raw_line: raw_line.to_string(),
            call_kind: CallKind::LocalWorkflow,
            organization: String::new(),
            repository: String::new(),
            action_path: Some(value.to_string()),
            reference: String::new(),
            reference_kind: ReferenceKind::Unknown,
            trailing_comment,
        });
    }

    // A missing `@ref` is kept as an empty (unknown) reference so it gets
    // reported instead of silently skipped.
    let (target, reference) = value.rsplit_once('@').unwrap_or((value, ""));

    let mut segments = target.splitn(3, '/');
    let organization = segments.next().filter(|s| !s.is_empty())?;
    let repository = segments.next().filter(|s| !s.is_empty())?;
    let action_path = segments.next().filter(|s| !s.is_empty()).map(str::to_string);

    if !is_name(organization) || !is_name(repository) {
        debug!(path = %path, line = line_number, value, "skipping unrecognized uses value");
        return None;
    }

    let call_kind = match &action_path {
        Some(p) if is_workflow_path(p) => CallKind::ReusableWorkflow,
        _ => CallKind::Action,
    };

    Some(ActionCall {
        file_path: path.to_path_buf(),
        line_number,
        raw_line: raw_line.to_string(),
        call_kind,
        organization: organization.to_string(),
        repository: repository.to_string(),
        action_path,
        reference: reference.to_string(),
        reference_kind: classify(reference),
        trailing_comment,
    })
}

fn is_name(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn is_workflow_path(p: &str) -> bool {
    p.starts_with(".github/workflows/") && (p.ends_with(".yml") || p.ends_with(".yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKFLOW: &str = r#"name: CI
on: [push]
jobs:
  call:
    uses: octo-org/shared/.github/workflows/build.yml@v1
  test:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4 # keep
      - name: Setup
        uses: "actions/setup-python@v5.1.0"
      # - uses: actions/cache@v3
      - uses: github/codeql-action/init@8ade135a41bc03ea155e62e844d188df1ea18608  # v3.1.0
      - uses: ./.github/actions/local
      - uses: docker://alpine:3.19
"#;

    #[test]
    fn extracts_calls_with_line_numbers() {
        let calls = extract_action_calls(Utf8Path::new("ci.yml"), WORKFLOW);
        let summary: Vec<_> = calls
            .iter()
            .map(|c| (c.line_number, c.call_kind, c.uses_token(), c.reference_kind))
            .collect();

        assert_eq!(
            summary,
            vec![
                (
                    5,
                    CallKind::ReusableWorkflow,
                    "octo-org/shared/.github/workflows/build.yml@v1".to_string(),
                    ReferenceKind::Tag,
                ),
                (9, CallKind::Action, "actions/checkout@v4".to_string(), ReferenceKind::Tag),
                (
                    11,
                    CallKind::Action,
                    "actions/setup-python@v5.1.0".to_string(),
                    ReferenceKind::Tag,
                ),
                (
                    13,
                    CallKind::Action,
                    "github/codeql-action/init@8ade135a41bc03ea155e62e844d188df1ea18608"
                        .to_string(),
                    ReferenceKind::Sha,
                ),
                (
                    14,
                    CallKind::LocalWorkflow,
                    "./.github/actions/local".to_string(),
                    ReferenceKind::Unknown,
                ),
            ]
        );
    }

    #[test]
    fn captures_trailing_comment_and_raw_line() {
        let calls = extract_action_calls(Utf8Path::new("ci.yml"), WORKFLOW);
        let checkout = &calls[1];
        assert_eq!(checkout.raw_line, "      - uses: actions/checkout@v4 # keep");
        assert_eq!(checkout.trailing_comment.as_deref(), Some("keep"));
        assert_eq!(calls[3].trailing_comment.as_deref(), Some("v3.1.0"));
        assert_eq!(calls[2].trailing_comment, None);
    }

    #[test]
    fn crlf_lines_do_not_leak_carriage_returns() {
        let contents = "steps:\r\n  - uses: actions/checkout@main\r\n";
        let calls = extract_action_calls(Utf8Path::new("ci.yml"), contents);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].reference, "main");
        assert_eq!(calls[0].raw_line, "  - uses: actions/checkout@main");
    }

    #[test]
    fn missing_reference_is_kept_as_unknown() {
        let calls = extract_action_calls(Utf8Path::new("ci.yml"), "  - uses: actions/checkout\n");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].reference, "");
        assert_eq!(calls[0].reference_kind, ReferenceKind::Unknown);
    }

    #[test]
    fn expressions_are_not_action_calls() {
        let calls =
            extract_action_calls(Utf8Path::new("ci.yml"), "  - uses: ${{ matrix.action }}\n");
        assert!(calls.is_empty());
    }
}
