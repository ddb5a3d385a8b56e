//! The lint pipeline: scan, validate, fix, report.
//!
//! All remote access goes through the run's [`RemoteSession`]; report output
//! goes through [`WritePort`]. Workflow files themselves are rewritten by
//! `actionpin-edit`.

use crate::ports::WritePort;
use crate::settings::LintSettings;
use actionpin_domain::{AutoFixer, RemoteResolver, RemoteSession, RunAbort, Validator};
use actionpin_edit::{ApplyOptions, apply_remediations};
use actionpin_scan::{ScanOptions, ScanResult, scan_repository};
use actionpin_types::fix::{FileChange, FileFailure, FixOutcome};
use actionpin_types::report::{
    LintReport, ReportAbort, ReportCounts, ReportFinding, ReportLocation, ReportRunInfo,
    ReportStatus, ReportToolInfo, ReportUnfixed, ReportVerdict, ReportWarning,
};
use actionpin_types::{ActionCall, ValidationError, ValidationPolicy, ValidationResult};
use anyhow::Context;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Error type for pipeline results. Both map to exit code 2.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Network, authentication or rate-limit failure. The report carries the
    /// abort and no per-line findings.
    #[error("{abort}")]
    Aborted {
        abort: RunAbort,
        report: Box<LintReport>,
    },
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    pub auto_latest: bool,
    pub two_space_comments: bool,
    pub dry_run: bool,
}

/// Outcome of `run_lint`.
#[derive(Debug)]
pub struct LintOutcome {
    pub scan: ScanResult,
    pub errors: Vec<ValidationError>,
    /// `None` when fixing was disabled or there was nothing to fix.
    pub fix: Option<FixOutcome>,
    pub report: LintReport,
}

impl LintOutcome {
    /// 0 when clean, 1 when anything was found (fixed or not).
    pub fn exit_code(&self) -> u8 {
        let write_failures = self.fix.as_ref().is_some_and(|f| !f.failures.is_empty());
        if self.errors.is_empty() && !write_failures {
            0
        } else {
            1
        }
    }
}

/// Per-line findings for `calls`. A run-level failure replaces them all.
pub fn validate(
    session: &RemoteSession,
    calls: &[ActionCall],
    policy: &ValidationPolicy,
) -> Result<Vec<ValidationError>, RunAbort> {
    Validator::new(session).validate(calls, policy)
}

/// Decide remediations for `errors` and rewrite the affected lines.
///
/// Findings that cannot be fixed (no fallback, unresolvable target, token not
/// found on the line) end up in `unfixed`, sorted by (file, line).
pub fn fix(
    session: &RemoteSession,
    errors: &[ValidationError],
    opts: &FixOptions,
) -> Result<FixOutcome, RunAbort> {
    let plan = AutoFixer::new(session, opts.auto_latest).plan(errors)?;

    let mut outcome = apply_remediations(
        &plan.remediations,
        &ApplyOptions {
            two_space_comments: opts.two_space_comments,
            dry_run: opts.dry_run,
        },
    );

    let mut unfixed = plan.unfixed;
    unfixed.append(&mut outcome.unfixed);
    unfixed.sort_by(|a, b| {
        (&a.error.file_path, a.error.line_number()).cmp(&(&b.error.file_path, b.error.line_number()))
    });
    outcome.unfixed = unfixed;

    info!(
        files = outcome.files_fixed(),
        lines = outcome.lines_fixed(),
        unfixed = outcome.unfixed.len(),
        failures = outcome.failures.len(),
        dry_run = opts.dry_run,
        "fix finished"
    );
    Ok(outcome)
}

/// Run the whole pipeline over `settings.root`.
///
/// The caller owns output: print the report summary, write the JSON report
/// (see [`write_report`]), print the patch on a dry run.
pub fn run_lint(
    settings: &LintSettings,
    resolver: Arc<dyn RemoteResolver>,
    tool: ReportToolInfo,
) -> Result<LintOutcome, ToolError> {
    let started = Utc::now();

    let scan = scan_repository(
        &settings.root,
        &ScanOptions {
            skip_actions: settings.skip_actions,
        },
    )
    .with_context(|| format!("scan workflows under {}", settings.root))?;
    info!(
        files = scan.files.len(),
        calls = scan.calls.len(),
        skipped = scan.skipped.len(),
        "scan finished"
    );

    let session = RemoteSession::new(resolver, settings.network_policy(), settings.workers());
    let ctx = ReportContext {
        settings,
        tool: &tool,
        started,
        method: session.resolver_name(),
        scan: &scan,
    };

    let errors = match validate(&session, &scan.calls, &settings.validation_policy()) {
        Ok(errors) => errors,
        Err(abort) => {
            let report = build_report(&ctx, &[], None, Some(&abort));
            return Err(ToolError::Aborted {
                abort,
                report: Box::new(report),
            });
        }
    };

    let fixed = if settings.auto_fix && !errors.is_empty() {
        let opts = FixOptions {
            auto_latest: settings.auto_latest,
            two_space_comments: settings.two_space_comments,
            dry_run: settings.dry_run,
        };
        match fix(&session, &errors, &opts) {
            Ok(outcome) => Some(outcome),
            Err(abort) => {
                let report = build_report(&ctx, &[], None, Some(&abort));
                return Err(ToolError::Aborted {
                    abort,
                    report: Box::new(report),
                });
            }
        }
    } else {
        None
    };

    let report = build_report(&ctx, &errors, fixed.as_ref(), None);
    Ok(LintOutcome {
        scan,
        errors,
        fix: fixed,
        report,
    })
}

/// Serialize `report` as pretty JSON to `path`.
pub fn write_report(report: &LintReport, path: &Utf8Path, writer: &dyn WritePort) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    writer.write_file(path, json.as_bytes())?;
    Ok(())
}

// ── report helpers ───────────────────────────────────────────────────────

struct ReportContext<'a> {
    settings: &'a LintSettings,
    tool: &'a ReportToolInfo,
    started: DateTime<Utc>,
    method: &'static str,
    scan: &'a ScanResult,
}

fn build_report(
    ctx: &ReportContext<'_>,
    errors: &[ValidationError],
    fixed: Option<&FixOutcome>,
    abort: Option<&RunAbort>,
) -> LintReport {
    let root = ctx.settings.root.as_path();
    let ended = Utc::now();

    let findings: Vec<ReportFinding> = errors
        .iter()
        .map(|e| ReportFinding {
            code: e.result.as_str().to_string(),
            message: e.error_message.clone(),
            location: location(root, &e.file_path, e.line_number()),
            uses: e.action_call.uses_token(),
            reference_kind: e.action_call.reference_kind.as_str().to_string(),
        })
        .collect();

    let unfixed: Vec<ReportUnfixed> = fixed
        .map(|f| {
            f.unfixed
                .iter()
                .map(|u| ReportUnfixed {
                    location: location(root, &u.error.file_path, u.error.line_number()),
                    uses: u.error.action_call.uses_token(),
                    reason: u.reason.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let warnings: Vec<ReportWarning> = ctx
        .scan
        .skipped
        .iter()
        .map(|(path, err)| ReportWarning {
            path: relative(root, path),
            message: err.to_string(),
        })
        .collect();

    let count = |r: ValidationResult| errors.iter().filter(|e| e.result == r).count() as u64;
    let counts = ReportCounts {
        files_scanned: ctx.scan.files.len() as u64,
        action_calls: ctx.scan.calls.len() as u64,
        invalid_references: count(ValidationResult::InvalidReference),
        not_pinned: count(ValidationResult::NotPinnedToSha),
        lines_fixed: fixed.map_or(0, |f| f.lines_fixed() as u64),
        files_fixed: fixed.map_or(0, |f| f.files_fixed() as u64),
        unfixed: unfixed.len() as u64,
        write_failures: fixed.map_or(0, |f| f.failures.len() as u64),
    };

    let mut reasons = Vec::new();
    if let Some(abort) = abort {
        reasons.push(format!("aborted:{}", abort.result()));
    }
    if counts.invalid_references > 0 {
        reasons.push("invalid_references".to_string());
    }
    if counts.not_pinned > 0 {
        reasons.push("not_pinned".to_string());
    }
    if counts.unfixed > 0 {
        reasons.push("unfixed".to_string());
    }
    if counts.write_failures > 0 {
        reasons.push("write_failures".to_string());
    }
    if !warnings.is_empty() {
        reasons.push("skipped_files".to_string());
    }

    let status = if abort.is_some() {
        ReportStatus::Error
    } else if errors.is_empty() && counts.write_failures == 0 {
        ReportStatus::Pass
    } else {
        ReportStatus::Fail
    };

    LintReport {
        schema: actionpin_types::schema::ACTIONPIN_REPORT_V1.to_string(),
        tool: ctx.tool.clone(),
        run: ReportRunInfo {
            started_at: ctx.started.to_rfc3339(),
            ended_at: Some(ended.to_rfc3339()),
            duration_ms: Some((ended - ctx.started).num_milliseconds().max(0) as u64),
            validation_method: ctx.method.to_string(),
            dry_run: ctx.settings.dry_run,
        },
        verdict: ReportVerdict {
            status,
            counts,
            reasons,
        },
        findings,
        fixes: fixed
            .map(|f| {
                f.changes
                    .iter()
                    .map(|c| FileChange {
                        path: relative(root, &c.path).into(),
                        ..c.clone()
                    })
                    .collect()
            })
            .unwrap_or_default(),
        unfixed,
        write_failures: fixed
            .map(|f| {
                f.failures
                    .iter()
                    .map(|w| FileFailure {
                        path: relative(root, &w.path).into(),
                        reason: w.reason.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        warnings,
        abort: abort.map(|a| ReportAbort {
            kind: a.result().as_str().to_string(),
            message: a.to_string(),
            remediation: a.remediation().to_string(),
        }),
    }
}

fn location(root: &Utf8Path, path: &Utf8Path, line: usize) -> ReportLocation {
    ReportLocation {
        path: relative(root, path),
        line,
    }
}

fn relative(root: &Utf8Path, path: &Utf8Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .as_str()
        .replace('\\', "/")
}
