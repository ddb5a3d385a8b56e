//! Rendering helpers for human-readable lint output.

use actionpin_types::report::{LintReport, ReportStatus};

/// Terminal summary printed after a lint run.
pub fn render_summary_text(report: &LintReport) -> String {
    let counts = &report.verdict.counts;
    let mut out = String::new();

    out.push_str(&format!(
        "Scanned {} workflow file(s), {} action call(s)\n",
        counts.files_scanned, counts.action_calls
    ));

    if let Some(abort) = &report.abort {
        out.push_str(&format!("\nValidation aborted ({}): {}\n", abort.kind, abort.message));
        out.push_str(&format!("  {}\n", abort.remediation));
        push_warnings(&mut out, report);
        return out;
    }

    if counts.invalid_references == 0 && counts.not_pinned == 0 {
        out.push_str("All action calls are valid\n");
    } else {
        if counts.invalid_references > 0 {
            out.push_str(&format!(
                "{} invalid {}\n",
                counts.invalid_references,
                plural(counts.invalid_references, "reference", "references")
            ));
        }
        if counts.not_pinned > 0 {
            out.push_str(&format!(
                "{} {} not pinned to SHA\n",
                counts.not_pinned,
                plural(counts.not_pinned, "action", "actions")
            ));
        }
        out.push('\n');
        for f in &report.findings {
            out.push_str(&format!(
                "  {}:{}  {}  ({})\n",
                f.location.path,
                f.location.line,
                f.uses,
                f.code.replace('_', " ")
            ));
        }
    }

    if counts.files_fixed > 0 {
        let verb = if report.run.dry_run {
            "Would auto-fix"
        } else {
            "Auto-fixed"
        };
        out.push_str(&format!(
            "\n{verb} issues in {} file(s) ({} line(s))\n",
            counts.files_fixed, counts.lines_fixed
        ));
        for change in &report.fixes {
            for edit in &change.edits {
                out.push_str(&format!(
                    "  {}:{}  {}\n",
                    change.path,
                    edit.line_number,
                    edit.new_text.trim()
                ));
            }
        }
    }

    if !report.unfixed.is_empty() {
        out.push_str(&format!("\nCould not fix {} issue(s):\n", report.unfixed.len()));
        for u in &report.unfixed {
            out.push_str(&format!(
                "  {}:{}  {}: {}\n",
                u.location.path, u.location.line, u.uses, u.reason
            ));
        }
    }

    if !report.write_failures.is_empty() {
        out.push_str(&format!(
            "\nFailed to write {} file(s):\n",
            report.write_failures.len()
        ));
        for w in &report.write_failures {
            out.push_str(&format!("  {}: {}\n", w.path, w.reason));
        }
    }

    push_warnings(&mut out, report);
    out
}

fn push_warnings(out: &mut String, report: &LintReport) {
    if report.warnings.is_empty() {
        return;
    }
    out.push_str(&format!("\nSkipped {} file(s):\n", report.warnings.len()));
    for w in &report.warnings {
        out.push_str(&format!("  {}: {}\n", w.path, w.message));
    }
}

/// Markdown rendering of the same report, for CI job summaries.
pub fn render_report_md(report: &LintReport) -> String {
    let counts = &report.verdict.counts;
    let mut out = String::new();
    out.push_str("# actionpin report\n\n");
    out.push_str(&format!("- Status: `{}`\n", status_label(report.verdict.status)));
    out.push_str(&format!(
        "- Validation method: `{}`\n",
        report.run.validation_method
    ));
    out.push_str(&format!(
        "- Files scanned: {}\n- Action calls: {}\n- Invalid references: {}\n- Not pinned: {}\n- Lines fixed: {}\n\n",
        counts.files_scanned,
        counts.action_calls,
        counts.invalid_references,
        counts.not_pinned,
        counts.lines_fixed
    ));

    if let Some(abort) = &report.abort {
        out.push_str("## Aborted\n\n");
        out.push_str(&format!("- Kind: `{}`\n", abort.kind));
        out.push_str(&format!("- Message: {}\n", abort.message));
        out.push_str(&format!("- Remediation: {}\n", abort.remediation));
        return out;
    }

    out.push_str("## Findings\n\n");
    if report.findings.is_empty() {
        out.push_str("_No findings._\n");
    } else {
        out.push_str("| Location | Uses | Code |\n|---|---|---|\n");
        for f in &report.findings {
            out.push_str(&format!(
                "| `{}:{}` | `{}` | `{}` |\n",
                f.location.path, f.location.line, f.uses, f.code
            ));
        }
    }

    if !report.fixes.is_empty() {
        out.push_str("\n## Fixes\n\n");
        for fc in &report.fixes {
            out.push_str(&format!(
                "- `{}` {} → {}\n",
                fc.path, fc.sha256_before, fc.sha256_after
            ));
        }
    }

    if !report.unfixed.is_empty() {
        out.push_str("\n## Not fixed\n\n");
        for u in &report.unfixed {
            out.push_str(&format!(
                "- `{}:{}` `{}`: {}\n",
                u.location.path, u.location.line, u.uses, u.reason
            ));
        }
    }

    out
}

fn plural<'a>(n: u64, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

fn status_label(s: ReportStatus) -> &'static str {
    match s {
        ReportStatus::Pass => "pass",
        ReportStatus::Fail => "fail",
        ReportStatus::Error => "error",
    }
}
