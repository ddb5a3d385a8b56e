//! Rewrite engine for remediations.
//!
//! Responsibilities:
//! - Rewrite exactly the affected `uses:` lines, preserving every other byte
//!   (line terminators included).
//! - Check each line still matches what was scanned before touching a file.
//! - Write each changed file once; report failures per file.
//! - Produce a unified diff preview and sha256 before/after per file.

mod error;
mod line;

pub use error::EditError;
pub use line::rewrite_uses_line;

use actionpin_types::fix::{
    FileChange, FileEdit, FileFailure, FixOutcome, Remediation, UnfixedError,
};
use camino::Utf8PathBuf;
use diffy::PatchFormatter;
use fs_err as fs;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub two_space_comments: bool,
    /// Compute edits and the patch without writing anything.
    pub dry_run: bool,
}

/// Apply remediations to disk (or just plan them, on a dry run).
///
/// Files with no effective change are never rewritten.
pub fn apply_remediations(remediations: &[Remediation], opts: &ApplyOptions) -> FixOutcome {
    let mut by_file: BTreeMap<Utf8PathBuf, Vec<&Remediation>> = BTreeMap::new();
    for r in remediations {
        by_file.entry(r.error.file_path.clone()).or_default().push(r);
    }

    let mut outcome = FixOutcome {
        dry_run: opts.dry_run,
        ..FixOutcome::default()
    };
    let mut before = BTreeMap::new();
    let mut after = BTreeMap::new();

    for (path, mut items) in by_file {
        items.sort_by_key(|r| r.error.action_call.line_number);

        let planned = match plan_file(&path, &items, opts) {
            Ok(planned) => planned,
            Err(e) => {
                warn!(path = %path, error = %e, "skipping file");
                outcome.failures.push(FileFailure {
                    path: e.path().clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        outcome.unfixed.extend(planned.unfixed);

        if planned.edits.is_empty() {
            debug!(path = %path, "no effective change");
            continue;
        }

        if !opts.dry_run
            && let Err(source) = fs::write(&path, &planned.new_contents)
        {
            let e = EditError::Write {
                path: path.clone(),
                source,
            };
            warn!(path = %path, error = %e, "write failed");
            outcome.failures.push(FileFailure {
                path: path.clone(),
                reason: e.to_string(),
            });
            continue;
        }

        info!(
            path = %path,
            edits = planned.edits.len(),
            dry_run = opts.dry_run,
            "rewrote workflow"
        );
        outcome.changes.push(FileChange {
            path: path.clone(),
            sha256_before: sha256_hex(planned.old_contents.as_bytes()),
            sha256_after: sha256_hex(planned.new_contents.as_bytes()),
            edits: planned.edits.clone(),
        });
        outcome.applied.insert(path.clone(), planned.edits);
        before.insert(path.clone(), planned.old_contents);
        after.insert(path, planned.new_contents);
    }

    outcome.patch = render_patch(&before, &after);
    outcome
}

struct PlannedFile {
    old_contents: String,
    new_contents: String,
    edits: Vec<FileEdit>,
    unfixed: Vec<UnfixedError>,
}

fn plan_file(
    path: &Utf8PathBuf,
    items: &[&Remediation],
    opts: &ApplyOptions,
) -> Result<PlannedFile, EditError> {
    let old_contents = fs::read_to_string(path).map_err(|source| EditError::Read {
        path: path.clone(),
        source,
    })?;

    let mut lines: Vec<(String, &str)> = old_contents
        .split_inclusive('\n')
        .map(split_terminator)
        .map(|(body, term)| (body.to_string(), term))
        .collect();

    let mut edits = Vec::new();
    let mut unfixed = Vec::new();

    for r in items {
        let call = &r.error.action_call;
        let idx = call.line_number.saturating_sub(1);
        let Some((body, _)) = lines.get_mut(idx) else {
            return Err(EditError::PreconditionMismatch {
                path: path.clone(),
                line: call.line_number,
                message: format!("file has only {} lines", old_contents.lines().count()),
            });
        };
        if *body != call.raw_line {
            return Err(EditError::PreconditionMismatch {
                path: path.clone(),
                line: call.line_number,
                message: "line changed since it was scanned".to_string(),
            });
        }

        let Some(new_text) = rewrite_uses_line(
            call,
            &r.sha,
            r.annotation.as_deref(),
            opts.two_space_comments,
        ) else {
            unfixed.push(UnfixedError {
                error: r.error.clone(),
                reason: format!("could not locate {} on the line", call.uses_token()),
            });
            continue;
        };

        if new_text == *body {
            continue;
        }
        edits.push(FileEdit {
            line_number: call.line_number,
            old_text: body.clone(),
            new_text: new_text.clone(),
        });
        *body = new_text;
    }

    let new_contents: String = lines
        .iter()
        .map(|(body, term)| format!("{body}{term}"))
        .collect();

    Ok(PlannedFile {
        old_contents,
        new_contents,
        edits,
        unfixed,
    })
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{path} b/{path}\n"));
        out.push_str(&format!("--- a/{path}\n+++ b/{path}\n"));
        let patch = diffy::create_patch(old, new);
        let body = formatter.fmt_patch(&patch).to_string();
        // diffy repeats its own ---/+++ header; keep only the hunks.
        let hunks = body.find("@@").map_or(body.as_str(), |i| &body[i..]);
        out.push_str(hunks);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
