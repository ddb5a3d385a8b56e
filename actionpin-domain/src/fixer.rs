//! Remediation decisions: which reference a finding moves to, and its SHA.
//!
//! No text is touched here; line surgery lives in `actionpin-edit`.

use crate::guard::RunAbort;
use crate::pool::map_bounded;
use crate::session::RemoteSession;
use actionpin_types::fix::{Remediation, UnfixedError};
use actionpin_types::{ReferenceKind, ValidationError, ValidationResult, classify};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemediationPlan {
    pub remediations: Vec<Remediation>,
    pub unfixed: Vec<UnfixedError>,
}

pub struct AutoFixer<'a> {
    session: &'a RemoteSession,
    auto_latest: bool,
}

impl<'a> AutoFixer<'a> {
    pub fn new(session: &'a RemoteSession, auto_latest: bool) -> Self {
        Self {
            session,
            auto_latest,
        }
    }

    /// Decide a remediation for every finding. Results keep input order.
    pub fn plan(&self, errors: &[ValidationError]) -> Result<RemediationPlan, RunAbort> {
        let guard = self.session.guard();
        let decided = map_bounded(
            self.session.workers(),
            errors,
            || guard.is_cancelled(),
            |error| self.remediate(error),
        );

        let mut plan = RemediationPlan::default();
        for (error, decision) in errors.iter().zip(decided) {
            match decision {
                Some(Ok(Ok(remediation))) => plan.remediations.push(remediation),
                Some(Ok(Err(unfixed))) => {
                    warn!(
                        path = %error.file_path,
                        line = error.line_number(),
                        reason = %unfixed.reason,
                        "cannot fix"
                    );
                    plan.unfixed.push(unfixed);
                }
                Some(Err(abort)) => return Err(abort),
                None => {
                    return Err(guard.abort_reason().unwrap_or_else(|| RunAbort::Cancelled {
                        operation: format!("fixing {}", error.action_call.uses_token()),
                    }));
                }
            }
        }
        Ok(plan)
    }

    fn remediate(
        &self,
        error: &ValidationError,
    ) -> Result<Result<Remediation, UnfixedError>, RunAbort> {
        let unfixed = |reason: String| {
            Ok(Err(UnfixedError {
                error: error.clone(),
                reason,
            }))
        };

        let call = &error.action_call;
        let Some(repo) = call.repo() else {
            return unfixed("local workflows are not remediated".to_string());
        };

        let target = match error.result {
            ValidationResult::InvalidReference => {
                match self.session.fallback_reference(&repo, &call.reference)? {
                    Some(fallback) => fallback,
                    None => {
                        return unfixed(format!(
                            "no fallback for {}: repository {repo} could not be found",
                            call.uses_token()
                        ));
                    }
                }
            }
            ValidationResult::NotPinnedToSha => match call.reference_kind {
                ReferenceKind::Tag if self.auto_latest => self
                    .session
                    .latest_tag(&repo)?
                    .unwrap_or_else(|| call.reference.clone()),
                ReferenceKind::Branch if self.auto_latest => self
                    .session
                    .repository_info(&repo)?
                    .map(|info| info.default_branch)
                    .unwrap_or_else(|| call.reference.clone()),
                _ => call.reference.clone(),
            },
            other => return unfixed(format!("{other} is not a fixable finding")),
        };

        let Some(resolved) = self.session.resolve(&repo, &target)? else {
            return unfixed(format!("{repo}@{target} did not resolve to a commit"));
        };

        // A SHA-like target keeps whatever comment the line already has.
        let annotation = match classify(&target) {
            ReferenceKind::Sha | ReferenceKind::ShortSha if call.trailing_comment.is_some() => None,
            _ => Some(target.clone()),
        };

        debug!(
            uses = %call.uses_token(),
            target = %target,
            sha = %resolved.sha,
            "remediation decided"
        );
        Ok(Ok(Remediation {
            error: error.clone(),
            target_reference: target,
            sha: resolved.sha,
            annotation,
        }))
    }
}
