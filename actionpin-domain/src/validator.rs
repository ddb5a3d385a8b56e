use crate::guard::RunAbort;
use crate::pool::map_bounded;
use crate::session::RemoteSession;
use actionpin_types::{
    ActionCall, ReferenceKind, RepoSlug, ResolvedReference, ValidationError, ValidationPolicy,
    ValidationResult,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub call: ActionCall,
    pub result: ValidationResult,
    pub resolved: Option<ResolvedReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// One entry per remote call site, sorted by (file, line).
    pub outcomes: Vec<CallOutcome>,
    /// Policy findings only, sorted by (file, line).
    pub errors: Vec<ValidationError>,
}

pub struct Validator<'a> {
    session: &'a RemoteSession,
}

impl<'a> Validator<'a> {
    pub fn new(session: &'a RemoteSession) -> Self {
        Self { session }
    }

    pub fn validate(
        &self,
        calls: &[ActionCall],
        policy: &ValidationPolicy,
    ) -> Result<Vec<ValidationError>, RunAbort> {
        Ok(self.validate_calls(calls, policy)?.errors)
    }

    /// Classify every call against the remote.
    ///
    /// Lookups are deduplicated by (repository, reference) and batched per
    /// repository. Any run-level failure discards partial results.
    pub fn validate_calls(
        &self,
        calls: &[ActionCall],
        policy: &ValidationPolicy,
    ) -> Result<ValidationReport, RunAbort> {
        let mut lookups: BTreeMap<RepoSlug, BTreeSet<String>> = BTreeMap::new();
        for call in calls {
            if let Some(repo) = call.repo()
                && call.reference_kind != ReferenceKind::Unknown
            {
                lookups
                    .entry(repo)
                    .or_default()
                    .insert(call.reference.clone());
            }
        }

        let groups: Vec<(RepoSlug, Vec<String>)> = lookups
            .into_iter()
            .map(|(repo, refs)| (repo, refs.into_iter().collect()))
            .collect();
        debug!(
            repositories = groups.len(),
            calls = calls.len(),
            "validating action calls"
        );

        let guard = self.session.guard();
        let batches = map_bounded(
            self.session.workers(),
            &groups,
            || guard.is_cancelled(),
            |(repo, refs)| self.session.resolve_many(repo, refs),
        );

        let mut resolved: HashMap<(RepoSlug, String), Option<ResolvedReference>> = HashMap::new();
        for ((repo, _), batch) in groups.iter().zip(batches) {
            match batch {
                Some(Ok(map)) => {
                    for (reference, outcome) in map {
                        resolved.insert((repo.clone(), reference), outcome);
                    }
                }
                Some(Err(abort)) => return Err(abort),
                None => {
                    return Err(guard.abort_reason().unwrap_or_else(|| RunAbort::Cancelled {
                        operation: format!("resolving references of {repo}"),
                    }));
                }
            }
        }
        if let Some(abort) = guard.abort_reason() {
            return Err(abort);
        }

        let mut outcomes = Vec::new();
        for call in calls {
            let Some(repo) = call.repo() else {
                continue;
            };
            let found = if call.reference_kind == ReferenceKind::Unknown {
                None
            } else {
                resolved
                    .get(&(repo, call.reference.clone()))
                    .cloned()
                    .flatten()
            };
            let result = classify_outcome(call, found.as_ref(), policy);
            debug!(
                path = %call.file_path,
                line = call.line_number,
                uses = %call.uses_token(),
                result = %result,
                "validated"
            );
            outcomes.push(CallOutcome {
                call: call.clone(),
                result,
                resolved: found,
            });
        }

        outcomes.sort_by(|a, b| {
            (&a.call.file_path, a.call.line_number).cmp(&(&b.call.file_path, b.call.line_number))
        });

        let errors: Vec<ValidationError> = outcomes
            .iter()
            .filter(|o| o.result.is_policy_finding())
            .map(|o| ValidationError::new(&o.call, o.result))
            .collect();

        info!(
            checked = outcomes.len(),
            findings = errors.len(),
            "validation finished"
        );
        Ok(ValidationReport { outcomes, errors })
    }
}

fn classify_outcome(
    call: &ActionCall,
    resolved: Option<&ResolvedReference>,
    policy: &ValidationPolicy,
) -> ValidationResult {
    match resolved {
        None => ValidationResult::InvalidReference,
        Some(_) if policy.require_pinned_sha && !call.reference_kind.is_pinned() => {
            ValidationResult::NotPinnedToSha
        }
        Some(_) => ValidationResult::Valid,
    }
}
