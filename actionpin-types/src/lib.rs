//! Shared DTOs for the actionpin workspace.
//!
//! # Design constraints
//! - Records produced by the scanner are immutable once built.
//! - Report types are serialized to disk; prefer adding optional fields over
//!   changing semantics.

pub mod action;
pub mod fix;
pub mod reference;
pub mod remote;
pub mod report;
pub mod validation;

pub use action::{ActionCall, CallKind, RepoSlug};
pub use reference::{ReferenceKind, classify};
pub use remote::{RefKind, RepositoryInfo, ResolvedReference};
pub use validation::{ValidationError, ValidationPolicy, ValidationResult};

/// Schema identifiers.
pub mod schema {
    pub const ACTIONPIN_REPORT_V1: &str = "actionpin.report.v1";
}
