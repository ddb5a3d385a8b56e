//! Validation and remediation decisions.
//!
//! Everything that talks to a remote goes through [`RemoteSession`], which
//! owns the run cache and the [`NetworkGuard`]. The session is built per run
//! and dropped with it; nothing persists between runs.

pub mod adapters;
pub mod cache;
pub mod fixer;
pub mod guard;
pub mod pool;
pub mod ports;
pub mod session;
pub mod validator;

pub use fixer::{AutoFixer, RemediationPlan};
pub use guard::{NetworkGuard, NetworkPolicy, RunAbort};
pub use ports::{RemoteError, RemoteResolver};
pub use session::RemoteSession;
pub use validator::{CallOutcome, ValidationReport, Validator};
