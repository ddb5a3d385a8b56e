//! Embeddable core library for actionpin.
//!
//! Provides a clap-free entry point: scan a repository, validate every
//! `uses:` reference against a remote, and optionally rewrite the findings
//! to pinned SHAs.
//!
//! # Ports
//!
//! - [`RemoteResolver`](actionpin_domain::RemoteResolver) answers questions
//!   about remote repositories; [`adapters::build_resolver`] picks the
//!   configured strategy.
//! - [`WritePort`](ports::WritePort) writes report artifacts.
//!
//! # Entry points
//!
//! - [`run_lint`](pipeline::run_lint) scan + validate + fix + report
//! - [`validate`](pipeline::validate) and [`fix`](pipeline::fix) for callers
//!   that already hold action calls

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use pipeline::{FixOptions, LintOutcome, ToolError, fix, run_lint, validate, write_report};
pub use settings::{LintSettings, ValidationMethod};

// Re-exported so embedders don't need actionpin-domain directly.
pub use actionpin_domain::{RemoteResolver, RemoteSession, RunAbort};
