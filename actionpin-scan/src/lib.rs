//! Workflow discovery and `uses:` extraction.
//!
//! Loading is tolerant: unreadable files and invalid YAML are reported per
//! file and skipped, never fatal to the scan.

mod discover;
mod extract;
mod load;

pub use discover::{ScanOptions, discover_workflow_files};
pub use extract::extract_action_calls;
pub use load::{LoadedWorkflow, ScanError, ScanResult, load_workflow, load_workflows, scan_repository};
