use crate::discover::{ScanOptions, discover_workflow_files};
use crate::extract::extract_action_calls;
use actionpin_types::ActionCall;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct LoadedWorkflow {
    pub path: Utf8PathBuf,
    pub calls: Result<Vec<ActionCall>, ScanError>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("io error: {message}")]
    Io { message: String },

    #[error("invalid yaml: {message}")]
    Yaml { message: String },
}

/// Everything a scan produced, flattened.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files: Vec<Utf8PathBuf>,
    pub calls: Vec<ActionCall>,
    /// Files that were skipped, with the reason.
    pub skipped: Vec<(Utf8PathBuf, ScanError)>,
}

pub fn load_workflow(path: &Utf8Path) -> LoadedWorkflow {
    let calls = match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<serde_yaml::Value>(&contents) {
            Ok(_) => Ok(extract_action_calls(path, &contents)),
            Err(e) => Err(ScanError::Yaml {
                message: e.to_string(),
            }),
        },
        Err(e) => Err(ScanError::Io {
            message: e.to_string(),
        }),
    };

    LoadedWorkflow {
        path: path.to_path_buf(),
        calls,
    }
}

pub fn load_workflows(root: &Utf8Path, opts: &ScanOptions) -> anyhow::Result<Vec<LoadedWorkflow>> {
    let files = discover_workflow_files(root, opts)?;
    debug!(root = %root, count = files.len(), "discovered workflow files");

    let mut out: Vec<LoadedWorkflow> = files.iter().map(|p| load_workflow(p)).collect();

    // Deterministic order matters.
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

/// Discover and load, collecting calls and logging skipped files.
pub fn scan_repository(root: &Utf8Path, opts: &ScanOptions) -> anyhow::Result<ScanResult> {
    let mut result = ScanResult::default();

    for loaded in load_workflows(root, opts)? {
        match loaded.calls {
            Ok(calls) => {
                debug!(path = %loaded.path, calls = calls.len(), "scanned");
                result.calls.extend(calls);
                result.files.push(loaded.path);
            }
            Err(e) => {
                warn!(path = %loaded.path, error = %e, "skipping workflow file");
                result.skipped.push((loaded.path, e));
            }
        }
    }

    Ok(result)
}
