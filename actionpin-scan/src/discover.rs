use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use glob::{Pattern, glob};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Do not scan composite `action.yml` / `action.yaml` files.
    pub skip_actions: bool,
}

const WORKFLOW_PATTERNS: &[&str] = &["**/.github/workflows/*.yml", "**/.github/workflows/*.yaml"];
const ACTION_PATTERNS: &[&str] = &["**/action.yml", "**/action.yaml"];
const IGNORED_DIRS: &[&str] = &[".git", "node_modules"];

/// Find workflow (and optionally action) definition files under `root`.
///
/// Output is sorted and deduplicated.
pub fn discover_workflow_files(
    root: &Utf8Path,
    opts: &ScanOptions,
) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut patterns: Vec<&str> = WORKFLOW_PATTERNS.to_vec();
    if !opts.skip_actions {
        patterns.extend_from_slice(ACTION_PATTERNS);
    }

    let escaped_root = Pattern::escape(root.as_str());
    let mut found = BTreeSet::new();

    for pattern in patterns {
        let full = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
        debug!(pattern = %full, "scanning for workflow files");

        for entry in glob(&full).with_context(|| format!("glob {full}"))? {
            let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
                debug!("skipping non-utf8 path");
                continue;
            };
            if !path.is_file() || is_ignored(root, &path) {
                continue;
            }
            found.insert(path);
        }
    }

    Ok(found.into_iter().collect())
}

fn is_ignored(root: &Utf8Path, path: &Utf8Path) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .any(|c| IGNORED_DIRS.contains(&c.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_err as fs;
    use tempfile::TempDir;

    fn touch(root: &Utf8Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "name: x\n").expect("write");
    }

    #[test]
    fn finds_workflows_and_actions_sorted() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8");
        touch(root, ".github/workflows/ci.yml");
        touch(root, ".github/workflows/release.yaml");
        touch(root, ".github/workflows/notes.txt");
        touch(root, "tools/setup/action.yml");
        touch(root, "node_modules/pkg/action.yml");

        let files = discover_workflow_files(root, &ScanOptions::default()).expect("discover");
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).expect("under root").as_str().to_string())
            .collect();

        assert_eq!(
            rel,
            vec![
                ".github/workflows/ci.yml",
                ".github/workflows/release.yaml",
                "tools/setup/action.yml",
            ]
        );
    }

    #[test]
    fn skip_actions_leaves_only_workflows() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8");
        touch(root, ".github/workflows/ci.yml");
        touch(root, "action.yaml");

        let opts = ScanOptions { skip_actions: true };
        let files = discover_workflow_files(root, &opts).expect("discover");
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".github/workflows/ci.yml"));
    }

    #[test]
    fn nested_workflow_directories_are_found() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8");
        touch(root, "services/api/.github/workflows/test.yml");

        let files = discover_workflow_files(root, &ScanOptions::default()).expect("discover");
        assert_eq!(files.len(), 1);
    }
}
