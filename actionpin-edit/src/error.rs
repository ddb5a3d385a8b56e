//! Per-file rewrite failures.
//!
//! None of these stop the run; each one is reported against its file while
//! the remaining files are still processed.

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    /// The file changed between scan and rewrite.
    #[error("precondition mismatch in {path} at line {line}: {message}")]
    PreconditionMismatch {
        path: Utf8PathBuf,
        line: usize,
        message: String,
    },

    #[error("cannot read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EditError {
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            EditError::PreconditionMismatch { path, .. }
            | EditError::Read { path, .. }
            | EditError::Write { path, .. } => path,
        }
    }
}
