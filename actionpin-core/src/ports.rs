//! Port traits abstracting artifact output away from the pipeline.

use camino::Utf8Path;

/// File-system write operations. Implementations create missing parent
/// directories.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
}
