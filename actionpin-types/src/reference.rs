//! Syntactic classification of the reference after `@`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Full 40-character commit SHA.
    Sha,
    /// 7 to 39 hex characters. Never counts as pinned.
    ShortSha,
    Tag,
    Branch,
    Unknown,
}

impl ReferenceKind {
    pub fn is_pinned(self) -> bool {
        self == ReferenceKind::Sha
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::Sha => "sha",
            ReferenceKind::ShortSha => "short_sha",
            ReferenceKind::Tag => "tag",
            ReferenceKind::Branch => "branch",
            ReferenceKind::Unknown => "unknown",
        }
    }
}

static ALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9/_.-]+$").expect("static regex"));
static HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]+$").expect("static regex"));
static VERSION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?[0-9]+(\.[0-9]+)*(-[0-9A-Za-z.-]+)?$").expect("static regex")
});

/// Classify a reference string. Pure and total.
pub fn classify(reference: &str) -> ReferenceKind {
    if !ALLOWED.is_match(reference) {
        return ReferenceKind::Unknown;
    }

    if HEX.is_match(reference) {
        match reference.len() {
            40 => return ReferenceKind::Sha,
            7..=39 => return ReferenceKind::ShortSha,
            _ => {}
        }
    }

    if VERSION_TAG.is_match(reference) {
        return ReferenceKind::Tag;
    }

    if is_valid_branch_name(reference) {
        ReferenceKind::Branch
    } else {
        ReferenceKind::Unknown
    }
}

/// git's ref-format rules, restricted to the already-allowed charset.
fn is_valid_branch_name(name: &str) -> bool {
    if name.starts_with('/') || name.ends_with('/') || name.ends_with('.') {
        return false;
    }
    if name.contains("..") || name.contains("//") || name.ends_with(".lock") {
        return false;
    }
    name.split('/')
        .all(|component| !component.is_empty() && !component.starts_with('.'))
}
