use actionpin_types::{RefKind, ResolvedReference};
use std::collections::{BTreeMap, BTreeSet};

/// Parsed output of `git ls-remote --symref <url>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefListing {
    /// Branch `HEAD` points at, when the server advertises the symref.
    pub head: Option<String>,
    pub branches: BTreeMap<String, String>,
    /// Tag name to commit SHA; annotated tags are peeled.
    pub tags: BTreeMap<String, String>,
}

impl RefListing {
    pub fn parse(output: &str) -> Self {
        let mut listing = RefListing::default();
        let mut peeled = BTreeSet::new();

        for line in output.lines() {
            let Some((left, name)) = line.split_once('\t') else {
                continue;
            };

            if let Some(target) = left.strip_prefix("ref: ") {
                if name == "HEAD" {
                    listing.head = target.strip_prefix("refs/heads/").map(str::to_string);
                }
                continue;
            }

            let sha = left.trim().to_ascii_lowercase();
            if let Some(branch) = name.strip_prefix("refs/heads/") {
                listing.branches.insert(branch.to_string(), sha);
            } else if let Some(tag) = name.strip_prefix("refs/tags/") {
                match tag.strip_suffix("^{}") {
                    Some(tag) => {
                        peeled.insert(tag.to_string());
                        listing.tags.insert(tag.to_string(), sha);
                    }
                    None if !peeled.contains(tag) => {
                        listing.tags.insert(tag.to_string(), sha);
                    }
                    None => {}
                }
            }
        }

        listing
    }

    /// Default branch: the advertised `HEAD`, else `main`, else `master`,
    /// else the first branch by name.
    pub fn default_branch(&self) -> Option<String> {
        if let Some(head) = &self.head {
            return Some(head.clone());
        }
        ["main", "master"]
            .into_iter()
            .find(|b| self.branches.contains_key(*b))
            .map(str::to_string)
            .or_else(|| self.branches.keys().next().cloned())
    }

    /// Exact branch, then exact tag, then SHA prefix of any advertised tip.
    pub fn resolve(&self, reference: &str) -> Option<ResolvedReference> {
        if let Some(sha) = self.branches.get(reference) {
            return Some(ResolvedReference::new(sha, RefKind::Branch));
        }
        if let Some(sha) = self.tags.get(reference) {
            return Some(ResolvedReference::new(sha, RefKind::Tag));
        }
        if reference.len() >= 7 && reference.chars().all(|c| c.is_ascii_hexdigit()) {
            let prefix = reference.to_ascii_lowercase();
            return self
                .branches
                .values()
                .chain(self.tags.values())
                .find(|sha| sha.starts_with(&prefix))
                .map(|sha| ResolvedReference::new(sha, RefKind::Commit));
        }
        None
    }
}
