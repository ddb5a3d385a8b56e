use std::cmp::Ordering;

/// (numeric parts, is stable release)
fn version_key(tag: &str) -> Option<(Vec<u64>, bool)> {
    let bare = tag.strip_prefix('v').unwrap_or(tag);
    let (core, pre) = match bare.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (bare, None),
    };
    let parts = core
        .split('.')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    Some((parts, pre.is_none()))
}

fn compare_parts(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    // `v4.0.0` beats `v4` so the most specific tag wins on ties.
    a.len().cmp(&b.len())
}

/// Highest version-looking tag. Stable releases beat pre-releases of the same
/// version; names that are not versions are ignored.
pub fn latest_version<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    names
        .into_iter()
        .filter_map(|name| version_key(name).map(|key| (key, name)))
        .max_by(|((a, a_stable), a_name), ((b, b_stable), b_name)| {
            compare_parts(a, b)
                .then(a_stable.cmp(b_stable))
                .then_with(|| b_name.cmp(a_name))
        })
        .map(|(_, name)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_numeric_version() {
        let tags = ["v1.9.0", "v1.10.0", "v2", "v2.0.1", "nightly", "v2.0.1-rc.1"];
        assert_eq!(latest_version(tags), Some("v2.0.1".to_string()));
    }

    #[test]
    fn prefers_stable_over_prerelease() {
        assert_eq!(
            latest_version(["3.0.0-beta", "3.0.0"]),
            Some("3.0.0".to_string())
        );
    }

    #[test]
    fn non_version_tags_yield_none() {
        assert_eq!(latest_version(["latest", "stable"]), None);
    }
}
