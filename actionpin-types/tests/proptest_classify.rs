use actionpin_types::{ReferenceKind, classify};
use proptest::prelude::*;

proptest! {
    #[test]
    fn forty_hex_chars_are_always_sha(sha in "[0-9a-fA-F]{40}") {
        prop_assert_eq!(classify(&sha), ReferenceKind::Sha);
    }

    #[test]
    fn seven_to_thirty_nine_hex_chars_are_short_sha(sha in "[0-9a-f]{7,39}") {
        prop_assert_eq!(classify(&sha), ReferenceKind::ShortSha);
    }

    #[test]
    fn disallowed_character_is_always_unknown(
        prefix in "[A-Za-z0-9._-]{0,8}",
        bad in "[ ~^:?*\\[\\\\@{}#\"']",
        suffix in "[A-Za-z0-9._-]{0,8}",
    ) {
        let reference = format!("{prefix}{bad}{suffix}");
        prop_assert_eq!(classify(&reference), ReferenceKind::Unknown);
    }

    #[test]
    fn numeric_versions_are_tags(
        v in proptest::bool::ANY,
        major in 0u32..100,
        minor in 0u32..100,
        patch in 0u32..100,
    ) {
        let reference = format!("{}{major}.{minor}.{patch}", if v { "v" } else { "" });
        prop_assert_eq!(classify(&reference), ReferenceKind::Tag);
    }

    #[test]
    fn classify_is_deterministic(reference in ".{0,48}") {
        prop_assert_eq!(classify(&reference), classify(&reference));
    }
}
