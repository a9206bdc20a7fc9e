//! Deterministic slug derivation for post titles.
//!
//! The transformation is fixed: lower-case the input, trim surrounding
//! whitespace, drop everything that is not a word character, whitespace, or
//! hyphen, then collapse whitespace runs into single hyphens. Applying it to
//! its own output yields the same string, so slugs survive re-derivation.

/// Derive a URL-safe slug from human-readable text.
///
/// Returns an empty string when the input carries no representable
/// characters; callers treat an empty slug as a missing required field.
pub fn derive_slug(input: &str) -> String {
    let filtered: String = input
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '_' || *ch == '-' || ch.is_whitespace())
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_expected_slug_from_punctuated_title() {
        assert_eq!(derive_slug("Hello, World!  2024"), "hello-world-2024");
    }

    #[test]
    fn derivation_is_idempotent() {
        let first = derive_slug("Feature Flags at Scale");
        assert_eq!(first, "feature-flags-at-scale");
        assert_eq!(derive_slug(&first), first);
    }

    #[test]
    fn preserves_existing_hyphens_and_underscores() {
        assert_eq!(derive_slug("already-slugged_title"), "already-slugged_title");
    }

    #[test]
    fn trims_and_collapses_whitespace() {
        assert_eq!(derive_slug("  spaced\t\tout   title "), "spaced-out-title");
    }

    #[test]
    fn unrepresentable_input_yields_empty_slug() {
        assert_eq!(derive_slug("!!! ??? ..."), "");
        assert_eq!(derive_slug(""), "");
    }
}
