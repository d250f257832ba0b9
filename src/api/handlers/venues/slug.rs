//! Slug normalization for venue identifiers.
//!
//! Slugs are normalized to lowercase `a-z0-9-` with collapsing separators and
//! length bounds enforced by callers.

/// Normalizes user input into a URL-safe slug (`a-z0-9-`) within the provided length bounds.
/// Returns `None` when the normalized result is empty or outside `min..=max`.
/// Caller must still enforce uniqueness.
pub(super) fn normalize_slug(input: &str, min: usize, max: usize) -> Option<String> {
    let mut slug = String::new();
    let mut prev_dash = false;
    for ch in input.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let trimmed = slug.trim_matches('-').to_string();
    if trimmed.is_empty() {
        return None;
    }
    let truncated: String = trimmed.chars().take(max).collect();
    let normalized = truncated.trim_matches('-').to_string();
    if normalized.len() < min || normalized.len() > max {
        return None;
    }
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_slug_lowercases_and_collapses() {
        assert_eq!(
            normalize_slug("  Grand   Arena! ", 3, 48),
            Some("grand-arena".to_string())
        );
    }

    #[test]
    fn normalize_slug_rejects_empty_and_short() {
        assert_eq!(normalize_slug("!!", 3, 48), None);
        assert_eq!(normalize_slug("ab", 3, 48), None);
    }

    #[test]
    fn normalize_slug_enforces_max_length() {
        let long = "x".repeat(64);
        let normalized = normalize_slug(&long, 3, 48).expect("should truncate");
        assert_eq!(normalized.len(), 48);
    }
}
