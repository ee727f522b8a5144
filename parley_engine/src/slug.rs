/// Normalize a user-provided save slot name into a filesystem-safe slug.
///
/// Runs of whitespace and punctuation collapse to a single dash; an empty
/// result becomes `"quicksave"`.
pub fn sanitize_slug(raw: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else if ch == '_' {
            if !slug.is_empty() {
                slug.push(ch);
            }
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        "quicksave".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_lowercase_and_dashed() {
        assert_eq!(sanitize_slug("  Before the Gate! "), "before-the-gate");
        assert_eq!(sanitize_slug("chapter_2"), "chapter_2");
        assert_eq!(sanitize_slug("a--b"), "a-b");
    }

    #[test]
    fn empty_slugs_get_a_default() {
        assert_eq!(sanitize_slug(""), "quicksave");
        assert_eq!(sanitize_slug("???"), "quicksave");
    }
}
