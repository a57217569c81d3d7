//! Small text helpers shared by list and detail views.

/// Default excerpt length for ticket descriptions in lists.
pub const DEFAULT_EXCERPT_LEN: usize = 80;

/// Collapse whitespace and cut `text` to at most `len` characters.
///
/// Truncated output ends with `…`. `None` and blank input yield an empty
/// string.
#[must_use]
pub fn excerpt(text: Option<&str>, len: usize) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > len {
        let cut: String = collapsed.chars().take(len).collect();
        format!("{cut}…")
    } else {
        collapsed
    }
}

/// Avatar initials: first letter of the first and last words, upper-cased.
///
/// Falls back to `"A"` for an empty name.
#[must_use]
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let first = words.first().and_then(|w| w.chars().next());
    let last = if words.len() > 1 {
        words.last().and_then(|w| w.chars().next())
    } else {
        None
    };

    let initials: String = first
        .into_iter()
        .chain(last)
        .flat_map(char::to_uppercase)
        .collect();

    if initials.is_empty() {
        "A".to_string()
    } else {
        initials
    }
}

/// Name to show for a user: full name when set, otherwise the email.
#[must_use]
pub fn display_name<'a>(full_name: Option<&'a str>, email: &'a str) -> &'a str {
    match full_name {
        Some(name) if !name.trim().is_empty() => name,
        _ => email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_none_and_blank() {
        assert_eq!(excerpt(None, 80), "");
        assert_eq!(excerpt(Some("   \n\t "), 80), "");
    }

    #[test]
    fn test_excerpt_collapses_whitespace() {
        assert_eq!(
            excerpt(Some("  printer\n\n  offline   again "), 80),
            "printer offline again"
        );
    }

    #[test]
    fn test_excerpt_truncates_on_characters() {
        let text = "ñ".repeat(100);
        let out = excerpt(Some(&text), 80);
        assert_eq!(out.chars().count(), 81);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_excerpt_exact_length_untouched() {
        let text = "a".repeat(80);
        assert_eq!(excerpt(Some(&text), 80), text);
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("ana maría lópez"), "AL");
        assert_eq!(initials("tech@serviceflow.io"), "T");
        assert_eq!(initials("   "), "A");
        assert_eq!(initials(""), "A");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Some("Ana"), "ana@x.io"), "Ana");
        assert_eq!(display_name(Some(""), "ana@x.io"), "ana@x.io");
        assert_eq!(display_name(None, "ana@x.io"), "ana@x.io");
    }
}
