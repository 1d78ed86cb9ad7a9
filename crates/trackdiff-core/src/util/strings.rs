/// Key used to decide whether two pieces of text are equal for comparison.
pub fn comparison_key(s: &str, case_insensitive: bool, conflate_nbsp: bool) -> String {
    let spaced = normalize_spaces(s, conflate_nbsp);
    if case_insensitive {
        spaced.to_lowercase()
    } else {
        spaced
    }
}

pub fn normalize_spaces(s: &str, conflate_nbsp: bool) -> String {
    if conflate_nbsp {
        s.replace('\u{00A0}', " ")
    } else {
        s.to_string()
    }
}

/// True when leading or trailing whitespace would be lost without
/// `xml:space="preserve"`.
pub fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_key_folds_case_when_asked() {
        assert_eq!(comparison_key("Fox", true, true), "fox");
        assert_eq!(comparison_key("Fox", false, true), "Fox");
    }

    #[test]
    fn normalize_spaces_replaces_nbsp() {
        assert_eq!(normalize_spaces("hello\u{00A0}world", true), "hello world");
    }

    #[test]
    fn normalize_spaces_preserves_nbsp_when_disabled() {
        let input = "hello\u{00A0}world";
        assert_eq!(normalize_spaces(input, false), input);
    }

    #[test]
    fn space_preserve_detection() {
        assert!(needs_space_preserve(" a"));
        assert!(needs_space_preserve("a "));
        assert!(!needs_space_preserve("a b"));
        assert!(!needs_space_preserve(""));
    }
}
