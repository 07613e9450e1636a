//! Case-insensitive substring matching and label splitting.
//!
//! The tree builder and the renderer share [`find_ignore_case`], so a row is
//! highlighted exactly when the builder kept it for its own name.

use std::ops::Range;

/// A display label split around the first match of the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Highlight<'a> {
    pub before: &'a str,
    pub matched: &'a str,
    pub after: &'a str,
}

impl Highlight<'_> {
    pub fn is_match(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// Split `display_name` around the first case-insensitive occurrence of
/// `filter`. Without a match the whole label lands in `after`.
pub fn highlight<'a>(display_name: &'a str, filter: &str) -> Highlight<'a> {
    match find_filter(display_name, filter) {
        Some(range) => Highlight {
            before: &display_name[..range.start],
            matched: &display_name[range.clone()],
            after: &display_name[range.end..],
        },
        None => Highlight {
            before: "",
            matched: "",
            after: display_name,
        },
    }
}

/// Whether `display_name` contains `filter`, ignoring case. A blank filter
/// matches nothing; callers treat it as "no filter".
pub fn matches_filter(display_name: &str, filter: &str) -> bool {
    find_filter(display_name, filter).is_some()
}

fn find_filter(display_name: &str, filter: &str) -> Option<Range<usize>> {
    if filter.trim().is_empty() {
        return None;
    }
    find_ignore_case(display_name, filter)
}

/// Byte range of the first occurrence of `needle` in `haystack`, comparing
/// characters case-insensitively. The range always spans as many characters
/// as `needle` has.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<Range<usize>> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return None;
    }

    'start: for (start, _) in haystack.char_indices() {
        let mut end = start;
        let mut rest = haystack[start..].chars();
        for &n in &needle {
            match rest.next() {
                Some(h) if chars_eq_ignore_case(h, n) => end += h.len_utf8(),
                _ => continue 'start,
            }
        }
        return Some(start..end);
    }
    None
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parts<'a>(h: Highlight<'a>) -> (&'a str, &'a str, &'a str) {
        (h.before, h.matched, h.after)
    }

    #[test]
    fn test_match_at_start_keeps_original_case() {
        assert_eq!(parts(highlight("Backend", "back")), ("", "Back", "end"));
    }

    #[test]
    fn test_match_in_middle() {
        assert_eq!(
            parts(highlight("Engineering", "GIN")),
            ("En", "gin", "eering")
        );
    }

    #[test]
    fn test_match_runs_to_end() {
        assert_eq!(parts(highlight("Frontend", "END")), ("Front", "end", ""));
    }

    #[test]
    fn test_first_occurrence_wins() {
        assert_eq!(parts(highlight("Banana", "an")), ("B", "an", "ana"));
    }

    #[test]
    fn test_no_match_puts_everything_after() {
        let h = highlight("General", "xyz");
        assert_eq!(parts(h), ("", "", "General"));
        assert!(!h.is_match());
    }

    #[test]
    fn test_empty_and_blank_filters_do_not_match() {
        assert_eq!(parts(highlight("General", "")), ("", "", "General"));
        assert_eq!(parts(highlight("Dev Ops", "  ")), ("", "", "Dev Ops"));
        assert!(!matches_filter("Dev Ops", " "));
    }

    #[test]
    fn test_filter_longer_than_label() {
        assert!(!matches_filter("Ops", "Operations"));
    }

    #[test]
    fn test_non_ascii_labels() {
        assert_eq!(parts(highlight("Équipe Café", "CAFÉ")), ("Équipe ", "Café", ""));
        assert_eq!(find_ignore_case("Straße", "SSE"), None);
        assert_eq!(find_ignore_case("ÄÖÜ", "ö"), Some(2..4));
    }

    #[test]
    fn test_whole_label_match() {
        assert_eq!(parts(highlight("Design", "design")), ("", "Design", ""));
    }
}
