//! Text helpers for log and preview output.

/// Default maximum length used by [`truncate_default`].
pub const DEFAULT_LENGTH: usize = 64;

/// Default ellipsis appended to truncated text.
pub const ELLIPSIS: &str = "\u{2026}";

/// Shortens `s` to at most `length` characters, replacing the tail with
/// `ellipsis` when anything is cut. Lengths count `char`s, not bytes.
///
/// If `ellipsis` is not shorter than `length`, the result is the first
/// `length` characters of the ellipsis.
#[must_use]
pub fn truncate(s: &str, length: usize, ellipsis: &str) -> String {
    if s.chars().count() <= length {
        return s.to_string();
    }
    let keep = length.saturating_sub(ellipsis.chars().count());
    s.chars()
        .take(keep)
        .chain(ellipsis.chars())
        .take(length)
        .collect()
}

/// [`truncate`] with [`DEFAULT_LENGTH`] and [`ELLIPSIS`].
#[must_use]
pub fn truncate_default(s: &str) -> String {
    truncate(s, DEFAULT_LENGTH, ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate("starfury", 8, ELLIPSIS), "starfury");
        assert_eq!(truncate_default(""), "");
    }

    #[test]
    fn long_text_ends_with_ellipsis() {
        let out = truncate("starfury", 5, ELLIPSIS);
        assert_eq!(out, "star\u{2026}");
        assert_eq!(out.chars().count(), 5);
    }

    #[test]
    fn multi_char_ellipsis() {
        assert_eq!(truncate("abcdefgh", 6, "..."), "abc...");
        assert_eq!(truncate("abcdefgh", 2, "..."), "..");
    }

    #[test]
    fn counts_chars_not_bytes() {
        assert_eq!(truncate("ääää", 4, ELLIPSIS), "ääää");
        assert_eq!(truncate("äääää", 4, ELLIPSIS), "äää\u{2026}");
    }

    #[test]
    fn default_length_applies() {
        let long = "x".repeat(100);
        assert_eq!(truncate_default(&long).chars().count(), DEFAULT_LENGTH);
    }
}
