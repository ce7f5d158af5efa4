//! Overflow splitting: where to cut buffered text when it does not fit in the current unit.
//!
//! All lengths and indices here are in characters (Unicode scalar values), never bytes, so a cut
//! never lands inside a multi-byte character.

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `char_index`-th character of `s`; `s.len()` when past the end.
pub fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    &s[..byte_offset(s, max_chars)]
}

/// Returns the char index at which to cut `text` so the head holds at most `limit` characters.
///
/// Precedence: the whole text when it fits; else the last newline at index `1..=limit`; else the last
/// space in that range; else exactly `limit`. The separator itself starts the tail, so
/// `head + tail == text` always holds.
pub fn find_split_point(text: &str, limit: usize) -> usize {
    if char_len(text) <= limit {
        return char_len(text);
    }

    let mut last_newline = None;
    let mut last_space = None;
    for (i, c) in text.chars().take(limit + 1).enumerate() {
        if i == 0 {
            continue;
        }
        match c {
            '\n' => last_newline = Some(i),
            ' ' => last_space = Some(i),
            _ => {}
        }
    }

    last_newline.or(last_space).unwrap_or(limit)
}

/// Splits `text` at [`find_split_point`] and returns `(head, tail)`.
pub fn split_for_limit(text: &str, limit: usize) -> (&str, &str) {
    text.split_at(byte_offset(text, find_split_point(text, limit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_returns_full_length() {
        assert_eq!(find_split_point("hello", 5), 5);
        assert_eq!(find_split_point("", 0), 0);
    }

    #[test]
    fn test_prefers_newline_over_space() {
        let text = "ab cd\nef gh ij";
        // limit 10: newline at 5, spaces at 2, 8, 11 (11 is beyond the limit)
        assert_eq!(find_split_point(text, 10), 5);
    }

    #[test]
    fn test_falls_back_to_last_space() {
        let text = "one two three four";
        assert_eq!(find_split_point(text, 10), 7);
        let (head, tail) = split_for_limit(text, 10);
        assert_eq!(head, "one two");
        assert_eq!(tail, " three four");
    }

    #[test]
    fn test_separator_exactly_at_limit_is_used() {
        assert_eq!(find_split_point("abcde fgh", 5), 5);
    }

    #[test]
    fn test_forces_split_without_separator() {
        assert_eq!(find_split_point("abcdefghij", 4), 4);
    }

    #[test]
    fn test_separator_at_index_zero_is_ignored() {
        assert_eq!(find_split_point(" abcdefgh", 4), 4);
        assert_eq!(find_split_point("\nabcdefgh", 4), 4);
    }

    #[test]
    fn test_zero_limit_splits_at_zero() {
        let (head, tail) = split_for_limit("abc", 0);
        assert_eq!(head, "");
        assert_eq!(tail, "abc");
    }

    #[test]
    fn test_multibyte_characters_split_on_char_boundary() {
        let text = "héllo wörld ünïcode";
        let (head, tail) = split_for_limit(text, 12);
        assert_eq!(head, "héllo wörld");
        assert_eq!(format!("{head}{tail}"), text);
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(char_len("日本語"), 3);
    }

    #[test]
    fn test_byte_offset_past_end() {
        assert_eq!(byte_offset("ab", 5), 2);
        assert_eq!(truncate_chars("ab", 5), "ab");
    }
}
