//! Matching delimiters in formula markup.

/// The closing delimiter for `open`, if `open` is an opening delimiter.
pub fn closing_delimiter(open: char) -> Option<char> {
    match open {
        '{' => Some('}'),
        '[' => Some(']'),
        '(' => Some(')'),
        _ => None,
    }
}

/// Find the byte index of the delimiter which closes the one at `open_idx`.
///
/// Only delimiters of the same kind are counted, and backslash-escaped
/// delimiters (`\{`) are skipped. Returns `None` if `open_idx` does not point
/// at an opening delimiter, or if the input ends before the depth returns to
/// zero.
pub fn find_matching(s: &str, open_idx: usize) -> Option<usize> {
    let tail = s.get(open_idx..)?;
    let open = tail.chars().next()?;
    let close = closing_delimiter(open)?;

    let mut depth = 0usize;
    let mut escaped = false;
    for (offset, c) in tail.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(open_idx + offset);
            }
        }
    }
    None
}

/// Are all the unescaped braces in `s` balanced?
pub fn braces_balanced(s: &str) -> bool {
    let mut depth = 0usize;
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_simple_and_nested_matches() {
        assert_eq!(find_matching("{a}", 0), Some(2));
        assert_eq!(find_matching("x{a{b}c}d", 1), Some(7));
        assert_eq!(find_matching("x{a{b}c}d", 3), Some(5));
        assert_eq!(find_matching("[n]{x}", 0), Some(2));
        assert_eq!(find_matching("(a(b)c)", 0), Some(6));
    }

    #[test]
    fn only_counts_the_same_kind_of_delimiter() {
        assert_eq!(find_matching("{a]b}", 0), Some(4));
        assert_eq!(find_matching("[{]}", 0), Some(2));
    }

    #[test]
    fn skips_escaped_delimiters() {
        assert_eq!(find_matching(r"{\}a}", 0), Some(4));
        assert_eq!(find_matching(r"{a\\}", 0), Some(4));
    }

    #[test]
    fn returns_none_when_unbalanced_or_not_an_opener() {
        assert_eq!(find_matching("{a{b}", 0), None);
        assert_eq!(find_matching("abc", 1), None);
        assert_eq!(find_matching("abc", 10), None);
        assert_eq!(find_matching("}", 0), None);
    }

    #[test]
    fn handles_multibyte_text() {
        let s = "π{é}";
        let open = s.find('{').unwrap();
        assert_eq!(find_matching(s, open), s.find('}'));
    }

    #[test]
    fn checks_brace_balance() {
        assert!(braces_balanced(r"\frac{a}{b}"));
        assert!(braces_balanced(r"\{x\}"));
        assert!(braces_balanced("plain"));
        assert!(!braces_balanced(r"\frac{a}{b"));
        assert!(!braces_balanced("}{"));
    }
}
