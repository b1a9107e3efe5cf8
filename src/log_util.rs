//! Smol utilities for logging

/// Longest snippet, in characters, quoted back in a diagnostic
const MAX_SNIPPET: usize = 60;

/// Make a log-safe, single-line rendition of a source fragment.
///
/// Control characters are escaped and anything past `MAX_SNIPPET` characters
/// is cut off with a trailing `...`.
pub fn escape_snippet(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_SNIPPET + 3));

    for (i, c) in s.chars().enumerate() {
        if i == MAX_SNIPPET {
            out.push_str("...");
            break;
        }
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_snippet("root:\t/var;\r"), "root:\\t/var;\\r");
    }

    #[test]
    fn truncates_long_fragments() {
        let long = "x".repeat(100);
        let escaped = escape_snippet(&long);

        assert_eq!(escaped.len(), MAX_SNIPPET + 3);
        assert!(escaped.ends_with("..."));
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(escape_snippet("location: /a ["), "location: /a [");
    }
}
