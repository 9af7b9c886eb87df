//! Free-form comment headers.

use crate::syntax::{COMMENT_PREFIX, COMMENT_START};

/// Turns arbitrary text into a comment block that the reader skips.
///
/// Every line is prefixed with `;; ` and the block ends with a newline. Text
/// that itself contains `;` needs no escaping: a comment always runs to the
/// end of its line.
pub fn encode_comment(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + COMMENT_PREFIX.len() * 2);
    for line in text.lines() {
        if line.is_empty() {
            out.push_str(COMMENT_PREFIX.trim_end());
        } else {
            out.push_str(COMMENT_PREFIX);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Recovers the leading comment block of an artifact, if there is one.
///
/// Inverse of [`encode_comment`] for text without trailing blank lines.
pub fn decode_comment(artifact: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in artifact.lines() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with(COMMENT_START) {
            break;
        }
        let body = trimmed
            .strip_prefix(COMMENT_PREFIX)
            .or_else(|| trimmed.strip_prefix(COMMENT_PREFIX.trim_end()))
            .unwrap_or(&trimmed[COMMENT_START.len_utf8()..]);
        lines.push(body);
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        assert_eq!(encode_comment("saved state"), ";; saved state\n");
    }

    #[test]
    fn multiple_lines() {
        assert_eq!(
            encode_comment("first\n\nthird"),
            ";; first\n;;\n;; third\n"
        );
    }

    #[test]
    fn crlf_lines() {
        assert_eq!(encode_comment("a\r\nb"), ";; a\n;; b\n");
    }

    #[test]
    fn empty_text_gives_empty_block() {
        assert_eq!(encode_comment(""), "");
    }

    #[test]
    fn embedded_prefix_is_kept_verbatim() {
        assert_eq!(encode_comment(";; nested"), ";; ;; nested\n");
    }

    #[test]
    fn decode_recovers_text() {
        let text = "Session state\n\nwritten at shutdown";
        let artifact = format!("{}[1 2]\n", encode_comment(text));
        assert_eq!(decode_comment(&artifact).as_deref(), Some(text));
    }

    #[test]
    fn decode_without_comment() {
        assert_eq!(decode_comment("[1 2]"), None);
    }
}
