//! Lexical rules shared by the writer and the reader.
//!
//! ```text
//! expr       := label-def | back-ref | sequence | mapping | record | atom
//! label-def  := '#' digits '=' expr
//! back-ref   := '#' digits '#'
//! sequence   := '[' expr* ']'
//! mapping    := '{' (expr expr)* '}'
//! record     := '#s(' ident (ident expr)* ')'
//! atom       := 'nil' | 'true' | 'false' | integer | float | string | '\'' symbol
//! ```
//!
//! Elements are separated by whitespace; `;` starts a comment that runs to the
//! end of the line.

use std::fmt::{self, Write};

/// Prefix of every comment line written by [`crate::encode_comment`].
pub const COMMENT_PREFIX: &str = ";; ";

pub const COMMENT_START: char = ';';
pub const LABEL_MARK: char = '#';
pub const LABEL_DEFINE: char = '=';
pub const SEQUENCE_OPEN: char = '[';
pub const SEQUENCE_CLOSE: char = ']';
pub const MAPPING_OPEN: char = '{';
pub const MAPPING_CLOSE: char = '}';
pub const RECORD_OPEN: &str = "#s(";
pub const RECORD_CLOSE: char = ')';
pub const SYMBOL_QUOTE: char = '\'';
pub const DELIMITER: char = ' ';

pub const NIL: &str = "nil";
pub const TRUE: &str = "true";
pub const FALSE: &str = "false";

pub const POSITIVE_INFINITY: &str = "+inf.0";
pub const NEGATIVE_INFINITY: &str = "-inf.0";
pub const NOT_A_NUMBER: &str = "+nan.0";

/// Characters allowed in a symbol name besides alphanumerics.
const SYMBOL_PUNCTUATION: &str = "_-+*/<>=!?.:%&$^~@";

pub fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || SYMBOL_PUNCTUATION.contains(c)
}

/// A symbol can be written when it is non-empty and made of symbol characters.
pub fn is_symbol(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_symbol_char)
}

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Record and field names.
pub fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => is_ident_start(first) && chars.all(is_ident_char),
        None => false,
    }
}

/// Characters that end a bare token (numbers, keywords, symbols, labels).
pub fn is_delimiter(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '[' | ']' | '{' | '}' | '(' | ')' | '"' | ';' | '#' | '\''
        )
}

/// Writes a float so that parsing the output yields the same bits
/// (NaN payloads excepted).
///
/// Finite values use Rust's shortest round-trip representation, which always
/// contains a `.` or an exponent and therefore never reads back as an integer.
pub fn write_float(out: &mut impl Write, value: f64) -> fmt::Result {
    if value.is_nan() {
        out.write_str(NOT_A_NUMBER)
    } else if value == f64::INFINITY {
        out.write_str(POSITIVE_INFINITY)
    } else if value == f64::NEG_INFINITY {
        out.write_str(NEGATIVE_INFINITY)
    } else {
        write!(out, "{:?}", value)
    }
}

/// Writes a quoted string literal. Every character round-trips.
pub fn write_string(out: &mut impl Write, value: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            '\0' => out.write_str("\\0")?,
            c if c.is_control() => write!(out, "\\u{{{:x}}}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(value: f64) -> String {
        let mut out = String::new();
        write_float(&mut out, value).unwrap();
        out
    }

    fn string(value: &str) -> String {
        let mut out = String::new();
        write_string(&mut out, value).unwrap();
        out
    }

    #[test]
    fn floats_never_look_like_integers() {
        assert_eq!(float(1.0), "1.0");
        assert_eq!(float(-0.0), "-0.0");
        assert_eq!(float(1e300), "1e300");
        assert_eq!(float(f64::INFINITY), "+inf.0");
        assert_eq!(float(f64::NEG_INFINITY), "-inf.0");
        assert_eq!(float(f64::NAN), "+nan.0");
    }

    #[test]
    fn float_precision_survives() {
        let value = 0.1 + 0.2;
        let text = float(value);
        assert_eq!(text.parse::<f64>().unwrap().to_bits(), value.to_bits());
    }

    #[test]
    fn strings_escape_control_characters() {
        assert_eq!(string("a\"b"), r#""a\"b""#);
        assert_eq!(string("line\nnext"), r#""line\nnext""#);
        assert_eq!(string("\u{7}"), r#""\u{7}""#);
        assert_eq!(string("ünï"), "\"ünï\"");
    }

    #[test]
    fn identifiers() {
        assert!(is_ident("point"));
        assert!(is_ident("_private-field2"));
        assert!(!is_ident(""));
        assert!(!is_ident("2d"));
        assert!(!is_ident("has space"));
    }

    #[test]
    fn symbols() {
        assert!(is_symbol("foo-bar"));
        assert!(is_symbol("<=>"));
        assert!(is_symbol("123"));
        assert!(!is_symbol(""));
        assert!(!is_symbol("a b"));
        assert!(!is_symbol("a#b"));
    }
}
