//! Parsing artifact text back into a value graph.
//!
//! The reader makes a single left-to-right pass. A label definition in front
//! of a container reserves the container's node before its elements are
//! parsed and binds the label right away, so a back-reference met while the
//! container is still being filled resolves to it. That is what makes
//! self-referential and mutually referential values readable.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::num::IntErrorKind;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::config::Options;
use crate::graph::{Atom, Graph, Node, NodeId, Snapshot};
use crate::label::Label;
use crate::syntax::{
    self, COMMENT_START, LABEL_DEFINE, LABEL_MARK, MAPPING_CLOSE, MAPPING_OPEN, RECORD_CLOSE,
    RECORD_OPEN, SEQUENCE_CLOSE, SEQUENCE_OPEN, SYMBOL_QUOTE,
};

/// What went wrong while reading an artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("artifact contains no expression")]
    Empty,
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("'{0}' is never closed")]
    Unclosed(char),
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unbalanced '{0}'")]
    UnbalancedBracket(char),
    #[error("unknown token {0:?}")]
    UnknownToken(String),
    #[error("invalid escape sequence {0:?}")]
    InvalidEscape(String),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("integer {0} is out of range")]
    IntegerOutOfRange(String),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("invalid label {0:?}")]
    InvalidLabel(String),
    #[error("mapping has a key without a value")]
    OddMappingEntries,
    #[error("label #{0} is defined twice")]
    DuplicateLabel(Label),
    #[error("field {0:?} appears twice")]
    DuplicateField(String),
    #[error("reference to undefined label #{0}")]
    UnknownLabel(Label),
    #[error("label #{0} refers to itself")]
    SelfReference(Label),
    #[error("nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),
    #[error("artifact is not valid UTF-8")]
    InvalidUtf8,
}

/// A malformed artifact. Positions are 1-based; `offset` is in bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    fn at(text: &str, offset: usize, kind: ParseErrorKind) -> Self {
        let before = &text[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit('\n')
            .next()
            .map_or(0, |l| l.chars().count())
            + 1;
        ParseError {
            kind,
            offset,
            line,
            column,
        }
    }

    /// Error for artifact bytes that are not UTF-8, positioned at the first
    /// invalid byte.
    pub fn invalid_utf8(bytes: &[u8], err: std::str::Utf8Error) -> Self {
        let valid = std::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or_default();
        ParseError::at(valid, valid.len(), ParseErrorKind::InvalidUtf8)
    }
}

/// Reads the first top-level expression of `text` with default options.
pub fn read(text: &str) -> Result<Snapshot, ParseError> {
    read_with(text, &Options::default())
}

/// Reads the first top-level expression of `text`. Anything after it is
/// ignored.
pub fn read_with(text: &str, options: &Options) -> Result<Snapshot, ParseError> {
    let mut reader = Reader::new(text, options.max_depth);

    reader.skip_trivia();
    if reader.peek().is_none() {
        return Err(reader.error(ParseErrorKind::Empty));
    }

    let root = reader.expr()?;
    let end = reader.pos;
    reader.skip_trivia();
    if reader.peek().is_some() {
        warn!(
            "ignoring {} bytes after the top-level expression",
            text.len() - end
        );
    }

    debug!(
        "read {} nodes with {} labels",
        reader.graph.len(),
        reader.labels.len()
    );

    Ok(Snapshot {
        graph: reader.graph,
        root,
    })
}

/// Like [`read_with`], for raw artifact bytes.
pub fn read_bytes(bytes: &[u8], options: &Options) -> Result<Snapshot, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::invalid_utf8(bytes, e))?;
    read_with(text, options)
}

/// A container or label definition whose contents are still being read.
enum Frame {
    Sequence {
        slot: NodeId,
        open: usize,
        items: Vec<NodeId>,
    },
    /// Keys and values alternate in `items`.
    Mapping {
        slot: NodeId,
        open: usize,
        items: Vec<NodeId>,
    },
    /// `fields[i]` names `items[i]`.
    Record {
        slot: NodeId,
        open: usize,
        name: String,
        fields: Vec<String>,
        items: Vec<NodeId>,
    },
    /// `#N=` in front of an atom or another label.
    Define { label: Label },
}

enum Start {
    Value(NodeId),
    /// A frame and the nesting depth of its contents.
    Open(Frame, usize),
}

struct Reader<'t> {
    text: &'t str,
    pos: usize,
    graph: Graph,
    labels: HashMap<Label, NodeId>,
    /// Labels whose definition is being parsed but not yet bound.
    pending: HashSet<Label>,
    max_depth: usize,
}

impl<'t> Reader<'t> {
    fn new(text: &'t str, max_depth: usize) -> Self {
        Reader {
            text,
            pos: 0,
            graph: Graph::new(),
            labels: HashMap::new(),
            pending: HashSet::new(),
            max_depth,
        }
    }

    fn rest(&self) -> &'t str {
        let text = self.text;
        &text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::at(self.text, self.pos, kind)
    }

    fn error_at(&self, offset: usize, kind: ParseErrorKind) -> ParseError {
        ParseError::at(self.text, offset, kind)
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(COMMENT_START) => match self.rest().find('\n') {
                    Some(end) => self.pos += end + 1,
                    None => self.pos = self.text.len(),
                },
                _ => break,
            }
        }
    }

    /// Consumes a bare token up to the next delimiter.
    fn token(&mut self) -> &'t str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if syntax::is_delimiter(c) {
                break;
            }
            self.bump();
        }
        let text = self.text;
        &text[start..self.pos]
    }

    fn at_compound(&self) -> bool {
        matches!(self.peek(), Some(SEQUENCE_OPEN | MAPPING_OPEN)) || self.rest().starts_with(RECORD_OPEN)
    }

    /// Parses one complete expression.
    ///
    /// Containers are tracked on an explicit stack rather than by recursion,
    /// so nesting is bounded by `max_depth` alone and never by the thread's
    /// stack size.
    fn expr(&mut self) -> Result<NodeId, ParseError> {
        let mut stack: Vec<(Frame, usize)> = Vec::new();

        loop {
            self.skip_trivia();

            let closed = match stack.last_mut() {
                Some((frame, _)) => self.close(frame)?,
                None => None,
            };
            let value = match closed {
                Some(slot) => {
                    stack.pop();
                    slot
                }
                None => {
                    let depth = stack.last().map_or(0, |&(_, depth)| depth);
                    match self.start(depth)? {
                        Start::Value(id) => id,
                        Start::Open(frame, depth) => {
                            stack.push((frame, depth));
                            continue;
                        }
                    }
                }
            };

            // Hand the finished value to the innermost open frame.
            loop {
                match stack.last_mut() {
                    None => return Ok(value),
                    Some((Frame::Define { label }, _)) => {
                        let label = *label;
                        stack.pop();
                        self.pending.remove(&label);
                        self.labels.insert(label, value);
                    }
                    Some((
                        Frame::Sequence { items, .. }
                        | Frame::Mapping { items, .. }
                        | Frame::Record { items, .. },
                        _,
                    )) => {
                        items.push(value);
                        break;
                    }
                }
            }
        }
    }

    /// Begins an expression at nesting `depth`: either a complete value or a
    /// newly opened frame together with the depth of its contents.
    fn start(&mut self, depth: usize) -> Result<Start, ParseError> {
        if depth > self.max_depth {
            return Err(self.error(ParseErrorKind::TooDeep(self.max_depth)));
        }

        let Some(c) = self.peek() else {
            return Err(self.error(ParseErrorKind::UnexpectedEnd));
        };

        match c {
            _ if self.at_compound() => {
                let slot = self.graph.reserve();
                Ok(Start::Open(self.open(slot)?, depth + 1))
            }
            LABEL_MARK => self.label(depth),
            '"' => self.string().map(Start::Value),
            SYMBOL_QUOTE => self.symbol().map(Start::Value),
            SEQUENCE_CLOSE | MAPPING_CLOSE | RECORD_CLOSE => {
                Err(self.error(ParseErrorKind::UnbalancedBracket(c)))
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => self.number().map(Start::Value),
            c if c.is_alphabetic() => self.keyword().map(Start::Value),
            c => Err(self.error(ParseErrorKind::UnexpectedChar(c))),
        }
    }

    /// Parses `#N#` or the `#N=` prefix of a definition.
    fn label(&mut self, depth: usize) -> Result<Start, ParseError> {
        let start = self.pos;
        self.bump();

        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let text = self.text;
        let digits = &text[digits_start..self.pos];
        let invalid = |reader: &mut Self| {
            let tail = reader.token();
            let text = format!("{}{}{}", LABEL_MARK, digits, tail);
            reader.error_at(start, ParseErrorKind::InvalidLabel(text))
        };

        let Ok(label) = digits.parse::<Label>() else {
            return Err(invalid(self));
        };

        match self.peek() {
            Some(LABEL_MARK) => {
                self.bump();
                self.resolve(label, start).map(Start::Value)
            }
            Some(LABEL_DEFINE) => {
                self.bump();
                self.define(label, start, depth)
            }
            Some(_) => Err(invalid(self)),
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }

    fn resolve(&self, label: Label, start: usize) -> Result<NodeId, ParseError> {
        if let Some(&id) = self.labels.get(&label) {
            return Ok(id);
        }
        let kind = if self.pending.contains(&label) {
            ParseErrorKind::SelfReference(label)
        } else {
            ParseErrorKind::UnknownLabel(label)
        };
        Err(self.error_at(start, kind))
    }

    fn define(&mut self, label: Label, start: usize, depth: usize) -> Result<Start, ParseError> {
        if self.labels.contains_key(&label) || self.pending.contains(&label) {
            return Err(self.error_at(start, ParseErrorKind::DuplicateLabel(label)));
        }

        self.skip_trivia();
        if self.at_compound() {
            // Bind before the elements are parsed so they can refer back.
            let slot = self.graph.reserve();
            self.labels.insert(label, slot);
            Ok(Start::Open(self.open(slot)?, depth + 1))
        } else {
            // Only a chain of label marks can nest here.
            let depth = if self.peek() == Some(LABEL_MARK) {
                depth + 1
            } else {
                depth
            };
            self.pending.insert(label);
            Ok(Start::Open(Frame::Define { label }, depth))
        }
    }

    /// Consumes the opening delimiter of a container whose node is `slot`.
    fn open(&mut self, slot: NodeId) -> Result<Frame, ParseError> {
        let open = self.pos;

        if self.rest().starts_with(RECORD_OPEN) {
            self.pos += RECORD_OPEN.len();
            self.skip_trivia();
            let name = self.ident()?;
            return Ok(Frame::Record {
                slot,
                open,
                name,
                fields: Vec::new(),
                items: Vec::new(),
            });
        }

        match self.bump() {
            Some(SEQUENCE_OPEN) => Ok(Frame::Sequence {
                slot,
                open,
                items: Vec::new(),
            }),
            Some(MAPPING_OPEN) => Ok(Frame::Mapping {
                slot,
                open,
                items: Vec::new(),
            }),
            Some(c) => Err(self.error_at(open, ParseErrorKind::UnexpectedChar(c))),
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }

    /// Finishes `frame` if its closing delimiter comes next and returns its
    /// node. Otherwise reads what precedes the next element, which for a
    /// record is the field name.
    fn close(&mut self, frame: &mut Frame) -> Result<Option<NodeId>, ParseError> {
        match frame {
            Frame::Define { .. } => Ok(None),
            Frame::Sequence { slot, open, items } => match self.peek() {
                Some(SEQUENCE_CLOSE) => {
                    self.bump();
                    self.graph.fill(*slot, Node::Sequence(mem::take(items)));
                    Ok(Some(*slot))
                }
                None => Err(self.error_at(*open, ParseErrorKind::Unclosed(SEQUENCE_OPEN))),
                Some(_) => Ok(None),
            },
            Frame::Mapping { slot, open, items } => match self.peek() {
                Some(MAPPING_CLOSE) => {
                    self.bump();
                    if items.len() % 2 != 0 {
                        return Err(self.error_at(*open, ParseErrorKind::OddMappingEntries));
                    }
                    let pairs = items.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();
                    self.graph.fill(*slot, Node::Mapping(pairs));
                    Ok(Some(*slot))
                }
                None => Err(self.error_at(*open, ParseErrorKind::Unclosed(MAPPING_OPEN))),
                Some(_) => Ok(None),
            },
            // A field name is waiting for its value.
            Frame::Record { fields, items, .. } if fields.len() > items.len() => Ok(None),
            Frame::Record {
                slot,
                open,
                name,
                fields,
                items,
            } => match self.peek() {
                Some(RECORD_CLOSE) => {
                    self.bump();
                    let fields: IndexMap<String, NodeId> =
                        mem::take(fields).into_iter().zip(mem::take(items)).collect();
                    let name = mem::take(name);
                    self.graph.fill(*slot, Node::Record { name, fields });
                    Ok(Some(*slot))
                }
                None => Err(self.error_at(*open, ParseErrorKind::Unclosed('('))),
                Some(_) => {
                    let field_start = self.pos;
                    let field = self.ident()?;
                    if fields.contains(&field) {
                        return Err(self.error_at(field_start, ParseErrorKind::DuplicateField(field)));
                    }
                    fields.push(field);
                    self.skip_trivia();
                    Ok(None)
                }
            },
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let token = self.token();
        if token.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.error(ParseErrorKind::UnexpectedChar(c)),
                None => self.error(ParseErrorKind::UnexpectedEnd),
            });
        }
        if !syntax::is_ident(token) {
            return Err(self.error_at(start, ParseErrorKind::InvalidName(token.to_string())));
        }
        Ok(token.to_string())
    }

    fn string(&mut self) -> Result<NodeId, ParseError> {
        let start = self.pos;
        self.bump();

        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, ParseErrorKind::UnterminatedString)),
                Some('"') => break,
                Some('\\') => {
                    let escape = self.pos - 1;
                    let c = match self.bump() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('0') => '\0',
                        Some('u') => self.unicode_escape(escape)?,
                        Some(_) => {
                            let text = self.text[escape..self.pos].to_string();
                            return Err(self.error_at(escape, ParseErrorKind::InvalidEscape(text)));
                        }
                        None => {
                            return Err(self.error_at(start, ParseErrorKind::UnterminatedString));
                        }
                    };
                    value.push(c);
                }
                Some(c) => value.push(c),
            }
        }

        Ok(self.graph.text(value))
    }

    /// Parses the `{HEX}` part of a `\u{HEX}` escape.
    fn unicode_escape(&mut self, escape: usize) -> Result<char, ParseError> {
        if self.peek() == Some('{') {
            self.bump();
            let digits_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.bump();
            }
            let text = self.text;
            let digits = &text[digits_start..self.pos];
            if self.peek() == Some('}') {
                self.bump();
                let decoded = u32::from_str_radix(digits, 16)
                    .ok()
                    .and_then(char::from_u32);
                if let Some(c) = decoded {
                    return Ok(c);
                }
            }
        }
        let text = self.text[escape..self.pos].to_string();
        Err(self.error_at(escape, ParseErrorKind::InvalidEscape(text)))
    }

    fn symbol(&mut self) -> Result<NodeId, ParseError> {
        let start = self.pos;
        self.bump();
        let name = self.token();
        if !syntax::is_symbol(name) {
            let text = format!("{}{}", SYMBOL_QUOTE, name);
            return Err(self.error_at(start, ParseErrorKind::InvalidSymbol(text)));
        }
        Ok(self.graph.symbol(name))
    }

    fn number(&mut self) -> Result<NodeId, ParseError> {
        let start = self.pos;
        let token = self.token();

        let atom = match token {
            syntax::POSITIVE_INFINITY => Atom::Float(f64::INFINITY),
            syntax::NEGATIVE_INFINITY => Atom::Float(f64::NEG_INFINITY),
            syntax::NOT_A_NUMBER => Atom::Float(f64::NAN),
            t if t.contains(['.', 'e', 'E']) => match t.parse::<f64>() {
                Ok(value) => Atom::Float(value),
                Err(_) => {
                    return Err(self.error_at(start, ParseErrorKind::InvalidNumber(t.to_string())));
                }
            },
            t => match t.parse::<i64>() {
                Ok(value) => Atom::Int(value),
                Err(e) => {
                    let kind = match e.kind() {
                        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                            ParseErrorKind::IntegerOutOfRange(t.to_string())
                        }
                        _ => ParseErrorKind::InvalidNumber(t.to_string()),
                    };
                    return Err(self.error_at(start, kind));
                }
            },
        };

        Ok(self.graph.atom(atom))
    }

    fn keyword(&mut self) -> Result<NodeId, ParseError> {
        let start = self.pos;
        let atom = match self.token() {
            syntax::NIL => Atom::Nil,
            syntax::TRUE => Atom::Bool(true),
            syntax::FALSE => Atom::Bool(false),
            other => {
                return Err(self.error_at(start, ParseErrorKind::UnknownToken(other.to_string())));
            }
        };
        Ok(self.graph.atom(atom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_DEPTH;

    fn kind(text: &str) -> ParseErrorKind {
        read(text).unwrap_err().kind
    }

    #[test]
    fn atoms() {
        let snapshot = read(r#"[nil true false -42 2.5 "a\tb" 'key +inf.0]"#).unwrap();
        let items = snapshot.root_node().as_sequence().unwrap();
        let atoms: Vec<_> = items
            .iter()
            .map(|&id| snapshot.graph.node(id).as_atom().unwrap().clone())
            .collect();
        assert_eq!(
            atoms,
            vec![
                Atom::Nil,
                Atom::Bool(true),
                Atom::Bool(false),
                Atom::Int(-42),
                Atom::Float(2.5),
                Atom::Text("a\tb".to_string()),
                Atom::Symbol("key".to_string()),
                Atom::Float(f64::INFINITY),
            ]
        );
    }

    #[test]
    fn unicode_escape() {
        let snapshot = read(r#""bell\u{7}é""#).unwrap();
        assert_eq!(
            snapshot.root_node(),
            &Node::Atom(Atom::Text("bell\u{7}é".to_string()))
        );
    }

    #[test]
    fn record_fields_keep_order() {
        let snapshot = read("#s(point y 2 x 1)").unwrap();
        let (name, fields) = snapshot.root_node().as_record().unwrap();
        assert_eq!(name, "point");
        let names: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["y", "x"]);
    }

    #[test]
    fn mapping_pairs() {
        let snapshot = read("{'a 1 'b [2]}").unwrap();
        let pairs = snapshot.root_node().as_mapping().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(
            snapshot.graph.node(pairs[1].0),
            &Node::Atom(Atom::Symbol("b".to_string()))
        );
    }

    #[test]
    fn self_reference_resolves_to_container() {
        let snapshot = read(r#"#0=[1 "a" #0#]"#).unwrap();
        let items = snapshot.root_node().as_sequence().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2], snapshot.root);
    }

    #[test]
    fn shared_atom_is_one_node() {
        let snapshot = read(r#"[#0="x" #0#]"#).unwrap();
        let items = snapshot.root_node().as_sequence().unwrap();
        assert_eq!(items[0], items[1]);
    }

    #[test]
    fn mutual_cycle() {
        let snapshot = read("[#0={'value #1={'value #0#}} #1#]").unwrap();
        let items = snapshot.root_node().as_sequence().unwrap();
        let (a, b) = (items[0], items[1]);
        assert_ne!(a, b);
        assert_eq!(snapshot.graph.node(a).as_mapping().unwrap()[0].1, b);
        assert_eq!(snapshot.graph.node(b).as_mapping().unwrap()[0].1, a);
    }

    #[test]
    fn comments_are_skipped() {
        let snapshot = read(";; [ #0# \"\n;; }\n[1 ; inline ]\n 2]").unwrap();
        assert_eq!(snapshot.root_node().as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn trailing_content_ignored() {
        let snapshot = read("[1] [2 3] garbage ]]]").unwrap();
        assert_eq!(snapshot.root_node().as_sequence().unwrap().len(), 1);
    }

    #[test]
    fn empty_input() {
        assert_eq!(kind(""), ParseErrorKind::Empty);
        assert_eq!(kind(";; only a comment\n"), ParseErrorKind::Empty);
    }

    #[test]
    fn truncated_input() {
        assert_eq!(kind("[1 [2"), ParseErrorKind::Unclosed('['));
        assert_eq!(kind("{'a 1"), ParseErrorKind::Unclosed('{'));
        assert_eq!(kind("#s(p x 1"), ParseErrorKind::Unclosed('('));
        assert_eq!(kind("\"abc"), ParseErrorKind::UnterminatedString);
        assert_eq!(kind("#0="), ParseErrorKind::UnexpectedEnd);
    }

    #[test]
    fn unbalanced_brackets() {
        assert_eq!(kind("]"), ParseErrorKind::UnbalancedBracket(']'));
        assert_eq!(kind("[1 }"), ParseErrorKind::UnbalancedBracket('}'));
    }

    #[test]
    fn unknown_tokens() {
        assert_eq!(kind("maybe"), ParseErrorKind::UnknownToken("maybe".to_string()));
        assert_eq!(kind("12abc"), ParseErrorKind::InvalidNumber("12abc".to_string()));
        assert_eq!(kind("@"), ParseErrorKind::UnexpectedChar('@'));
        assert_eq!(kind("#x#"), ParseErrorKind::InvalidLabel("#x".to_string()));
    }

    #[test]
    fn integer_out_of_range() {
        assert_eq!(
            kind("99999999999999999999"),
            ParseErrorKind::IntegerOutOfRange("99999999999999999999".to_string())
        );
    }

    #[test]
    fn invalid_escape() {
        assert_eq!(kind(r#""\q""#), ParseErrorKind::InvalidEscape("\\q".to_string()));
        assert_eq!(
            kind(r#""\u{110000}""#),
            ParseErrorKind::InvalidEscape("\\u{110000}".to_string())
        );
    }

    #[test]
    fn label_errors() {
        assert_eq!(kind("[#0#]"), ParseErrorKind::UnknownLabel(0));
        assert_eq!(kind("[#1=1 #1=2]"), ParseErrorKind::DuplicateLabel(1));
        assert_eq!(kind("#0=#0#"), ParseErrorKind::SelfReference(0));
    }

    #[test]
    fn odd_mapping() {
        assert_eq!(kind("{'a 1 'b}"), ParseErrorKind::OddMappingEntries);
    }

    #[test]
    fn duplicate_field() {
        assert_eq!(
            kind("#s(p x 1 x 2)"),
            ParseErrorKind::DuplicateField("x".to_string())
        );
    }

    #[test]
    fn record_values_follow_their_names() {
        let snapshot = read("#s(link next #s(link next nil) tag 'end)").unwrap();
        let (_, fields) = snapshot.root_node().as_record().unwrap();
        let inner = snapshot.graph.node(fields["next"]).as_record().unwrap().1;
        assert_eq!(snapshot.graph.node(inner["next"]), &Node::Atom(Atom::Nil));
        assert_eq!(
            snapshot.graph.node(fields["tag"]),
            &Node::Atom(Atom::Symbol("end".to_string()))
        );

        assert_eq!(kind("#s(p x)"), ParseErrorKind::UnbalancedBracket(')'));
        assert_eq!(kind("#s(p x"), ParseErrorKind::UnexpectedEnd);
    }

    #[test]
    fn depth_limit() {
        let options = Options {
            max_depth: 3,
            ..Options::default()
        };
        assert!(read_with("[[[1]]]", &options).is_ok());
        let err = read_with("[[[[1]]]]", &options).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooDeep(3));
    }

    fn nested(depth: usize) -> String {
        format!("{}nil{}", "[".repeat(depth), "]".repeat(depth))
    }

    #[test]
    fn nesting_at_default_limit() {
        let snapshot = read(&nested(DEFAULT_MAX_DEPTH)).unwrap();
        assert_eq!(snapshot.graph.len(), DEFAULT_MAX_DEPTH + 1);

        let err = read(&nested(DEFAULT_MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooDeep(DEFAULT_MAX_DEPTH));
    }

    #[test]
    fn deep_nesting_within_raised_limit() {
        let depth = 100_000;
        let options = Options {
            max_depth: depth,
            ..Options::default()
        };
        let snapshot = read_with(&nested(depth), &options).unwrap();
        assert_eq!(snapshot.graph.len(), depth + 1);
    }

    #[test]
    fn unbounded_brackets_rejected() {
        let text = "[".repeat(1_000_000);
        assert_eq!(kind(&text), ParseErrorKind::TooDeep(DEFAULT_MAX_DEPTH));
    }

    #[test]
    fn deep_records_and_mappings() {
        let depth = 5_000;
        let mut text = String::new();
        for i in 0..depth {
            if i % 2 == 0 {
                text.push_str("#s(node next ");
            } else {
                text.push_str("{'next ");
            }
        }
        text.push_str("nil");
        for i in (0..depth).rev() {
            text.push(if i % 2 == 0 { ')' } else { '}' });
        }

        let options = Options {
            max_depth: depth,
            ..Options::default()
        };
        let snapshot = read_with(&text, &options).unwrap();
        assert_eq!(snapshot.graph.len(), depth + depth / 2 + 1);
        assert!(snapshot.root_node().as_record().is_some());
    }

    #[test]
    fn label_chain_binds_every_label() {
        let snapshot = read("[#0=#1=5 #0# #1#]").unwrap();
        let items = snapshot.root_node().as_sequence().unwrap();
        assert_eq!(items[0], items[1]);
        assert_eq!(items[0], items[2]);
    }

    #[test]
    fn error_position() {
        let err = read(";; header\n[1\n  @]").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedChar('@'));
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 3);
        assert_eq!(err.offset, 15);
    }

    #[test]
    fn invalid_utf8() {
        let err = read_bytes(b"[1 \xff]", &Options::default()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidUtf8);
        assert_eq!(err.offset, 3);
    }
}
