//! Rendering a value graph as artifact text.

use std::fmt::{self, Write};

use crate::comment::encode_comment;
use crate::config::Options;
use crate::graph::{Atom, Graph, Node, NodeId};
use crate::label::{Label, LabelPlan};
use crate::syntax;

/// Error type for rendering a graph.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("symbol {0:?} cannot be written as a literal")]
    InvalidSymbol(String),
    #[error("{0:?} is not a valid record or field name")]
    InvalidName(String),
    #[error("nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),
    #[error("node {0} does not belong to the graph")]
    DanglingNode(NodeId),
    #[error("formatting failed")]
    Format(#[from] fmt::Error),
}

/// Output still owed by the writer, innermost last.
enum Step<'g> {
    Node(NodeId, usize),
    Char(char),
    /// A record field name with its surrounding delimiters.
    Field(&'g str),
}

/// Depth-first renderer driven by a [`LabelPlan`].
///
/// The first time a labeled node is rendered it is emitted as `#N=` followed
/// by its definition; every later occurrence becomes the back-reference `#N#`
/// without descending into the node again.
pub struct Writer<'a, W: Write> {
    graph: &'a Graph,
    plan: &'a LabelPlan,
    out: &'a mut W,
    defined: Vec<bool>,
    max_depth: usize,
}

impl<'a, W: Write> Writer<'a, W> {
    pub fn new(graph: &'a Graph, plan: &'a LabelPlan, out: &'a mut W, max_depth: usize) -> Self {
        Writer {
            graph,
            plan,
            out,
            defined: vec![false; plan.len()],
            max_depth,
        }
    }

    /// Renders the value rooted at `id`.
    ///
    /// Pending output is kept on an explicit stack, so deep values do not
    /// consume thread stack.
    pub fn write(&mut self, id: NodeId) -> Result<(), EncodeError> {
        let mut stack = vec![Step::Node(id, 0)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Node(id, depth) => self.node(id, depth, &mut stack)?,
                Step::Char(c) => self.out.write_char(c)?,
                Step::Field(name) => {
                    self.out.write_char(syntax::DELIMITER)?;
                    self.out.write_str(name)?;
                    self.out.write_char(syntax::DELIMITER)?;
                }
            }
        }
        Ok(())
    }

    /// Writes the start of `id` and schedules the rest on `stack`.
    fn node(&mut self, id: NodeId, depth: usize, stack: &mut Vec<Step<'a>>) -> Result<(), EncodeError> {
        if depth > self.max_depth {
            return Err(EncodeError::TooDeep(self.max_depth));
        }

        if let Some(label) = self.plan.label(id) {
            if self.is_defined(label) {
                write!(self.out, "#{}#", label)?;
                return Ok(());
            }
            self.defined[label as usize] = true;
            write!(self.out, "#{}=", label)?;
        }

        let graph = self.graph;
        match graph.get(id).ok_or(EncodeError::DanglingNode(id))? {
            Node::Atom(atom) => self.atom(atom)?,
            Node::Sequence(items) => {
                self.out.write_char(syntax::SEQUENCE_OPEN)?;
                stack.push(Step::Char(syntax::SEQUENCE_CLOSE));
                for (i, &item) in items.iter().enumerate().rev() {
                    stack.push(Step::Node(item, depth + 1));
                    if i > 0 {
                        stack.push(Step::Char(syntax::DELIMITER));
                    }
                }
            }
            Node::Mapping(pairs) => {
                self.out.write_char(syntax::MAPPING_OPEN)?;
                stack.push(Step::Char(syntax::MAPPING_CLOSE));
                for (i, &(key, value)) in pairs.iter().enumerate().rev() {
                    stack.push(Step::Node(value, depth + 1));
                    stack.push(Step::Char(syntax::DELIMITER));
                    stack.push(Step::Node(key, depth + 1));
                    if i > 0 {
                        stack.push(Step::Char(syntax::DELIMITER));
                    }
                }
            }
            Node::Record { name, fields } => {
                check_name(name)?;
                self.out.write_str(syntax::RECORD_OPEN)?;
                self.out.write_str(name)?;
                stack.push(Step::Char(syntax::RECORD_CLOSE));
                for (field, &value) in fields.iter().rev() {
                    check_name(field)?;
                    stack.push(Step::Node(value, depth + 1));
                    stack.push(Step::Field(field));
                }
            }
        }
        Ok(())
    }

    fn is_defined(&self, label: Label) -> bool {
        self.defined.get(label as usize).copied().unwrap_or(false)
    }

    fn atom(&mut self, atom: &Atom) -> Result<(), EncodeError> {
        match atom {
            Atom::Nil => self.out.write_str(syntax::NIL)?,
            Atom::Bool(true) => self.out.write_str(syntax::TRUE)?,
            Atom::Bool(false) => self.out.write_str(syntax::FALSE)?,
            Atom::Int(value) => write!(self.out, "{}", value)?,
            Atom::Float(value) => syntax::write_float(&mut *self.out, *value)?,
            Atom::Text(value) => syntax::write_string(&mut *self.out, value)?,
            Atom::Symbol(name) => {
                if !syntax::is_symbol(name) {
                    return Err(EncodeError::InvalidSymbol(name.clone()));
                }
                self.out.write_char(syntax::SYMBOL_QUOTE)?;
                self.out.write_str(name)?;
            }
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), EncodeError> {
    if syntax::is_ident(name) {
        Ok(())
    } else {
        Err(EncodeError::InvalidName(name.to_string()))
    }
}

/// Writes a complete artifact: the optional comment block followed by the
/// single top-level expression.
pub fn write_artifact(
    out: &mut impl Write,
    graph: &Graph,
    root: NodeId,
    plan: &LabelPlan,
    comment: Option<&str>,
    options: &Options,
) -> Result<(), EncodeError> {
    if let Some(comment) = comment {
        out.write_str(&encode_comment(comment))?;
    }
    Writer::new(graph, plan, &mut *out, options.max_depth).write(root)?;
    if options.trailing_newline {
        out.write_char('\n')?;
    }
    Ok(())
}

/// Renders the graph rooted at `root` as artifact text with default options.
pub fn to_string(graph: &Graph, root: NodeId, comment: Option<&str>) -> Result<String, EncodeError> {
    to_string_with(graph, root, comment, &Options::default())
}

pub fn to_string_with(
    graph: &Graph,
    root: NodeId,
    comment: Option<&str>,
    options: &Options,
) -> Result<String, EncodeError> {
    let plan = LabelPlan::assign(graph, root);
    let mut out = String::new();
    write_artifact(&mut out, graph, root, &plan, comment, options)?;
    Ok(out)
}
