//! Conversion between Rust values and graph nodes.

use std::collections::BTreeMap;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::graph::{Atom, Graph, Node, NodeId};

/// Error type for [`Persist::load`].
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("expected record {expected}, found record {found}")]
    WrongRecord { expected: String, found: String },
    #[error("record {record} has no field {field}")]
    MissingField { record: String, field: String },
    #[error("value {0} is out of range")]
    OutOfRange(i64),
    #[error("unknown variant {0}")]
    UnknownVariant(String),
}

/// A Rust value that can be stored as a graph node and loaded back.
///
/// Plain Rust values are trees, so `store` never produces sharing. Use
/// [`Graph`] directly for shared or cyclic structures.
///
/// Derive with `#[derive(Persist)]`: named structs become records named after
/// the type, field-less enums become symbols.
pub trait Persist: Sized {
    /// Adds this value to `graph` and returns the node representing it.
    fn store(&self, graph: &mut Graph) -> NodeId;

    /// Rebuilds a value from the node `id`.
    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError>;
}

fn node(graph: &Graph, id: NodeId) -> Result<&Node, ConvertError> {
    graph.get(id).ok_or(ConvertError::UnknownNode(id))
}

fn atom<'g>(graph: &'g Graph, id: NodeId, expected: &'static str) -> Result<&'g Atom, ConvertError> {
    match node(graph, id)? {
        Node::Atom(atom) => Ok(atom),
        other => Err(ConvertError::Mismatch {
            expected,
            found: other.type_name(),
        }),
    }
}

fn mismatch(expected: &'static str, atom: &Atom) -> ConvertError {
    ConvertError::Mismatch {
        expected,
        found: atom.type_name(),
    }
}

/// Returns the fields of the record `id`, checking its name.
pub fn record_fields<'g>(
    graph: &'g Graph,
    id: NodeId,
    name: &str,
) -> Result<&'g IndexMap<String, NodeId>, ConvertError> {
    match node(graph, id)? {
        Node::Record { name: found, fields } if found == name => Ok(fields),
        Node::Record { name: found, .. } => Err(ConvertError::WrongRecord {
            expected: name.to_string(),
            found: found.clone(),
        }),
        other => Err(ConvertError::Mismatch {
            expected: "record",
            found: other.type_name(),
        }),
    }
}

/// Loads the field `field` of a record returned by [`record_fields`].
pub fn field<T: Persist>(
    graph: &Graph,
    fields: &IndexMap<String, NodeId>,
    record: &str,
    field: &str,
) -> Result<T, ConvertError> {
    let id = fields
        .get(field)
        .copied()
        .ok_or_else(|| ConvertError::MissingField {
            record: record.to_string(),
            field: field.to_string(),
        })?;
    T::load(graph, id)
}

/// Returns the name of the symbol `id`.
pub fn symbol(graph: &Graph, id: NodeId) -> Result<&str, ConvertError> {
    match atom(graph, id, "symbol")? {
        Atom::Symbol(name) => Ok(name),
        other => Err(mismatch("symbol", other)),
    }
}

impl Persist for bool {
    fn store(&self, graph: &mut Graph) -> NodeId {
        graph.bool(*self)
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        match atom(graph, id, "bool")? {
            Atom::Bool(value) => Ok(*value),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl Persist for String {
    fn store(&self, graph: &mut Graph) -> NodeId {
        graph.text(self.as_str())
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        match atom(graph, id, "text")? {
            Atom::Text(value) => Ok(value.clone()),
            other => Err(mismatch("text", other)),
        }
    }
}

impl Persist for () {
    fn store(&self, graph: &mut Graph) -> NodeId {
        graph.nil()
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        match atom(graph, id, "nil")? {
            Atom::Nil => Ok(()),
            other => Err(mismatch("nil", other)),
        }
    }
}

macro_rules! impl_persist_int {
    ($($t:ty),*) => {
        $(
            impl Persist for $t {
                fn store(&self, graph: &mut Graph) -> NodeId {
                    graph.int(i64::from(*self))
                }

                fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
                    match atom(graph, id, "int")? {
                        Atom::Int(value) => {
                            <$t>::try_from(*value).map_err(|_| ConvertError::OutOfRange(*value))
                        }
                        other => Err(mismatch("int", other)),
                    }
                }
            }
        )*
    };
}

impl_persist_int!(i8, i16, i32, i64, u8, u16, u32);

impl Persist for f64 {
    fn store(&self, graph: &mut Graph) -> NodeId {
        graph.float(*self)
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        match atom(graph, id, "float")? {
            Atom::Float(value) => Ok(*value),
            other => Err(mismatch("float", other)),
        }
    }
}

impl Persist for f32 {
    fn store(&self, graph: &mut Graph) -> NodeId {
        graph.float(f64::from(*self))
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        f64::load(graph, id).map(|value| value as f32)
    }
}

/// `None` is stored as `nil`, so `Option<()>` cannot tell `Some(())` from `None`.
impl<T: Persist> Persist for Option<T> {
    fn store(&self, graph: &mut Graph) -> NodeId {
        match self {
            Some(value) => value.store(graph),
            None => graph.nil(),
        }
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        match node(graph, id)? {
            Node::Atom(Atom::Nil) => Ok(None),
            _ => T::load(graph, id).map(Some),
        }
    }
}

impl<T: Persist> Persist for Box<T> {
    fn store(&self, graph: &mut Graph) -> NodeId {
        (**self).store(graph)
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        T::load(graph, id).map(Box::new)
    }
}

impl<T: Persist> Persist for Vec<T> {
    fn store(&self, graph: &mut Graph) -> NodeId {
        let items: Vec<NodeId> = self.iter().map(|item| item.store(graph)).collect();
        graph.sequence(items)
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        match node(graph, id)? {
            Node::Sequence(items) => items.iter().map(|&item| T::load(graph, item)).collect(),
            other => Err(ConvertError::Mismatch {
                expected: "sequence",
                found: other.type_name(),
            }),
        }
    }
}

fn entries(graph: &Graph, id: NodeId) -> Result<&[(NodeId, NodeId)], ConvertError> {
    match node(graph, id)? {
        Node::Mapping(pairs) => Ok(pairs),
        other => Err(ConvertError::Mismatch {
            expected: "mapping",
            found: other.type_name(),
        }),
    }
}

impl<K, V> Persist for IndexMap<K, V>
where
    K: Persist + Hash + Eq,
    V: Persist,
{
    fn store(&self, graph: &mut Graph) -> NodeId {
        let pairs: Vec<(NodeId, NodeId)> = self
            .iter()
            .map(|(k, v)| (k.store(graph), v.store(graph)))
            .collect();
        graph.mapping(pairs)
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        entries(graph, id)?
            .iter()
            .map(|&(k, v)| -> Result<(K, V), ConvertError> {
                Ok((K::load(graph, k)?, V::load(graph, v)?))
            })
            .collect()
    }
}

impl<K, V> Persist for BTreeMap<K, V>
where
    K: Persist + Ord,
    V: Persist,
{
    fn store(&self, graph: &mut Graph) -> NodeId {
        let pairs: Vec<(NodeId, NodeId)> = self
            .iter()
            .map(|(k, v)| (k.store(graph), v.store(graph)))
            .collect();
        graph.mapping(pairs)
    }

    fn load(graph: &Graph, id: NodeId) -> Result<Self, ConvertError> {
        entries(graph, id)?
            .iter()
            .map(|&(k, v)| -> Result<(K, V), ConvertError> {
                Ok((K::load(graph, k)?, V::load(graph, v)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: Persist + PartialEq + std::fmt::Debug>(value: T) {
        let mut graph = Graph::new();
        let id = value.store(&mut graph);
        let loaded = T::load(&graph, id).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn primitives() {
        roundtrip(true);
        roundtrip(-7i32);
        roundtrip(200u8);
        roundtrip(1.25f64);
        roundtrip("text".to_string());
        roundtrip(());
    }

    #[test]
    fn containers() {
        roundtrip(vec![Some(1i64), None, Some(3)]);

        let mut map = IndexMap::new();
        map.insert("b".to_string(), vec![1u32]);
        map.insert("a".to_string(), vec![]);
        roundtrip(map);

        let mut sorted = BTreeMap::new();
        sorted.insert(2i64, "two".to_string());
        sorted.insert(1i64, "one".to_string());
        roundtrip(sorted);
    }

    #[test]
    fn out_of_range() {
        let mut graph = Graph::new();
        let id = graph.int(300);
        let err = u8::load(&graph, id).unwrap_err();
        assert!(matches!(err, ConvertError::OutOfRange(300)));
    }

    #[test]
    fn type_mismatch() {
        let mut graph = Graph::new();
        let id = graph.text("nope");
        let err = bool::load(&graph, id).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Mismatch {
                expected: "bool",
                found: "text"
            }
        ));
    }

    #[test]
    fn record_helpers() {
        let mut graph = Graph::new();
        let x = graph.int(4);
        let id = graph.record("point", [("x", x)]);

        let fields = record_fields(&graph, id, "point").unwrap();
        let loaded: i64 = field(&graph, fields, "point", "x").unwrap();
        assert_eq!(loaded, 4);

        let missing = field::<i64>(&graph, fields, "point", "y").unwrap_err();
        assert!(matches!(missing, ConvertError::MissingField { .. }));

        let wrong = record_fields(&graph, id, "line").unwrap_err();
        assert!(matches!(wrong, ConvertError::WrongRecord { .. }));
    }
}
