use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Handle of a node inside a [`Graph`].
///
/// Identity in Amber is handle identity: two handles denote the same value
/// exactly when they are equal. Handles are only meaningful for the graph
/// that issued them.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a handle from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An immutable scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Atom {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// UTF-8 text, any content including control characters.
    Text(String),
    /// A symbolic name.
    Symbol(String),
}

impl Atom {
    /// Short name of the atom's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Atom::Nil => "nil",
            Atom::Bool(_) => "bool",
            Atom::Int(_) => "int",
            Atom::Float(_) => "float",
            Atom::Text(_) => "text",
            Atom::Symbol(_) => "symbol",
        }
    }

    /// Equality that treats floats bitwise and all NaNs as equal.
    fn same_value(&self, other: &Atom) -> bool {
        match (self, other) {
            (Atom::Float(a), Atom::Float(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            _ => self == other,
        }
    }
}

/// A value in the graph. Children are referenced by handle, so any node can
/// be shared between parents or reached from its own descendants.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Atom(Atom),
    /// Ordered list of values.
    Sequence(Vec<NodeId>),
    /// Ordered key/value pairs. Keys are values too.
    Mapping(Vec<(NodeId, NodeId)>),
    /// Named composite with named fields in declaration order.
    Record {
        name: String,
        fields: IndexMap<String, NodeId>,
    },
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Atom(_) => NodeKind::Atom,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Mapping(_) => NodeKind::Mapping,
            Node::Record { .. } => NodeKind::Record,
        }
    }

    /// Short name of the node's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Atom(atom) => atom.type_name(),
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
            Node::Record { .. } => "record",
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Node::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[NodeId]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(NodeId, NodeId)]> {
        match self {
            Node::Mapping(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Returns the record name and fields, if this is a record.
    pub fn as_record(&self) -> Option<(&str, &IndexMap<String, NodeId>)> {
        match self {
            Node::Record { name, fields } => Some((name, fields)),
            _ => None,
        }
    }
}

/// Coarse classification of [`Node`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Atom,
    Sequence,
    Mapping,
    Record,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Atom => "atom",
            NodeKind::Sequence => "sequence",
            NodeKind::Mapping => "mapping",
            NodeKind::Record => "record",
        };
        f.write_str(name)
    }
}

/// Error type for graph mutations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("expected {expected} at {id}, found {found}")]
    KindMismatch {
        id: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },
}

/// Arena owning every node of a value graph.
///
/// Nodes are never removed, so a handle stays valid for the lifetime of the
/// graph. Cyclic structures are built in two phases: [`Graph::reserve`] a
/// handle, build the children that point back at it, then [`Graph::set`] the
/// reserved node.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Graph {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of nodes in the arena, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Returns the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Iterates over all nodes in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Adds a node and returns its handle.
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocates a placeholder (`nil`) to be filled in later with [`Graph::set`].
    pub fn reserve(&mut self) -> NodeId {
        self.insert(Node::Atom(Atom::Nil))
    }

    /// Replaces the node behind `id`.
    pub fn set(&mut self, id: NodeId, node: Node) -> Result<(), GraphError> {
        let slot = self.get_mut(id).ok_or(GraphError::UnknownNode(id))?;
        *slot = node;
        Ok(())
    }

    /// Fills a slot returned by [`Graph::reserve`] on this graph.
    ///
    /// Reserved handles always index into the arena since nodes are never
    /// removed.
    pub(crate) fn fill(&mut self, id: NodeId, node: Node) {
        self.nodes[id.index()] = node;
    }

    pub fn atom(&mut self, atom: Atom) -> NodeId {
        self.insert(Node::Atom(atom))
    }

    pub fn nil(&mut self) -> NodeId {
        self.atom(Atom::Nil)
    }

    pub fn bool(&mut self, value: bool) -> NodeId {
        self.atom(Atom::Bool(value))
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.atom(Atom::Int(value))
    }

    pub fn float(&mut self, value: f64) -> NodeId {
        self.atom(Atom::Float(value))
    }

    pub fn text(&mut self, value: impl Into<String>) -> NodeId {
        self.atom(Atom::Text(value.into()))
    }

    pub fn symbol(&mut self, name: impl Into<String>) -> NodeId {
        self.atom(Atom::Symbol(name.into()))
    }

    pub fn sequence(&mut self, items: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.insert(Node::Sequence(items.into_iter().collect()))
    }

    pub fn mapping(&mut self, pairs: impl IntoIterator<Item = (NodeId, NodeId)>) -> NodeId {
        self.insert(Node::Mapping(pairs.into_iter().collect()))
    }

    /// Adds a record. A repeated field name keeps the last value.
    pub fn record<N, F>(&mut self, name: N, fields: impl IntoIterator<Item = (F, NodeId)>) -> NodeId
    where
        N: Into<String>,
        F: Into<String>,
    {
        self.insert(Node::Record {
            name: name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    /// Appends `child` to the sequence `seq`.
    pub fn push(&mut self, seq: NodeId, child: NodeId) -> Result<(), GraphError> {
        match self.get_mut(seq) {
            Some(Node::Sequence(items)) => {
                items.push(child);
                Ok(())
            }
            Some(other) => Err(GraphError::KindMismatch {
                id: seq,
                expected: NodeKind::Sequence,
                found: other.kind(),
            }),
            None => Err(GraphError::UnknownNode(seq)),
        }
    }

    /// Appends a key/value pair to the mapping `map`.
    pub fn insert_entry(&mut self, map: NodeId, key: NodeId, value: NodeId) -> Result<(), GraphError> {
        match self.get_mut(map) {
            Some(Node::Mapping(pairs)) => {
                pairs.push((key, value));
                Ok(())
            }
            Some(other) => Err(GraphError::KindMismatch {
                id: map,
                expected: NodeKind::Mapping,
                found: other.kind(),
            }),
            None => Err(GraphError::UnknownNode(map)),
        }
    }

    /// Sets a field of the record `record`, returning the previous value.
    pub fn set_field(
        &mut self,
        record: NodeId,
        name: impl Into<String>,
        value: NodeId,
    ) -> Result<Option<NodeId>, GraphError> {
        match self.get_mut(record) {
            Some(Node::Record { fields, .. }) => Ok(fields.insert(name.into(), value)),
            Some(other) => Err(GraphError::KindMismatch {
                id: record,
                expected: NodeKind::Record,
                found: other.kind(),
            }),
            None => Err(GraphError::UnknownNode(record)),
        }
    }

    /// Iterates over the direct children of `id` in declaration order.
    ///
    /// Mapping entries yield the key before the value. Unknown handles and
    /// atoms have no children.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        match self.get(id) {
            Some(Node::Sequence(items)) => Children::Sequence(items.iter()),
            Some(Node::Mapping(pairs)) => Children::Mapping {
                pairs: pairs.iter(),
                value: None,
            },
            Some(Node::Record { fields, .. }) => Children::Record(fields.values()),
            Some(Node::Atom(_)) | None => Children::Empty,
        }
    }
}

/// Iterator over the children of a node, see [`Graph::children`].
pub enum Children<'a> {
    Empty,
    Sequence(std::slice::Iter<'a, NodeId>),
    Mapping {
        pairs: std::slice::Iter<'a, (NodeId, NodeId)>,
        value: Option<NodeId>,
    },
    Record(indexmap::map::Values<'a, String, NodeId>),
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        match self {
            Children::Empty => None,
            Children::Sequence(items) => items.next().copied(),
            Children::Mapping { pairs, value } => {
                if let Some(v) = value.take() {
                    return Some(v);
                }
                let (k, v) = pairs.next()?;
                *value = Some(*v);
                Some(*k)
            }
            Children::Record(values) => values.next().copied(),
        }
    }
}

/// A restored value graph together with its root.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub graph: Graph,
    pub root: NodeId,
}

impl Snapshot {
    /// Returns the root node.
    pub fn root_node(&self) -> &Node {
        self.graph.node(self.root)
    }
}

/// Checks whether the graph reachable from `a_root` in `a` and the one
/// reachable from `b_root` in `b` have the same shape, the same atom values
/// and the same sharing topology.
///
/// A bijection between handles is built while walking both graphs in
/// lockstep; a node that is shared on one side must be shared identically on
/// the other. Two distinct but equal nodes are therefore not equal to one
/// shared node.
pub fn structurally_equal(a: &Graph, a_root: NodeId, b: &Graph, b_root: NodeId) -> bool {
    let mut forward: HashMap<NodeId, NodeId> = HashMap::new();
    let mut backward: HashMap<NodeId, NodeId> = HashMap::new();
    let mut stack = vec![(a_root, b_root)];

    while let Some((x, y)) = stack.pop() {
        match (forward.get(&x), backward.get(&y)) {
            (Some(&fx), Some(&by)) => {
                if fx != y || by != x {
                    return false;
                }
                continue;
            }
            (None, None) => {
                forward.insert(x, y);
                backward.insert(y, x);
            }
            _ => return false,
        }

        let (Some(nx), Some(ny)) = (a.get(x), b.get(y)) else {
            return false;
        };

        match (nx, ny) {
            (Node::Atom(ax), Node::Atom(ay)) => {
                if !ax.same_value(ay) {
                    return false;
                }
            }
            (Node::Sequence(xs), Node::Sequence(ys)) => {
                if xs.len() != ys.len() {
                    return false;
                }
                stack.extend(xs.iter().copied().zip(ys.iter().copied()));
            }
            (Node::Mapping(xs), Node::Mapping(ys)) => {
                if xs.len() != ys.len() {
                    return false;
                }
                for (&(kx, vx), &(ky, vy)) in xs.iter().zip(ys) {
                    stack.push((kx, ky));
                    stack.push((vx, vy));
                }
            }
            (
                Node::Record {
                    name: name_x,
                    fields: fields_x,
                },
                Node::Record {
                    name: name_y,
                    fields: fields_y,
                },
            ) => {
                if name_x != name_y || fields_x.len() != fields_y.len() {
                    return false;
                }
                for ((fx, &vx), (fy, &vy)) in fields_x.iter().zip(fields_y) {
                    if fx != fy {
                        return false;
                    }
                    stack.push((vx, vy));
                }
            }
            _ => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct HostState {
        cursor: NodeId,
        last: Atom,
    }

    #[test]
    fn handles_serialize_as_integers() {
        let state = HostState {
            cursor: NodeId::from_raw(7),
            last: Atom::Int(3),
        };
        let text = toml::to_string(&state).unwrap();
        assert!(text.starts_with("cursor = 7\n"), "{text}");

        let parsed: HostState = toml::from_str(&text).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn insert_and_get() {
        let mut graph = Graph::new();
        let id = graph.text("hello");
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(id), &Node::Atom(Atom::Text("hello".to_string())));
        assert!(graph.get(NodeId::from_raw(7)).is_none());
    }

    #[test]
    fn reserve_then_set_builds_cycle() {
        let mut graph = Graph::new();
        let seq = graph.reserve();
        let one = graph.int(1);
        graph.set(seq, Node::Sequence(vec![one, seq])).unwrap();

        let children: Vec<_> = graph.children(seq).collect();
        assert_eq!(children, vec![one, seq]);
    }

    #[test]
    fn push_rejects_wrong_kind() {
        let mut graph = Graph::new();
        let atom = graph.int(3);
        let child = graph.nil();
        let err = graph.push(atom, child).unwrap_err();
        assert!(matches!(
            err,
            GraphError::KindMismatch {
                expected: NodeKind::Sequence,
                found: NodeKind::Atom,
                ..
            }
        ));
    }

    #[test]
    fn set_unknown_node() {
        let mut graph = Graph::new();
        let err = graph.set(NodeId::from_raw(0), Node::Atom(Atom::Nil)).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(_)));
    }

    #[test]
    fn mapping_children_interleave_keys_and_values() {
        let mut graph = Graph::new();
        let k1 = graph.symbol("a");
        let v1 = graph.int(1);
        let k2 = graph.symbol("b");
        let v2 = graph.int(2);
        let map = graph.mapping([(k1, v1), (k2, v2)]);

        let children: Vec<_> = graph.children(map).collect();
        assert_eq!(children, vec![k1, v1, k2, v2]);
    }

    #[test]
    fn set_field_replaces_value() {
        let mut graph = Graph::new();
        let x = graph.int(1);
        let record = graph.record("point", [("x", x)]);
        let y = graph.int(2);
        let previous = graph.set_field(record, "x", y).unwrap();
        assert_eq!(previous, Some(x));
    }

    #[test]
    fn structural_equality_respects_sharing() {
        // [s s] with s shared
        let mut shared = Graph::new();
        let s = shared.text("x");
        let shared_root = shared.sequence([s, s]);

        // [s1 s2] with distinct but equal nodes
        let mut distinct = Graph::new();
        let s1 = distinct.text("x");
        let s2 = distinct.text("x");
        let distinct_root = distinct.sequence([s1, s2]);

        assert!(structurally_equal(&shared, shared_root, &shared, shared_root));
        assert!(!structurally_equal(&shared, shared_root, &distinct, distinct_root));
        assert!(!structurally_equal(&distinct, distinct_root, &shared, shared_root));
    }

    #[test]
    fn structural_equality_on_cycles() {
        let mut a = Graph::new();
        let ra = a.reserve();
        let one = a.int(1);
        a.set(ra, Node::Sequence(vec![one, ra])).unwrap();

        let mut b = Graph::new();
        let two = b.int(1);
        let rb = b.reserve();
        b.set(rb, Node::Sequence(vec![two, rb])).unwrap();

        assert!(structurally_equal(&a, ra, &b, rb));
    }

    #[test]
    fn nan_atoms_compare_equal() {
        let mut a = Graph::new();
        let x = a.float(f64::NAN);
        let mut b = Graph::new();
        let y = b.float(-f64::NAN);
        assert!(structurally_equal(&a, x, &b, y));
    }
}
