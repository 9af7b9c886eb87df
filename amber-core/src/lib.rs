//! Amber persists value graphs as human-readable text artifacts.
//!
//! Core concepts:
//! - **Graph**: An arena of nodes addressed by [`NodeId`]. Two references to the
//!   same id are the same node, so graphs may share structure or contain cycles.
//! - **Label plan**: The set of nodes reached more than once from a root. Each
//!   gets a label `#N=` where it is first written and `#N#` everywhere after.
//! - **Artifact**: An optional `;; ` comment header followed by exactly one
//!   expression.
//! - **Persister**: Saves and restores artifacts through an [`ArtifactStore`],
//!   reusing one scratch buffer across calls.
//!
//! # Example
//!
//! ```
//! use amber_core::{Graph, MemoryStore, Node, Persister};
//!
//! let mut graph = Graph::new();
//! let root = graph.reserve();
//! let one = graph.int(1);
//! let a = graph.text("a");
//! graph.set(root, Node::Sequence(vec![one, a, root])).unwrap();
//!
//! assert_eq!(
//!     amber_core::to_string(&graph, root, None).unwrap(),
//!     "#0=[1 \"a\" #0#]\n"
//! );
//!
//! let mut persister = Persister::new(MemoryStore::new());
//! persister.save(&graph, root, "state", Some("saved state")).unwrap();
//!
//! let snapshot = persister.restore("state").unwrap();
//! let items = snapshot.root_node().as_sequence().unwrap();
//! assert_eq!(items[2], snapshot.root);
//! ```

mod comment;
mod config;
mod graph;
mod label;
pub mod persist;
mod persister;
mod reader;
mod scratch;
mod store;
pub mod syntax;
mod writer;

pub use comment::{decode_comment, encode_comment};
pub use config::{Options, DEFAULT_MAX_DEPTH};
pub use graph::{structurally_equal, Atom, Children, Graph, GraphError, Node, NodeId, NodeKind, Snapshot};
pub use label::{Label, LabelPlan};
pub use persist::{ConvertError, Persist};
pub use persister::{PersistError, Persister};
pub use reader::{read, read_bytes, read_with, ParseError, ParseErrorKind};
pub use scratch::{Scratch, ScratchPool};
pub use store::{ArtifactStore, FileStore, MemoryStore};
pub use writer::{to_string, to_string_with, write_artifact, EncodeError, Writer};

#[cfg(feature = "derive")]
pub use amber_derive::{persistent, Persist};
