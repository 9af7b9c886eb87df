//! Discovery of shared and cyclic nodes.
//!
//! A node needs a label when it is referenced more than once within one save
//! pass. The root starts with one reference (the caller's), so a root that is
//! reachable from its own descendants gets a label too.

use std::collections::{HashMap, HashSet};

use log::trace;

use crate::graph::{Graph, NodeId};

/// Label number bound to a multiply-referenced node within one artifact.
pub type Label = u32;

/// Result of walking a graph: reference counts and the labels derived from them.
#[derive(Debug, Default)]
pub struct LabelPlan {
    counts: HashMap<NodeId, u32>,
    labels: HashMap<NodeId, Label>,
    /// Reachable nodes in preorder of first visit.
    order: Vec<NodeId>,
}

impl LabelPlan {
    /// Walks everything reachable from `root` and labels the shared nodes.
    ///
    /// The walk is depth-first in declaration order with an explicit stack,
    /// expanding every node exactly once. Labels are numbered in preorder of
    /// first visit, which is the order in which the writer first renders
    /// nodes, so label definitions appear in ascending order in the text.
    pub fn assign(graph: &Graph, root: NodeId) -> Self {
        let mut counts: HashMap<NodeId, u32> = HashMap::new();
        let mut expanded: HashSet<NodeId> = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        counts.insert(root, 1);

        while let Some(id) = stack.pop() {
            if !expanded.insert(id) {
                continue;
            }
            order.push(id);

            let start = stack.len();
            for child in graph.children(id) {
                *counts.entry(child).or_insert(0) += 1;
                if !expanded.contains(&child) {
                    stack.push(child);
                }
            }
            // First child on top of the stack.
            stack[start..].reverse();
        }

        let labels: HashMap<NodeId, Label> = order
            .iter()
            .filter(|id| counts.get(id).copied().unwrap_or(0) > 1)
            .enumerate()
            .map(|(label, &id)| (id, label as Label))
            .collect();

        trace!(
            "label plan: {} reachable nodes, {} labeled",
            order.len(),
            labels.len()
        );

        LabelPlan {
            counts,
            labels,
            order,
        }
    }

    /// Returns the label of `id`, if it is shared.
    pub fn label(&self, id: NodeId) -> Option<Label> {
        self.labels.get(&id).copied()
    }

    /// Number of references to `id` seen during the walk.
    pub fn reference_count(&self, id: NodeId) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Number of distinct nodes reachable from the root.
    pub fn reachable(&self) -> usize {
        self.order.len()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labeled nodes in label order.
    pub fn labeled(&self) -> impl Iterator<Item = (NodeId, Label)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.label(id).map(|label| (id, label)))
    }
}
