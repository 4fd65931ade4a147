//! FILENAME: crosstab-engine/src/precedence.rs
//! PURPOSE: Directed graph of "A immediately precedes B" facts between axis keys.
//! CONTEXT: The topological-merge strategy records, for every row-group, an
//! edge between each pair of consecutive distinct column keys. A total order
//! consistent with all edges is the discovered column axis; a cycle means two
//! row-groups disagree about the order.
//!
//! TERMINOLOGY:
//! - Successors: keys observed directly after a key in some row-group.
//! - Predecessors: the reverse mapping, kept so a cycle can be traced back
//!   for the error report.
//!
//! Nodes are numbered in first-seen order. That numbering is the tie-break of
//! the sort, which makes the result independent of hash iteration order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{CrosstabError, Result};
use crate::key::AxisKey;

/// Dense node identifier; also the first-seen rank of the key.
pub type NodeId = usize;

type Adjacency = SmallVec<[NodeId; 4]>;

#[derive(Debug, Default)]
pub struct PrecedenceGraph {
    /// Keys indexed by NodeId.
    keys: Vec<AxisKey>,

    /// Reverse lookup for interning.
    ids: FxHashMap<AxisKey, NodeId>,

    /// For each node, the nodes that must come after it.
    successors: Vec<Adjacency>,

    /// For each node, the nodes that must come before it.
    predecessors: Vec<Adjacency>,

    /// Every recorded edge, for idempotent insertion.
    edges: FxHashSet<(NodeId, NodeId)>,
}

impl PrecedenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `key`, returning its node id. Existing keys keep their id.
    pub fn ensure_node(&mut self, key: &AxisKey) -> NodeId {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }

        let id = self.keys.len();
        self.keys.push(key.clone());
        self.ids.insert(key.clone(), id);
        self.successors.push(Adjacency::new());
        self.predecessors.push(Adjacency::new());
        id
    }

    /// Records `pred` immediately before `succ`. Recording the same edge
    /// again is a no-op. Self-edges are ignored.
    pub fn add_edge(&mut self, pred: NodeId, succ: NodeId) {
        if pred == succ || !self.edges.insert((pred, succ)) {
            return;
        }
        self.successors[pred].push(succ);
        self.predecessors[succ].push(pred);
    }

    pub fn node_count(&self) -> usize {
        self.keys.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn key(&self, id: NodeId) -> Option<&AxisKey> {
        self.keys.get(id)
    }

    /// Sorts the keys with Kahn's algorithm. Among the nodes whose
    /// predecessors have all been emitted, the one seen first goes next.
    ///
    /// # Returns
    /// - `Ok(Vec<AxisKey>)` - every key, in an order consistent with all edges.
    /// - `Err(StructuralConflict)` - the edges contain a cycle.
    pub fn topological_order(&self) -> Result<Vec<AxisKey>> {
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(|p| p.len()).collect();

        let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(id, _)| Reverse(id))
            .collect();

        let mut order = Vec::with_capacity(self.keys.len());

        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);

            for &succ in &self.successors[id] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        // Nodes left with a non-zero in-degree sit on or behind a cycle.
        if order.len() != self.keys.len() {
            let cycle = self.find_cycle(&in_degree);
            trace!(
                target: "crosstab",
                "precedence cycle across {} keys, {} of {} nodes ordered",
                cycle.len().saturating_sub(1),
                order.len(),
                self.keys.len()
            );
            return Err(CrosstabError::StructuralConflict {
                cycle: cycle.into_iter().map(|id| self.keys[id].clone()).collect(),
            });
        }

        Ok(order.into_iter().map(|id| self.keys[id].clone()).collect())
    }

    /// Traces one concrete cycle among the unsorted nodes.
    ///
    /// Every unsorted node still has an unsorted predecessor, so walking
    /// predecessors from any of them must revisit a node. The walk is
    /// reversed to report the cycle in precedence order.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<NodeId> {
        let Some(start) = in_degree.iter().position(|&deg| deg > 0) else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut seen_at: FxHashMap<NodeId, usize> = FxHashMap::default();
        seen_at.insert(start, 0);
        let mut current = start;

        loop {
            let Some(&pred) = self.predecessors[current]
                .iter()
                .find(|&&p| in_degree[p] > 0)
            else {
                // Unreachable for a genuine leftover set; report what we have.
                return path;
            };

            if let Some(&pos) = seen_at.get(&pred) {
                let mut cycle: Vec<NodeId> = path[pos..].to_vec();
                cycle.reverse();
                // Close the loop: last node precedes the first.
                cycle.push(cycle[0]);
                return cycle;
            }

            seen_at.insert(pred, path.len());
            path.push(pred);
            current = pred;
        }
    }
}
