//! Dependency ordering of a finished model: every concept comes after the
//! concepts it references. Ties keep insertion order, so the result is
//! deterministic for a given input.

use crate::error::{DslError, ErrorCode};
use crate::model::{ConceptEntry, DslModel};
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

impl DslModel {
    /// Entries ordered so that referenced concepts precede the concepts
    /// referencing them. References a concept holds to itself are ignored;
    /// any other cycle is an error.
    pub fn dependency_order(&self) -> Result<Vec<&ConceptEntry>, DslError> {
        let entries = self.entries();
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(entries.len(), entries.len());
        let nodes: Vec<NodeIndex> = (0..entries.len()).map(|i| graph.add_node(i)).collect();

        for (i, entry) in entries.iter().enumerate() {
            for (_, reference) in entry.node.references() {
                let Some(t) = self.index_of(&reference.key()) else {
                    continue;
                };
                if t != i && graph.find_edge(nodes[t], nodes[i]).is_none() {
                    graph.add_edge(nodes[t], nodes[i], ());
                }
            }
        }

        let mut indegree: Vec<usize> = nodes
            .iter()
            .map(|&n| graph.neighbors_directed(n, petgraph::Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(entries.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(&entries[i]);
            for next in graph.neighbors(nodes[i]) {
                let j = graph[next];
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }

        if order.len() == entries.len() {
            return Ok(order);
        }

        let mut cycles: Vec<Vec<String>> = petgraph::algo::tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut keys: Vec<String> =
                    scc.iter().map(|n| entries[graph[*n]].key.to_string()).collect();
                keys.sort();
                keys
            })
            .collect();
        cycles.sort();
        let first = cycles.first().cloned().unwrap_or_default();
        Err(DslError::new(
            ErrorCode::DependencyCycle,
            format!("concepts reference each other in a cycle: {}", first.join(", ")),
        )
        .with_causes("break the cycle by removing one of the references")
        .with_details(cycles.iter().map(|c| c.join(" <-> ")).collect()))
    }
}
