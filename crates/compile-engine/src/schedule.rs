//! Deterministic topological scheduling.
//!
//! Kahn traversal where the ready set is ordered by feature id. The order
//! is a total function of (nodes, edges): declaration order and edge
//! insertion order never influence it.

use std::collections::BTreeSet;

use crate::error::CompileError;
use crate::graph::DependencyGraph;

/// Produce the execution order for a dependency graph.
pub fn schedule(graph: &DependencyGraph) -> Result<Vec<String>, CompileError> {
    let mut degrees = graph.in_degrees();
    let mut ready: BTreeSet<&str> = degrees
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some(&id) = ready.iter().next() {
        ready.remove(id);
        order.push(id.to_string());
        for next in graph.edges_from(id) {
            let degree = degrees.get_mut(next).expect("edge target is a node");
            *degree -= 1;
            if *degree == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() != graph.nodes.len() {
        let stuck = degrees
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(id, _)| *id)
            .next()
            .unwrap_or_default();
        return Err(CompileError::GraphCycle {
            id: stuck.to_string(),
        });
    }
    Ok(order)
}
