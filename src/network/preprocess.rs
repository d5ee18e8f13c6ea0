//! Graph preprocessing: self-loop removal, twin contraction and the
//! canonical relabelling to `1..=n`.
//!
//! Twin contraction runs only for the one-step encodings. A 1-step
//! identifying code cannot distinguish vertices with identical closed
//! neighborhoods, so solutions only exist once each twin class is merged
//! into a single representative. The two-step encodings tolerate twins
//! and must skip this step.

use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use petgraph::graph::NodeIndex;

use super::loader::LoadedGraph;
use super::Network;
use crate::error::{Error, Result};

/// Canonicalises a loaded graph into a [`Network`]. Twin removal is
/// applied iff `two_step` is false.
pub fn preprocess(loaded: &LoadedGraph, two_step: bool) -> Result<Network> {
    let graph = &loaded.graph;

    // Self-loops from the source format are degenerate once
    // neighborhoods enter the picture; drop them here.
    let mut adjacency: HashMap<NodeIndex, HashSet<NodeIndex>> = graph
        .node_indices()
        .map(|nx| (nx, HashSet::new()))
        .collect();
    for edge in graph.edge_indices() {
        let (a, b) = graph
            .edge_endpoints(edge)
            .expect("edge index from the same graph");
        if a != b {
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }
    }

    let numeric = graph
        .node_indices()
        .all(|nx| graph[nx].parse::<u64>().is_ok());

    let mut removed: HashSet<NodeIndex> = HashSet::new();
    let mut twins: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if !two_step {
        for class in twin_classes(graph, &adjacency) {
            let rep = *class
                .iter()
                .min_by(|&&a, &&b| name_order(&graph[a], &graph[b], numeric))
                .expect("twin classes are nonempty");
            let mut merged: Vec<String> = class
                .iter()
                .filter(|&&nx| nx != rep)
                .map(|&nx| graph[nx].clone())
                .collect();
            merged.sort_by(|a, b| name_order(a, b, numeric));
            removed.extend(class.iter().filter(|&&nx| nx != rep));
            twins.insert(graph[rep].clone(), merged);
        }
    }

    // Relabel the remaining vertices 1..=n in sorted name order.
    let mut kept: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|nx| !removed.contains(nx))
        .collect();
    kept.sort_by(|&a, &b| name_order(&graph[a], &graph[b], numeric));
    let canonical: HashMap<NodeIndex, u32> = kept
        .iter()
        .enumerate()
        .map(|(idx, &nx)| (nx, idx as u32 + 1))
        .collect();
    let labels: Vec<String> = kept.iter().map(|&nx| graph[nx].clone()).collect();

    let mut edges: Vec<(u32, u32)> = Vec::new();
    let mut seen: HashSet<(u32, u32)> = HashSet::new();
    for &nx in &kept {
        for &other in &adjacency[&nx] {
            if removed.contains(&other) {
                continue;
            }
            let (a, b) = (canonical[&nx], canonical[&other]);
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                edges.push(key);
            }
        }
    }

    if labels.is_empty() {
        return Err(Error::Preprocess("network has no vertices".to_string()));
    }
    if edges.is_empty() {
        return Err(Error::Preprocess(format!(
            "network is degenerate after preprocessing: {} vertex/vertices and no edges{}",
            labels.len(),
            if twins.is_empty() {
                ""
            } else {
                " (twin contraction collapsed every edge)"
            }
        )));
    }

    Ok(Network::new(labels, &edges, twins))
}

/// Groups vertices by closed 1-neighborhood. Classes of size >= 2 are
/// twin classes; a single pass contracts each class to one vertex.
fn twin_classes(
    graph: &petgraph::graph::UnGraph<String, ()>,
    adjacency: &HashMap<NodeIndex, HashSet<NodeIndex>>,
) -> Vec<Vec<NodeIndex>> {
    let mut by_signature: HashMap<Vec<usize>, Vec<NodeIndex>> = HashMap::new();
    for nx in graph.node_indices() {
        let signature: Vec<usize> = adjacency[&nx]
            .iter()
            .map(|other| other.index())
            .chain(std::iter::once(nx.index()))
            .sorted()
            .collect();
        by_signature.entry(signature).or_default().push(nx);
    }
    by_signature
        .into_values()
        .filter(|class| class.len() >= 2)
        .collect()
}

fn name_order(a: &str, b: &str, numeric: bool) -> std::cmp::Ordering {
    if numeric {
        let x: u64 = a.parse().expect("checked numeric");
        let y: u64 = b.parse().expect("checked numeric");
        x.cmp(&y).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}
