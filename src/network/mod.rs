//! The canonical network a single encoding run operates on.
//!
//! A [`Network`] is produced by the loader/preprocessor pair and is
//! immutable afterwards: vertices are the contiguous ids `1..=n`, the
//! open and closed 1-neighborhoods are computed once and cached, and the
//! label map back to the original vertex names is carried along for the
//! output header.

pub mod loader;
pub mod preprocess;

use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug)]
pub struct Network {
    node_count: u32,
    edge_count: usize,
    /// Open 1-neighborhood per vertex (index `v - 1`); never contains `v`.
    open_one: Vec<HashSet<u32>>,
    /// Closed 1-neighborhood per vertex (index `v - 1`); always contains `v`.
    closed_one: Vec<HashSet<u32>>,
    /// Canonical id -> original name (index `v - 1`).
    labels: Vec<String>,
    ids: HashMap<String, u32>,
    /// Representative name -> names merged into it during twin removal.
    twins: BTreeMap<String, Vec<String>>,
}

impl Network {
    /// Builds the neighborhood caches from a canonical edge set. Edges
    /// must reference ids `1..=labels.len()` with no self-loops.
    pub fn new(
        labels: Vec<String>,
        edges: &[(u32, u32)],
        twins: BTreeMap<String, Vec<String>>,
    ) -> Network {
        let n = labels.len() as u32;
        let mut open_one: Vec<HashSet<u32>> = vec![HashSet::new(); n as usize];
        for &(a, b) in edges {
            debug_assert!(a >= 1 && a <= n && b >= 1 && b <= n && a != b);
            open_one[(a - 1) as usize].insert(b);
            open_one[(b - 1) as usize].insert(a);
        }
        let closed_one = open_one
            .iter()
            .enumerate()
            .map(|(idx, neigh)| {
                let mut closed = neigh.clone();
                closed.insert(idx as u32 + 1);
                closed
            })
            .collect();
        let ids = labels
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx as u32 + 1))
            .collect();
        Network {
            node_count: n,
            edge_count: edges.len(),
            open_one,
            closed_one,
            labels,
            ids,
            twins,
        }
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Canonical vertex ids, `1..=n`.
    pub fn nodes(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.node_count
    }

    /// Neighbors of `v`, excluding `v` itself.
    pub fn open_neighborhood(&self, v: u32) -> &HashSet<u32> {
        &self.open_one[(v - 1) as usize]
    }

    /// Neighbors of `v` together with `v` itself.
    pub fn closed_neighborhood(&self, v: u32) -> &HashSet<u32> {
        &self.closed_one[(v - 1) as usize]
    }

    /// Closed 2-neighborhoods for every vertex, i.e. all vertices within
    /// distance 2 including the center. Computed on demand; the ILP
    /// early-prune is the only consumer.
    pub fn closed_two_neighborhoods(&self) -> Vec<HashSet<u32>> {
        self.nodes()
            .map(|v| {
                let mut reach = HashSet::new();
                for &u in self.closed_neighborhood(v) {
                    reach.extend(self.closed_neighborhood(u).iter().copied());
                }
                reach
            })
            .collect()
    }

    /// Union of the open 1-neighborhoods over a vertex set.
    pub fn set_open_neighborhood(&self, set: &[u32]) -> HashSet<u32> {
        let mut union = HashSet::new();
        for &v in set {
            union.extend(self.open_neighborhood(v).iter().copied());
        }
        union
    }

    pub fn label(&self, v: u32) -> &str {
        &self.labels[(v - 1) as usize]
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub fn twin_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.twins
    }

    pub fn twins_merged(&self) -> bool {
        !self.twins.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn path3() -> Network {
        Network::new(
            vec!["1".into(), "2".into(), "3".into()],
            &[(1, 2), (2, 3)],
            BTreeMap::new(),
        )
    }

    #[test]
    fn neighborhoods_of_a_path() {
        let net = path3();
        assert_eq!(net.open_neighborhood(2), &HashSet::from([1, 3]));
        assert_eq!(net.closed_neighborhood(2), &HashSet::from([1, 2, 3]));
        assert!(!net.open_neighborhood(1).contains(&1));
        assert!(net.closed_neighborhood(1).contains(&1));
    }

    #[test]
    fn two_neighborhood_spans_the_path() {
        let net = path3();
        let reach = net.closed_two_neighborhoods();
        assert_eq!(reach[0], HashSet::from([1, 2, 3]));
    }

    #[test]
    fn set_neighborhood_unions_members() {
        let net = path3();
        let union = net.set_open_neighborhood(&[1, 3]);
        assert_eq!(union, HashSet::from([2]));
    }

    #[test]
    fn label_map_round_trips() {
        let net = Network::new(
            vec!["alpha".into(), "beta".into()],
            &[(1, 2)],
            BTreeMap::new(),
        );
        for v in net.nodes() {
            assert_eq!(net.id_of(net.label(v)), Some(v));
        }
    }
}
