//! ILP encoding and the pairwise uniqueness-constraint engine.
//!
//! The two-step model carries a binary fire variable per vertex and an
//! integer detection variable counting the fires in the vertex's closed
//! neighborhood. Uniqueness rows force every unordered pair of candidate
//! fire sets up to size k to differ somewhere a sensor can see; the
//! engine enumerates the pairs, computes distinguishing sets from
//! neighborhood symmetric differences, and keeps the collection small by
//! suppressing supersets.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use itertools::Itertools;

use super::header::{header_lines, HeaderInfo};
use super::Instance;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::network::Network;

pub struct IlpEncoder {
    pub two_step: bool,
    pub remove_supersets: bool,
    pub check_2_neighbourhood: bool,
}

#[derive(Debug)]
pub struct IlpStats {
    pub n_vars: usize,
    pub n_constraints: usize,
    pub n_alo: usize,
    pub n_detection: usize,
    pub n_uniqueness: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sense {
    Eq,
    Ge,
}

/// One linear row: named, ±1 coefficients only.
struct Row {
    name: String,
    terms: Vec<(i64, String)>,
    sense: Sense,
    rhs: i64,
}

impl IlpEncoder {
    pub fn encode(
        &self,
        instance: &Instance,
        config: &Config,
        out_file: &Path,
        k: u32,
    ) -> Result<IlpStats> {
        let net = &instance.network;
        if !self.two_step && k > 1 {
            return Err(Error::Preprocess(
                "one-step encoding is only valid for k = 1".to_string(),
            ));
        }

        let (rows, stats) = if self.two_step {
            self.two_step_rows(net, k)
        } else {
            self.one_step_rows(net)
        };

        let header = header_lines(&HeaderInfo {
            network_file: &instance.network_file,
            network: net,
            budget: instance.budget,
            k,
            encoding: "ILP",
            two_step: self.two_step,
            ilp_flags: Some((self.remove_supersets, self.check_2_neighbourhood)),
            config,
        });

        let mut out = String::new();
        for line in &header {
            out.push_str(&format!("\\ {line}\n"));
        }
        out.push_str(&render_lp(net, &rows, self.two_step));

        let mut file = File::create(out_file)?;
        file.write_all(out.as_bytes())?;
        Ok(stats)
    }

    fn two_step_rows(&self, net: &Network, k: u32) -> (Vec<Row>, IlpStats) {
        let mut rows = Vec::new();

        // a-rows: at least one sensor in every closed neighborhood
        for (i, v) in net.nodes().enumerate() {
            rows.push(Row {
                name: format!("a{i}"),
                terms: vec![(1, format!("y{v}"))],
                sense: Sense::Ge,
                rhs: 1,
            });
        }
        let n_alo = rows.len();

        // d-rows: y_v equals the number of fires in N1+[v]
        for (i, v) in net.nodes().enumerate() {
            let mut terms = vec![(1, format!("y{v}"))];
            for u in net.closed_neighborhood(v).iter().copied().sorted() {
                terms.push((-1, format!("x{u}")));
            }
            rows.push(Row {
                name: format!("d{i}"),
                terms,
                sense: Sense::Eq,
                rhs: 0,
            });
        }
        let n_detection = rows.len() - n_alo;

        // u-rows: one per surviving distinguishing set
        let sets = self.uniqueness_sets(net, k);
        let n_uniqueness = sets.len();
        for (i, set) in sets.into_iter().enumerate() {
            rows.push(Row {
                name: format!("u{i}"),
                terms: set.into_iter().map(|v| (1, format!("x{v}"))).collect(),
                sense: Sense::Ge,
                rhs: 1,
            });
        }

        let n = net.node_count() as usize;
        let stats = IlpStats {
            n_vars: 2 * n,
            n_constraints: rows.len(),
            n_alo,
            n_detection,
            n_uniqueness,
        };
        (rows, stats)
    }

    fn one_step_rows(&self, net: &Network) -> (Vec<Row>, IlpStats) {
        let mut rows = Vec::new();

        // d-rows: every fire is detectable
        for (i, v) in net.nodes().enumerate() {
            let terms = net
                .closed_neighborhood(v)
                .iter()
                .copied()
                .sorted()
                .map(|u| (1, format!("x{u}")))
                .collect();
            rows.push(Row {
                name: format!("d{i}"),
                terms,
                sense: Sense::Ge,
                rhs: 1,
            });
        }
        let n_detection = rows.len();

        // u-rows: distinct vertices within two hops must have different
        // closed-neighborhood signatures
        let mut i = 0;
        for set in one_step_uniqueness_sets(net) {
            rows.push(Row {
                name: format!("u{i}"),
                terms: set.into_iter().map(|v| (1, format!("x{v}"))).collect(),
                sense: Sense::Ge,
                rhs: 1,
            });
            i += 1;
        }

        let stats = IlpStats {
            n_vars: net.node_count() as usize,
            n_constraints: rows.len(),
            n_alo: 0,
            n_detection,
            n_uniqueness: i,
        };
        (rows, stats)
    }

    /// Enumerates unordered pairs (U, W) of vertex subsets with
    /// 1 <= |U| <= |W| <= k and collects their distinguishing sets.
    /// Output order is lexicographic for deterministic row names.
    fn uniqueness_sets(&self, net: &Network, k: u32) -> Vec<Vec<u32>> {
        let nodes: Vec<u32> = net.nodes().collect();
        let two_hop = if self.check_2_neighbourhood {
            Some(net.closed_two_neighborhoods())
        } else {
            None
        };
        let mut collection = DistinguishingSets::new(self.remove_supersets);

        for u_size in 1..=k as usize {
            for u_set in nodes.iter().copied().combinations(u_size) {
                let n1_u = net.set_open_neighborhood(&u_set);
                let n2_u = two_hop.as_ref().map(|cache| set_union(&u_set, cache));
                for w_size in u_size..=k as usize {
                    for w_set in nodes.iter().copied().combinations(w_size) {
                        // unordered pairs: for equal sizes only visit W after U
                        if w_size == u_size && w_set <= u_set {
                            continue;
                        }
                        if let (Some(n2_u), Some(cache)) = (&n2_u, two_hop.as_ref()) {
                            let n2_w = set_union(&w_set, cache);
                            if n2_u.is_disjoint(&n2_w) {
                                continue;
                            }
                        }
                        let n1_w = net.set_open_neighborhood(&w_set);
                        let d = distinguishing_set(&u_set, &w_set, &n1_u, &n1_w);
                        if d.is_empty() {
                            continue;
                        }
                        collection.insert(d);
                    }
                }
            }
        }
        collection.into_sorted()
    }
}

/// D(U, W) = (U symdiff W) union (N1(U) symdiff N1(W)), on open
/// neighborhoods, as a sorted id vector.
fn distinguishing_set(
    u_set: &[u32],
    w_set: &[u32],
    n1_u: &HashSet<u32>,
    n1_w: &HashSet<u32>,
) -> Vec<u32> {
    let u: HashSet<u32> = u_set.iter().copied().collect();
    let w: HashSet<u32> = w_set.iter().copied().collect();
    let mut d: HashSet<u32> = u.symmetric_difference(&w).copied().collect();
    d.extend(n1_u.symmetric_difference(n1_w).copied());
    let mut d: Vec<u32> = d.into_iter().collect();
    d.sort_unstable();
    d
}

fn set_union(set: &[u32], cache: &[HashSet<u32>]) -> HashSet<u32> {
    let mut union = HashSet::new();
    for &v in set {
        union.extend(cache[(v - 1) as usize].iter().copied());
    }
    union
}

/// One-step variant: closed-neighborhood symmetric differences of vertex
/// pairs within two hops, deduplicated by pair.
fn one_step_uniqueness_sets(net: &Network) -> Vec<Vec<u32>> {
    let two_hop = net.closed_two_neighborhoods();
    let mut seen_pairs: HashSet<(u32, u32)> = HashSet::new();
    let mut sets = Vec::new();
    for v in net.nodes() {
        for u in two_hop[(v - 1) as usize].iter().copied().sorted() {
            if u == v {
                continue;
            }
            let pair = (u.min(v), u.max(v));
            if !seen_pairs.insert(pair) {
                continue;
            }
            let d: Vec<u32> = net
                .closed_neighborhood(pair.0)
                .symmetric_difference(net.closed_neighborhood(pair.1))
                .copied()
                .sorted()
                .collect();
            if !d.is_empty() {
                sets.push(d);
            }
        }
    }
    sets
}

/// The collection of distinguishing sets, optionally kept as an
/// antichain under inclusion. Sets are sorted id vectors; dominance
/// checks are a linear scan per insertion.
struct DistinguishingSets {
    remove_supersets: bool,
    sets: HashSet<Vec<u32>>,
}

impl DistinguishingSets {
    fn new(remove_supersets: bool) -> Self {
        DistinguishingSets {
            remove_supersets,
            sets: HashSet::new(),
        }
    }

    fn insert(&mut self, d: Vec<u32>) {
        if self.remove_supersets {
            // an existing subset already implies the new row
            if self.sets.iter().any(|kept| is_subset(kept, &d)) {
                return;
            }
            self.sets.retain(|kept| !is_subset(&d, kept));
        }
        self.sets.insert(d);
    }

    fn into_sorted(self) -> Vec<Vec<u32>> {
        let mut sets: Vec<Vec<u32>> = self.sets.into_iter().collect();
        sets.sort_unstable();
        sets
    }
}

/// Subset test on sorted slices.
fn is_subset(a: &[u32], b: &[u32]) -> bool {
    if a.len() > b.len() {
        return false;
    }
    let mut b_iter = b.iter();
    'outer: for x in a {
        for y in b_iter.by_ref() {
            if y == x {
                continue 'outer;
            }
            if y > x {
                return false;
            }
        }
        return false;
    }
    true
}

fn render_lp(net: &Network, rows: &[Row], two_step: bool) -> String {
    let mut out = String::new();

    out.push_str("Minimize\n obj: ");
    out.push_str(&net.nodes().map(|v| format!("x{v}")).join(" + "));
    out.push('\n');

    out.push_str("Subject To\n");
    for row in rows {
        out.push_str(&format!(" {}: {}", row.name, render_terms(&row.terms)));
        let sense = match row.sense {
            Sense::Eq => "=",
            Sense::Ge => ">=",
        };
        out.push_str(&format!(" {} {}\n", sense, row.rhs));
    }

    if two_step {
        out.push_str("Bounds\n");
        for v in net.nodes() {
            out.push_str(&format!(
                " 0 <= y{v} <= {}\n",
                net.closed_neighborhood(v).len()
            ));
        }
    }

    out.push_str("Binaries\n ");
    out.push_str(&net.nodes().map(|v| format!("x{v}")).join(" "));
    out.push('\n');

    if two_step {
        out.push_str("Generals\n ");
        out.push_str(&net.nodes().map(|v| format!("y{v}")).join(" "));
        out.push('\n');
    }

    out.push_str("End\n");
    out
}

fn render_terms(terms: &[(i64, String)]) -> String {
    let mut text = String::new();
    for (idx, (coeff, var)) in terms.iter().enumerate() {
        debug_assert!(*coeff == 1 || *coeff == -1);
        if idx == 0 {
            if *coeff < 0 {
                text.push_str("- ");
            }
        } else if *coeff < 0 {
            text.push_str(" - ");
        } else {
            text.push_str(" + ");
        }
        text.push_str(var);
    }
    text
}
