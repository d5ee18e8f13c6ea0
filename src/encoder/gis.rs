//! CNF encoding for the grouped-independent-support pipeline.
//!
//! Fire variables are the vertex ids 1..=n, detector variables are
//! n+1..=2n. The detection clauses tie each detector to the fires in its
//! closed neighborhood; a single at-most bound over the fire variables
//! limits how many simultaneous fires the code must identify. The
//! emitted DIMACS carries `c def`, `c ind` and `c grp` lines that the
//! downstream minimiser parses.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use itertools::Itertools;

use super::cardinality::{Bound, CardinalityBackend};
use super::header::{header_lines, HeaderInfo};
use super::Instance;
use crate::config::Config;
use crate::error::Result;

pub struct GisEncoder {
    pub two_step: bool,
}

pub struct GisStats {
    pub n_vars: u32,
    pub n_clauses: usize,
}

impl GisEncoder {
    pub fn encode(
        &self,
        instance: &Instance,
        config: &Config,
        backend: &dyn CardinalityBackend,
        out_file: &Path,
        k: u32,
    ) -> Result<GisStats> {
        let net = &instance.network;
        let n = net.node_count();
        let fire_vars: Vec<u32> = net.nodes().collect();
        let detector_vars: Vec<u32> = (n + 1..=2 * n).collect();

        let detection_clauses = detection_clauses(net);

        // The fire bound is the sensor budget when one is given, else k.
        let ub = if instance.budget >= 0 {
            instance.budget as u64
        } else {
            k as u64
        };
        let cardinality = backend.encode(&fire_vars, Bound::AtMost(ub), 2 * n + 1)?;

        let n_vars = cardinality.max_var;
        let n_clauses = cardinality.clauses.len() + detection_clauses.len();

        // Independent-support candidates: with grouping, both variable
        // families are candidates and each (x_v, y_v) pair forms a group;
        // without, only the detectors are drawn from.
        let defined = &fire_vars;
        let (ind, groups): (Vec<u32>, Vec<(u32, u32)>) = if self.two_step {
            (
                fire_vars.iter().chain(detector_vars.iter()).copied().collect(),
                fire_vars.iter().copied().zip(detector_vars.iter().copied()).collect(),
            )
        } else {
            (detector_vars.clone(), Vec::new())
        };

        let header = header_lines(&HeaderInfo {
            network_file: &instance.network_file,
            network: net,
            budget: instance.budget,
            k,
            encoding: "independent support",
            two_step: self.two_step,
            ilp_flags: None,
            config,
        });

        let mut out = String::new();
        for line in &header {
            out.push_str(&format!("c {line}\n"));
        }
        out.push_str(&format!("p cnf {n_vars} {n_clauses}\n"));
        out.push_str(&format!("c def {} 0\n", defined.iter().join(" ")));
        out.push_str(&format!("c ind {} 0\n", ind.iter().join(" ")));
        for (x, y) in &groups {
            out.push_str(&format!("c grp {x} {y} 0\n"));
        }
        for clause in cardinality.clauses.iter().chain(detection_clauses.iter()) {
            out.push_str(&format!("{} 0\n", clause.iter().join(" ")));
        }

        let mut file = File::create(out_file)?;
        file.write_all(out.as_bytes())?;

        Ok(GisStats { n_vars, n_clauses })
    }
}

/// Clauses encoding y_v <-> OR of the fires in N1+[v], for every v: one
/// long clause and one binary clause per neighborhood member.
fn detection_clauses(net: &crate::network::Network) -> Vec<Vec<i64>> {
    let n = net.node_count();
    let mut clauses = Vec::new();
    for v in net.nodes() {
        let y = (n + v) as i64;
        let neighborhood: Vec<u32> = net
            .closed_neighborhood(v)
            .iter()
            .copied()
            .sorted()
            .collect();
        let mut long = Vec::with_capacity(neighborhood.len() + 1);
        long.push(-y);
        long.extend(neighborhood.iter().map(|&u| u as i64));
        clauses.push(long);
        for &u in &neighborhood {
            clauses.push(vec![y, -(u as i64)]);
        }
    }
    clauses
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::network::Network;
    use std::collections::BTreeMap;

    fn path3() -> Network {
        Network::new(
            vec!["1".into(), "2".into(), "3".into()],
            &[(1, 2), (2, 3)],
            BTreeMap::new(),
        )
    }

    fn eval(clauses: &[Vec<i64>], assignment: &dyn Fn(u32) -> bool) -> bool {
        clauses.iter().all(|clause| {
            clause.iter().any(|&lit| {
                let var = lit.unsigned_abs() as u32;
                if lit > 0 { assignment(var) } else { !assignment(var) }
            })
        })
    }

    #[test]
    fn clause_count_per_vertex() {
        let net = path3();
        let clauses = detection_clauses(&net);
        // one long clause per vertex plus one binary per neighborhood member
        let expected: usize = net
            .nodes()
            .map(|v| 1 + net.closed_neighborhood(v).len())
            .sum();
        assert_eq!(clauses.len(), expected);
        assert_eq!(clauses.len(), 10);
    }

    /// For any fire assignment the detection clauses admit exactly one
    /// detector assignment: y_v true iff some fire burns in N1+[v].
    #[test]
    fn detection_is_sound_and_functional() {
        let net = path3();
        let n = net.node_count();
        let clauses = detection_clauses(&net);
        for fires in 0u32..(1 << n) {
            let burning = |v: u32| fires & (1 << (v - 1)) != 0;
            let expected_detector = |v: u32| {
                net.closed_neighborhood(v).iter().any(|&u| burning(u))
            };
            for detectors in 0u32..(1 << n) {
                let assignment = |var: u32| {
                    if var <= n {
                        burning(var)
                    } else {
                        detectors & (1 << (var - n - 1)) != 0
                    }
                };
                let satisfied = eval(&clauses, &assignment);
                let is_expected = net.nodes().all(|v| {
                    (detectors & (1 << (v - 1)) != 0) == expected_detector(v)
                });
                assert_eq!(satisfied, is_expected, "fires {fires:03b} detectors {detectors:03b}");
            }
        }
    }

    #[test]
    fn all_declared_variables_appear() {
        let net = path3();
        let n = net.node_count();
        let clauses = detection_clauses(&net);
        let mut seen: Vec<bool> = vec![false; (2 * n) as usize];
        for clause in &clauses {
            for &lit in clause {
                seen[(lit.unsigned_abs() - 1) as usize] = true;
            }
        }
        assert!(seen.iter().all(|&b| b));
    }
}
