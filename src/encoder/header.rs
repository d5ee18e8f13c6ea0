//! Provenance header emitted at the top of every output file.
//!
//! The header documents the input network, the problem parameters, enough
//! reproducibility information to trace a formula back to the code that
//! generated it, and the label map that lets downstream results be mapped
//! back to the original vertex names.

use std::path::Path;

use chrono::Local;

use crate::config::Config;
use crate::network::Network;

pub struct HeaderInfo<'a> {
    pub network_file: &'a Path,
    pub network: &'a Network,
    pub budget: i64,
    pub k: u32,
    pub encoding: &'a str,
    pub two_step: bool,
    /// ILP-only optimisation flags, reported when set.
    pub ilp_flags: Option<(bool, bool)>,
    pub config: &'a Config,
}

/// Renders the header as unprefixed lines; the encoders prepend their
/// format's comment marker (`c ` for DIMACS, `\ ` for LP).
pub fn header_lines(info: &HeaderInfo) -> Vec<String> {
    let net = info.network;
    let mut lines = vec![
        String::new(),
        "NETWORK DATA".to_string(),
        "------------".to_string(),
        format!("Network file:     {}", info.network_file.display()),
        format!(
            "Twins removed?    {}",
            if !info.two_step && net.twins_merged() { "yes" } else { "no" }
        ),
        format!("Number of nodes (after preprocess): {}", net.node_count()),
        format!("Number of edges (after preprocess): {}", net.edge_count()),
        String::new(),
        String::new(),
        "PROBLEM PARAMETERS".to_string(),
        "------------------".to_string(),
        format!(
            "Budget:            {}",
            if info.budget == -1 { "N/A".to_string() } else { info.budget.to_string() }
        ),
        format!(
            "k:                 {}",
            if info.budget > -1 { "N/A".to_string() } else { info.k.to_string() }
        ),
        format!("Encoding:          {}", info.encoding),
        format!(
            "Approach:          {}",
            if info.two_step { "two-step" } else { "one-step" }
        ),
    ];
    if let Some((remove_supersets, check_2_neighbourhood)) = info.ilp_flags {
        lines.push(format!("Remove supersets:  {remove_supersets}"));
        lines.push(format!("Check 2 neighbourhood: {check_2_neighbourhood}"));
    }

    lines.push(String::new());
    lines.push(String::new());
    lines.push("REPRODUCIBILITY INFO".to_string());
    lines.push("--------------------".to_string());
    lines.push(format!("Generated with:    {}", env!("CARGO_PKG_NAME")));
    if let Some((repo, branch, commit)) = info.config.git_provenance() {
        lines.push(format!("Repository:        {repo}"));
        lines.push(format!("Branch:            {branch}"));
        lines.push(format!("Commit:            {commit}"));
        lines.push(format!("Machine:           {}", info.config.hostname));
    }
    lines.push(format!(
        "Date (YYYY-MM-DD): {}",
        Local::now().format("%Y-%m-%d")
    ));
    lines.push(String::new());

    lines.extend(label_map_lines(net));
    lines
}

fn label_map_lines(net: &Network) -> Vec<String> {
    let width = net
        .nodes()
        .map(|v| net.label(v).len())
        .max()
        .unwrap_or(0)
        .max(14);
    let mut lines = vec![
        String::new(),
        "VARIABLE MAP".to_string(),
        "------------".to_string(),
        String::new(),
        format!("{:>10} {:>width$}", "variable", "original name"),
        "-".repeat(11 + width),
    ];
    for v in net.nodes() {
        lines.push(format!("{:>10} {:>width$}", v, net.label(v)));
    }
    lines.push(String::new());

    if net.twins_merged() {
        let width = net
            .twin_map()
            .iter()
            .flat_map(|(rep, merged)| std::iter::once(rep.len()).chain(merged.iter().map(|m| m.len())))
            .max()
            .unwrap_or(0)
            .max(17);
        lines.push(String::new());
        lines.push("TWIN MAP".to_string());
        lines.push("--------".to_string());
        lines.push(String::new());
        lines.push(format!("{:>width$}  {:>width$}", "node name", "replaced by twin"));
        lines.push("-".repeat(2 + 2 * width));
        for (rep, merged) in net.twin_map() {
            for twin in merged {
                lines.push(format!("{twin:>width$}  {rep:>width$}"));
            }
        }
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            pb_encoder: None,
            project_dir: None,
            hostname: "testhost".into(),
            scratch_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn header_names_the_network_and_parameters() {
        let net = Network::new(
            vec!["1".into(), "2".into(), "3".into()],
            &[(1, 2), (2, 3)],
            BTreeMap::new(),
        );
        let config = test_config();
        let lines = header_lines(&HeaderInfo {
            network_file: Path::new("nets/p3.edges"),
            network: &net,
            budget: -1,
            k: 2,
            encoding: "ILP",
            two_step: true,
            ilp_flags: Some((true, false)),
            config: &config,
        });
        let joined = lines.join("\n");
        assert!(joined.contains("Network file:     nets/p3.edges"));
        assert!(joined.contains("Twins removed?    no"));
        assert!(joined.contains("Number of nodes (after preprocess): 3"));
        assert!(joined.contains("k:                 2"));
        assert!(joined.contains("Budget:            N/A"));
        assert!(joined.contains("Approach:          two-step"));
        assert!(joined.contains("Remove supersets:  true"));
        assert!(joined.contains("VARIABLE MAP"));
        assert!(!joined.contains("TWIN MAP"));
    }

    #[test]
    fn budget_displaces_k() {
        let net = Network::new(vec!["1".into(), "2".into()], &[(1, 2)], BTreeMap::new());
        let config = test_config();
        let lines = header_lines(&HeaderInfo {
            network_file: Path::new("n.edges"),
            network: &net,
            budget: 5,
            k: 1,
            encoding: "independent support",
            two_step: true,
            ilp_flags: None,
            config: &config,
        });
        let joined = lines.join("\n");
        assert!(joined.contains("Budget:            5"));
        assert!(joined.contains("k:                 N/A"));
    }

    #[test]
    fn twin_map_lists_merged_names() {
        let mut twins = BTreeMap::new();
        twins.insert("2".to_string(), vec!["3".to_string(), "4".to_string()]);
        let net = Network::new(vec!["1".into(), "2".into()], &[(1, 2)], twins);
        let config = test_config();
        let lines = header_lines(&HeaderInfo {
            network_file: Path::new("star.edges"),
            network: &net,
            budget: -1,
            k: 1,
            encoding: "independent support",
            two_step: false,
            ilp_flags: None,
            config: &config,
        });
        let joined = lines.join("\n");
        assert!(joined.contains("Twins removed?    yes"));
        assert!(joined.contains("TWIN MAP"));
        assert!(joined.contains("replaced by twin"));
    }
}
