//! Readers for the two supported network source formats: plain edge
//! lists and Matrix-Market coordinate files.
//!
//! Both produce a [`LoadedGraph`] whose vertices still carry the names
//! found in the file; canonicalisation happens in the preprocessor.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use nom::{
    bytes::complete::take_till1,
    character::complete::multispace1,
    character::complete::space0,
    sequence::{preceded, separated_pair},
    IResult,
};
use petgraph::graph::{NodeIndex, UnGraph};

use crate::error::{Error, Result};

/// An undirected graph as read from disk. Duplicate edges are collapsed;
/// self-loops from the source format are kept until preprocessing.
#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: UnGraph<String, ()>,
    name_to_node: HashMap<String, NodeIndex>,
}

impl LoadedGraph {
    fn new() -> Self {
        LoadedGraph {
            graph: UnGraph::new_undirected(),
            name_to_node: HashMap::new(),
        }
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&nx) = self.name_to_node.get(name) {
            return nx;
        }
        let nx = self.graph.add_node(name.to_string());
        self.name_to_node.insert(name.to_string(), nx);
        nx
    }

    fn add_edge(&mut self, s: &str, t: &str) {
        let a = self.node(s);
        let b = self.node(t);
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, ());
        }
    }
}

/// Reads a network file, dispatching on the `.mtx` extension.
pub fn load_network(path: &Path) -> Result<LoadedGraph> {
    let content = fs::read_to_string(path).map_err(|err| Error::SourceFormat {
        path: path.to_path_buf(),
        line: 0,
        reason: err.to_string(),
    })?;
    if path.extension().is_some_and(|ext| ext == "mtx") {
        parse_matrix_market(path, &content)
    } else {
        parse_edge_list(path, &content)
    }
}

/// One edge per non-comment line, two whitespace-separated tokens.
/// Comment lines begin with `#` or `%`. Tokens past the first two are
/// ignored, matching common edge-list dialects that append weights.
pub fn parse_edge_list(path: &Path, content: &str) -> Result<LoadedGraph> {
    let mut loaded = LoadedGraph::new();
    for (idx, line) in content.lines().enumerate() {
        if is_skippable(line) {
            continue;
        }
        let (s, t) = edge_tokens(line).map_err(|_| Error::SourceFormat {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: format!("expected two tokens, got {:?}", line.trim()),
        })?;
        loaded.add_edge(s, t);
    }
    if loaded.graph.node_count() == 0 {
        return Err(Error::SourceFormat {
            path: path.to_path_buf(),
            line: 0,
            reason: "no edges found".to_string(),
        });
    }
    Ok(loaded)
}

/// Matrix-Market coordinate format: a `%%MatrixMarket` banner, `%`
/// comments, one dimension line, then one `i j [value]` entry per line.
/// Entry values are ignored; entries become undirected edges.
pub fn parse_matrix_market(path: &Path, content: &str) -> Result<LoadedGraph> {
    let mut loaded = LoadedGraph::new();
    let mut seen_dimensions = false;
    for (idx, line) in content.lines().enumerate() {
        if is_skippable(line) {
            continue;
        }
        if !seen_dimensions {
            // rows, cols and nnz; only checked for shape
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 || fields.iter().any(|f| f.parse::<u64>().is_err()) {
                return Err(Error::SourceFormat {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("expected dimension line, got {:?}", line.trim()),
                });
            }
            seen_dimensions = true;
            continue;
        }
        let (s, t) = edge_tokens(line).map_err(|_| Error::SourceFormat {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: format!("expected coordinate entry, got {:?}", line.trim()),
        })?;
        if s.parse::<u64>().is_err() || t.parse::<u64>().is_err() {
            return Err(Error::SourceFormat {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: format!("coordinate indices must be integers, got {:?}", line.trim()),
            });
        }
        loaded.add_edge(s, t);
    }
    if !seen_dimensions || loaded.graph.node_count() == 0 {
        return Err(Error::SourceFormat {
            path: path.to_path_buf(),
            line: 0,
            reason: "no entries found".to_string(),
        });
    }
    Ok(loaded)
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%')
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(char::is_whitespace)(input)
}

fn edge_tokens(line: &str) -> std::result::Result<(&str, &str), nom::Err<nom::error::Error<&str>>> {
    let (_, pair) = preceded(space0, separated_pair(token, multispace1, token))(line)?;
    Ok(pair)
}
