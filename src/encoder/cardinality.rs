//! Cardinality constraints over CNF variables, encoded by an external
//! pseudo-Boolean tool.
//!
//! The tool reads a one-constraint OPB file and writes DIMACS on stdout.
//! Its variables 1..|V| correspond to the caller's variables in sorted
//! order; any further variables are auxiliaries and are re-indexed onto a
//! fresh range starting at the caller-supplied `start_idx`. The trait
//! seam exists so an in-process encoder can be substituted without
//! touching the callers.

use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use itertools::Itertools;

use crate::config::Config;
use crate::error::{Error, Result};

/// Exactly one bound shape is expressible per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    AtMost(u64),
    AtLeast(u64),
    Exactly(u64),
}

/// Result of encoding one cardinality constraint.
#[derive(Debug)]
pub struct CardinalityCnf {
    /// Clauses over the caller's variable space, without trailing zeros.
    pub clauses: Vec<Vec<i64>>,
    /// Highest variable id in use after encoding: at least `start_idx - 1`,
    /// more when the tool introduced auxiliaries.
    pub max_var: u32,
}

pub trait CardinalityBackend {
    /// Encodes `bound` over `vars`. `start_idx` must be strictly greater
    /// than every variable in `vars`; auxiliaries are assigned
    /// contiguously from it.
    fn encode(&self, vars: &[u32], bound: Bound, start_idx: u32) -> Result<CardinalityCnf>;
}

/// The production backend: invokes the configured `pbencoder` binary.
#[derive(Debug)]
pub struct PbEncoder {
    tool: PathBuf,
    scratch_dir: PathBuf,
    /// Embedded in temp-file names so concurrent runs on different
    /// networks do not trample each other.
    infix: String,
}

impl PbEncoder {
    pub fn from_config(config: &Config, infix: &str) -> Result<PbEncoder> {
        let tool = config.pb_encoder.clone().ok_or_else(|| {
            Error::ExternalTool(
                "no pseudo-Boolean encoder configured (set PBLIB_DIR)".to_string(),
            )
        })?;
        Ok(PbEncoder {
            tool,
            scratch_dir: config.scratch_dir.clone(),
            infix: infix.to_string(),
        })
    }
}

impl CardinalityBackend for PbEncoder {
    fn encode(&self, vars: &[u32], bound: Bound, start_idx: u32) -> Result<CardinalityCnf> {
        assert!(
            vars.iter().all(|&v| v < start_idx),
            "start_idx must exceed every input variable"
        );

        let opb_path = self.scratch_dir.join(format!("TEMP_{}_pbs.pbo", self.infix));
        let cnf_path = self.scratch_dir.join(format!("TEMP_{}_pbs.cnf", self.infix));
        let _cleanup = TempFiles(vec![opb_path.clone(), cnf_path.clone()]);

        fs::write(&opb_path, opb_request(vars.len(), bound))?;

        let cnf_file = File::create(&cnf_path)?;
        let status = Command::new(&self.tool)
            .arg(&opb_path)
            .stdout(Stdio::from(cnf_file))
            .status()
            .map_err(|err| {
                Error::ExternalTool(format!("{} failed to start: {err}", self.tool.display()))
            })?;
        if !status.success() {
            return Err(Error::ExternalTool(format!(
                "{} exited with {status}",
                self.tool.display()
            )));
        }

        let dimacs = fs::read_to_string(&cnf_path)?;
        rewrite_dimacs(&dimacs, vars, start_idx)
    }
}

/// Deletes the temporary OPB/CNF pair when the encoding scope ends,
/// whether or not it succeeded.
struct TempFiles(Vec<PathBuf>);

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in &self.0 {
            let _ = fs::remove_file(path);
        }
    }
}

/// Renders the one-constraint OPB input. An at-most bound becomes a
/// negated at-least, which is the form the tool accepts.
fn opb_request(nvars: usize, bound: Bound) -> String {
    let mut text = format!("* #variable= {nvars} #constraint= 1\n* \n");
    let terms = |sign: &str| (1..=nvars).map(|i| format!("{sign}1 x{i}")).join(" ");
    match bound {
        Bound::AtMost(ub) => {
            text.push_str(&format!("{} >= -{ub};\n", terms("-")));
        }
        Bound::AtLeast(lb) => {
            text.push_str(&format!("{} >= {lb};\n", terms("+")));
        }
        Bound::Exactly(b) => {
            text.push_str(&format!("{} = {b};\n", terms("+")));
        }
    }
    text
}

/// Parses the tool's DIMACS output and rewrites it onto the caller's
/// variable space: tool variables 1..|V| map to `vars` in sorted order,
/// the rest to fresh ids from `start_idx`.
fn rewrite_dimacs(dimacs: &str, vars: &[u32], start_idx: u32) -> Result<CardinalityCnf> {
    let sorted_vars: Vec<u32> = vars.iter().copied().sorted().collect();
    let m = sorted_vars.len() as u32;

    let mut declared: Option<u32> = None;
    let mut clauses: Vec<Vec<i64>> = Vec::new();
    for line in dimacs.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('p') {
            let fields: Vec<&str> = rest.split_whitespace().collect();
            match fields.as_slice() {
                ["cnf", nvars, _nclauses] => {
                    declared = Some(nvars.parse().map_err(|_| {
                        Error::ExternalTool(format!("malformed problem line: {line:?}"))
                    })?);
                }
                _ => {
                    return Err(Error::ExternalTool(format!(
                        "malformed problem line: {line:?}"
                    )))
                }
            }
            continue;
        }
        let mut lits: Vec<i64> = Vec::new();
        for field in line.split_whitespace() {
            let lit: i64 = field.parse().map_err(|_| {
                Error::ExternalTool(format!("malformed clause literal: {field:?}"))
            })?;
            if lit != 0 {
                lits.push(lit);
            }
        }
        if !lits.is_empty() {
            clauses.push(lits);
        }
    }

    let declared = declared
        .ok_or_else(|| Error::ExternalTool("tool output has no problem line".to_string()))?;
    if declared < m {
        return Err(Error::ExternalTool(format!(
            "tool declared {declared} variables for {m} inputs"
        )));
    }

    // Tool index -> caller variable. Auxiliaries are contiguous from
    // start_idx; the caller guarantees that range is free, so any overlap
    // with the inputs is an internal invariant violation.
    let map = |tool_var: u32| -> Result<u32> {
        if tool_var <= m {
            Ok(sorted_vars[(tool_var - 1) as usize])
        } else if tool_var <= declared {
            let fresh = start_idx + (tool_var - m - 1);
            assert!(
                !sorted_vars.contains(&fresh),
                "auxiliary index {fresh} collides with an input variable"
            );
            Ok(fresh)
        } else {
            Err(Error::ExternalTool(format!(
                "tool used undeclared variable {tool_var}"
            )))
        }
    };

    let mut rewritten = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let mut out = Vec::with_capacity(clause.len());
        for lit in clause {
            let mapped = map(lit.unsigned_abs() as u32)?;
            out.push(if lit > 0 { mapped as i64 } else { -(mapped as i64) });
        }
        rewritten.push(out);
    }

    let aux_count = declared - m;
    let max_var = (start_idx - 1).max(sorted_vars.last().copied().unwrap_or(0)) + aux_count;
    Ok(CardinalityCnf {
        clauses: rewritten,
        max_var,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opb_at_most_negates_coefficients() {
        let text = opb_request(3, Bound::AtMost(1));
        assert!(text.starts_with("* #variable= 3 #constraint= 1\n* \n"));
        assert!(text.contains("-1 x1 -1 x2 -1 x3 >= -1;"));
    }

    #[test]
    fn opb_at_least_and_equality() {
        assert!(opb_request(2, Bound::AtLeast(1)).contains("+1 x1 +1 x2 >= 1;"));
        assert!(opb_request(2, Bound::Exactly(2)).contains("+1 x1 +1 x2 = 2;"));
    }

    #[test]
    fn rewrite_maps_inputs_and_auxiliaries() {
        // Tool output over 4 inputs plus 2 auxiliaries (tool ids 5, 6).
        let dimacs = "c comment\np cnf 6 3\n-1 5 0\n-5 -2 6 0\n-6 -3 -4 0\n";
        let cnf = rewrite_dimacs(dimacs, &[10, 20, 30, 40], 41).unwrap();
        assert_eq!(cnf.clauses, vec![
            vec![-10, 41],
            vec![-41, -20, 42],
            vec![-42, -30, -40],
        ]);
        assert_eq!(cnf.max_var, 42);
    }

    #[test]
    fn rewrite_without_auxiliaries_reserves_start_range() {
        // At-most-2 over 4 variables, pairwise-style with no auxiliaries.
        let dimacs = "p cnf 4 4\n-1 -2 -3 0\n-1 -2 -4 0\n-1 -3 -4 0\n-2 -3 -4 0\n";
        let cnf = rewrite_dimacs(dimacs, &[1, 2, 3, 4], 5).unwrap();
        assert_eq!(cnf.clauses.len(), 4);
        assert_eq!(cnf.max_var, 4);
    }

    #[test]
    fn rewrite_rejects_undeclared_variables() {
        let dimacs = "p cnf 2 1\n1 7 0\n";
        let err = rewrite_dimacs(dimacs, &[1, 2], 3).unwrap_err();
        assert!(matches!(err, Error::ExternalTool(_)));
    }

    #[test]
    fn rewrite_rejects_missing_problem_line() {
        let err = rewrite_dimacs("1 2 0\n", &[1, 2], 3).unwrap_err();
        assert!(matches!(err, Error::ExternalTool(_)));
    }

    /// The at-most-2 clause set, conjoined with each of the 16 input
    /// assignments, must be satisfiable exactly when the assignment has
    /// weight <= 2.
    #[test]
    fn at_most_two_round_trip() {
        let dimacs = "p cnf 4 4\n-1 -2 -3 0\n-1 -2 -4 0\n-1 -3 -4 0\n-2 -3 -4 0\n";
        let cnf = rewrite_dimacs(dimacs, &[1, 2, 3, 4], 5).unwrap();
        for assignment in 0u32..16 {
            let value = |var: u32| assignment & (1 << (var - 1)) != 0;
            let satisfied = cnf.clauses.iter().all(|clause| {
                clause.iter().any(|&lit| {
                    let var = lit.unsigned_abs() as u32;
                    if lit > 0 { value(var) } else { !value(var) }
                })
            });
            let weight = assignment.count_ones();
            assert_eq!(satisfied, weight <= 2, "assignment {assignment:04b}");
        }
    }

    #[test]
    #[should_panic(expected = "start_idx must exceed")]
    fn start_index_below_inputs_is_fatal() {
        let config = Config {
            pb_encoder: Some(PathBuf::from("/nonexistent/pbencoder")),
            project_dir: None,
            hostname: "test".into(),
            scratch_dir: std::env::temp_dir(),
        };
        let backend = PbEncoder::from_config(&config, "test").unwrap();
        let _ = backend.encode(&[1, 2, 3], Bound::AtMost(1), 3);
    }

    #[test]
    fn missing_tool_is_an_external_tool_error() {
        let config = Config {
            pb_encoder: None,
            project_dir: None,
            hostname: "test".into(),
            scratch_dir: std::env::temp_dir(),
        };
        let err = PbEncoder::from_config(&config, "test").unwrap_err();
        assert!(matches!(err, Error::ExternalTool(_)));
    }
}
