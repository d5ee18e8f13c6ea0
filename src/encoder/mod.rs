//! Encoding of a preprocessed network into one of the two output
//! formats.
//!
//! An [`Instance`] is the shared build product: the canonical network
//! plus the problem parameters. The [`Encoder`] sum type selects the
//! target and carries its own constraint generators.

pub mod cardinality;
pub mod gis;
pub mod header;
pub mod ilp;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::network::{loader, preprocess, Network};

use cardinality::PbEncoder;
use gis::GisEncoder;
use ilp::IlpEncoder;

/// A problem instance, ready to encode.
pub struct Instance {
    pub network: Network,
    pub network_file: PathBuf,
    /// Sensor budget; -1 means unbounded, in which case the cardinality
    /// bound falls back to k.
    pub budget: i64,
    pub two_step: bool,
}

impl Instance {
    /// Build phase: load the network file and preprocess the graph.
    /// Twin removal runs iff the encoding is one-step.
    pub fn build(network_file: &Path, budget: i64, two_step: bool) -> Result<Instance> {
        let loaded = loader::load_network(network_file)?;
        let network = preprocess::preprocess(&loaded, two_step)?;
        Ok(Instance {
            network,
            network_file: network_file.to_path_buf(),
            budget,
            two_step,
        })
    }
}

pub enum Encoder {
    Gis(GisEncoder),
    Ilp(IlpEncoder),
}

/// Counts reported after a successful encode.
pub struct EncodeStats {
    pub n_vars: usize,
    /// Clauses for the CNF target, constraint rows for the LP target.
    pub n_rows: usize,
}

impl Encoder {
    pub fn encode(
        &self,
        instance: &Instance,
        config: &Config,
        out_file: &Path,
        k: u32,
    ) -> Result<EncodeStats> {
        match self {
            Encoder::Gis(gis) => {
                let infix = instance
                    .network_file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "network".to_string());
                let backend = PbEncoder::from_config(config, &infix)?;
                let stats = gis.encode(instance, config, &backend, out_file, k)?;
                Ok(EncodeStats {
                    n_vars: stats.n_vars as usize,
                    n_rows: stats.n_clauses,
                })
            }
            Encoder::Ilp(ilp) => {
                let stats = ilp.encode(instance, config, out_file, k)?;
                Ok(EncodeStats {
                    n_vars: stats.n_vars,
                    n_rows: stats.n_constraints,
                })
            }
        }
    }
}
