//! Error types shared by the loader, preprocessor and encoders.
//!
//! Every fallible operation in the crate returns [`Result`]. The driver
//! catches at the build/encode phase boundary, reports the phase together
//! with the elapsed timers, and exits nonzero.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The network file could not be parsed.
    #[error("{path}:{line}: {reason}")]
    SourceFormat {
        path: PathBuf,
        /// 1-based line number of the offending line.
        line: usize,
        reason: String,
    },

    /// Invalid combination of command line arguments.
    #[error("argument error: {0}")]
    Argument(String),

    /// The graph cannot be encoded in the requested configuration.
    #[error("preprocess error: {0}")]
    Preprocess(String),

    /// The external cardinality encoder is missing or misbehaved.
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Enumeration exceeded a configured resource limit.
    #[error("resource error: {0}")]
    Resource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
