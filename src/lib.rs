//! Encodes the k-identifying-code problem on a network of rooms or
//! sensor locations into either an annotated CNF for a grouped
//! independent-support minimiser or an integer linear program.

pub mod config;
pub mod encoder;
pub mod error;
pub mod network;
pub mod timer;

pub use config::Config;
pub use encoder::{Encoder, Instance};
pub use error::{Error, Result};
