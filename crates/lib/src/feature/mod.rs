//! Feature descriptors and their parts.
//!
//! Features are the unit of assembly: raw features are read from module
//! sources or external repositories, and assembled features are the terminal
//! result of merging a feature with its prototype chain.

mod types;

pub use types::*;
