//! The build graph ("reactor").
//!
//! # Modules
//!
//! - [`manifest`] - the `fab.json` description of a reactor
//! - [`types`] - modules, dependencies, build order

pub mod manifest;
mod types;

pub use manifest::ReactorManifest;
pub use types::*;
