//! fab-lib: feature assembly for multi-module builds
//!
//! This crate provides the types and engine behind `fab`:
//! - `Identity`: structured coordinates of features and artifacts
//! - `Feature`: a deployable description of bundles and configuration
//! - `Reactor`: the modules of one build and their order
//! - `AssemblyCoordinator`: per-module assembly with cross-module and
//!   external reference resolution

pub mod assembly;
pub mod consts;
pub mod feature;
pub mod identity;
pub mod loader;
pub mod merge;
pub mod platform;
pub mod reactor;
pub mod source;
pub mod store;
pub mod util;
pub mod validate;
