//! Feature assembly.
//!
//! Assembling a feature means resolving every feature it references
//! (prototypes) and merging them into one self-contained feature. References
//! may point into the same module, into another module of the reactor, or to
//! the external repository.
//!
//! # Flow
//!
//! ```text
//! process(module, scope)
//!   └─ Merger::assemble(raw feature, ReferenceResolver)
//!        └─ ReferenceResolver::provide(id)
//!             ├─ same module:    assembled / raw (assembled on demand)
//!             ├─ reactor module: process(owner, scope), then lookup
//!             └─ external:       ExternalArtifactLoader::load
//! ```
//!
//! All state lives in a [`BuildSession`]. Each top-level
//! [`AssemblyCoordinator::process`] call tracks the identities it is currently
//! resolving, across modules, to detect cyclic references.

mod aggregate;
mod coordinator;
mod resolver;
mod session;
mod types;

pub use coordinator::AssemblyCoordinator;
pub use resolver::ReferenceResolver;
pub use session::BuildSession;
pub use types::*;
