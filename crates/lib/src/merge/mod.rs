//! Feature merging.
//!
//! The [`Merger`] turns a raw feature into an assembled one, asking a
//! [`FeatureProvider`] for every feature it references. The engine hands the
//! merger a [`ReferenceResolver`](crate::assembly::ReferenceResolver) as the
//! provider; tests and embedders may hand it anything else.
//!
//! # Contract
//!
//! - `assemble` never mutates the base feature.
//! - The provider is asked at most once per distinct identity.
//! - `Ok(None)` from the provider (not found, or a cyclic reference) must be
//!   surfaced as [`AssemblyError::UnresolvedReference`], never ignored.
//! - Provider errors are propagated unchanged.

mod prototype;

use crate::assembly::AssemblyError;
use crate::feature::Feature;
use crate::identity::Identity;

pub use prototype::PrototypeMerger;

/// Resolution callback handed to a [`Merger`].
pub trait FeatureProvider {
  /// Resolve an identity to a feature. `Ok(None)` means "not found".
  fn provide(&mut self, id: &Identity) -> Result<Option<Feature>, AssemblyError>;
}

/// Combines a feature and its resolved references into one assembled feature.
pub trait Merger {
  fn assemble(&self, base: &Feature, provider: &mut dyn FeatureProvider) -> Result<Feature, AssemblyError>;

  /// Merge already assembled features, in order, into one new feature with identity `id`.
  fn aggregate(&self, id: Identity, features: &[&Feature]) -> Result<Feature, AssemblyError>;
}
