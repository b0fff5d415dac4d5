//! Test fixtures for fab-lib unit tests.

use std::cell::RefCell;

use crate::assembly::AssemblyError;
use crate::feature::{Feature, Prototype};
use crate::identity::Identity;
use crate::merge::{FeatureProvider, Merger, PrototypeMerger};

pub fn id(s: &str) -> Identity {
  s.parse().unwrap()
}

pub fn feature(s: &str) -> Feature {
  Feature::new(id(s))
}

/// A feature inheriting from `prototype`.
pub fn derived(s: &str, prototype: &str) -> Feature {
  let mut f = feature(s);
  f.prototype = Some(Prototype::new(id(prototype)));
  f
}

/// [`PrototypeMerger`] recording the identity of every feature it assembles.
#[derive(Debug, Default)]
pub struct CountingMerger {
  inner: PrototypeMerger,
  calls: RefCell<Vec<Identity>>,
}

impl CountingMerger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn calls(&self) -> Vec<Identity> {
    self.calls.borrow().clone()
  }

  /// How often the feature `s` was assembled.
  pub fn count(&self, s: &str) -> usize {
    let id = id(s);
    self.calls.borrow().iter().filter(|c| **c == id).count()
  }
}

impl Merger for CountingMerger {
  fn assemble(&self, base: &Feature, provider: &mut dyn FeatureProvider) -> Result<Feature, AssemblyError> {
    self.calls.borrow_mut().push(base.id.clone());
    self.inner.assemble(base, provider)
  }

  fn aggregate(&self, id: Identity, features: &[&Feature]) -> Result<Feature, AssemblyError> {
    self.inner.aggregate(id, features)
  }
}
