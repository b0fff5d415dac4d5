//! Shared fixtures for the library integration tests.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use fab_lib::assembly::{AssemblyError, BuildSession};
use fab_lib::feature::{Feature, Prototype};
use fab_lib::identity::{Identity, ModuleKey};
use fab_lib::merge::{FeatureProvider, Merger, PrototypeMerger};
use fab_lib::reactor::{Module, Reactor};

pub fn id(s: &str) -> Identity {
  s.parse().unwrap()
}

pub fn key(s: &str) -> ModuleKey {
  let (group, name) = s.split_once(':').unwrap();
  ModuleKey::new(group, name)
}

pub fn feature(s: &str) -> Feature {
  Feature::new(id(s))
}

pub fn derived(s: &str, prototype: &str) -> Feature {
  let mut f = feature(s);
  f.prototype = Some(Prototype::new(id(prototype)));
  f
}

pub fn session(modules: Vec<Module>) -> BuildSession {
  BuildSession::new(Reactor::new(modules).unwrap())
}

pub fn write(path: &Path, content: &str) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, content).unwrap();
}

/// [`PrototypeMerger`] recording every feature it assembles.
#[derive(Default)]
pub struct CountingMerger {
  inner: PrototypeMerger,
  calls: RefCell<Vec<Identity>>,
}

impl CountingMerger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn total(&self) -> usize {
    self.calls.borrow().len()
  }

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
