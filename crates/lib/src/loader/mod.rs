//! Loading of features that are not owned by the build graph.
//!
//! An [`ExternalArtifactLoader`] resolves identities against some package
//! repository. The engine calls it only for identities whose `group:name`
//! matches no reactor module, and treats each call as blocking with exactly
//! one outcome.
//!
//! # Implementations
//!
//! - [`RepositoryLoader`] - a local repository directory
//! - [`MemoryLoader`] - a fixed set of features held in memory

mod repository;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::feature::Feature;
use crate::identity::Identity;

pub use repository::RepositoryLoader;

/// Errors that can occur when loading an external artifact.
#[derive(Debug, Error)]
pub enum LoadError {
  /// The repository has no artifact for this identity.
  #[error("artifact {0} not found")]
  NotFound(Identity),

  /// The identity does not map to a path inside the repository.
  #[error("artifact {0} cannot be stored in a repository")]
  InvalidCoordinate(Identity),

  /// The artifact exists but could not be read.
  #[error("failed to read '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The artifact content is not a valid feature.
  #[error("failed to parse feature '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

impl LoadError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, LoadError::NotFound(_))
  }
}

/// Boundary to an external package repository.
pub trait ExternalArtifactLoader {
  /// Load the feature content of an identity.
  fn load(&self, id: &Identity) -> Result<Feature, LoadError>;

  /// Locate the binary content of a non-feature artifact referenced by a bundle.
  fn locate(&self, id: &Identity) -> Result<PathBuf, LoadError>;
}

/// An in-memory loader, recording every `load` call.
#[derive(Debug, Default)]
pub struct MemoryLoader {
  features: BTreeMap<Identity, Feature>,
  files: BTreeMap<Identity, PathBuf>,
  calls: RefCell<Vec<Identity>>,
}

impl MemoryLoader {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_feature(mut self, feature: Feature) -> Self {
    self.features.insert(feature.id.clone(), feature);
    self
  }

  pub fn with_file(mut self, id: Identity, path: PathBuf) -> Self {
    self.files.insert(id, path);
    self
  }

  /// Identities passed to [`ExternalArtifactLoader::load`], in call order.
  pub fn calls(&self) -> Vec<Identity> {
    self.calls.borrow().clone()
  }
}

impl ExternalArtifactLoader for MemoryLoader {
  fn load(&self, id: &Identity) -> Result<Feature, LoadError> {
    self.calls.borrow_mut().push(id.clone());
    self
      .features
      .get(id)
      .cloned()
      .ok_or_else(|| LoadError::NotFound(id.clone()))
  }

  fn locate(&self, id: &Identity) -> Result<PathBuf, LoadError> {
    self.files.get(id).cloned().ok_or_else(|| LoadError::NotFound(id.clone()))
  }
}
