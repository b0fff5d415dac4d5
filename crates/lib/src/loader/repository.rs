//! Local repository directory.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   org/example/               # group, dots become directories
//!     base/                    # name
//!       1.0/                   # version
//!         base-1.0.feature     # {name}-{version}[-{classifier}].{type}
//!         base-1.0-web.feature
//! ```
//!
//! Feature artifacts hold the JSON form of a [`Feature`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ExternalArtifactLoader, LoadError};
use crate::feature::Feature;
use crate::identity::{Identity, is_path_component};
use crate::platform::paths::repository_dir;

/// Loader reading artifacts from a local repository directory.
#[derive(Debug, Clone)]
pub struct RepositoryLoader {
  root: PathBuf,
}

impl Default for RepositoryLoader {
  fn default() -> Self {
    Self::new()
  }
}

impl RepositoryLoader {
  /// Create a loader for the default repository location.
  pub fn new() -> Self {
    Self { root: repository_dir() }
  }

  /// Create a loader for a custom repository root.
  pub fn with_path(root: PathBuf) -> Self {
    Self { root }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Compute the path of an artifact inside the repository.
  pub fn artifact_path(&self, id: &Identity) -> PathBuf {
    let mut dir = self.root.clone();
    for segment in id.group().split('.') {
      dir.push(segment);
    }
    let file = match id.classifier() {
      Some(classifier) => format!("{}-{}-{}.{}", id.name(), id.version(), classifier, id.type_()),
      None => format!("{}-{}.{}", id.name(), id.version(), id.type_()),
    };
    dir.join(id.name()).join(id.version()).join(file)
  }

  /// [`Self::artifact_path`], refusing identities that would escape the root.
  fn checked_path(&self, id: &Identity) -> Result<PathBuf, LoadError> {
    let group = id.group().split('.').filter(|s| !s.is_empty());
    let mut segments = group.chain([id.name(), id.version(), id.type_()]).chain(id.classifier());
    if segments.all(is_path_component) {
      Ok(self.artifact_path(id))
    } else {
      Err(LoadError::InvalidCoordinate(id.clone()))
    }
  }
}

impl ExternalArtifactLoader for RepositoryLoader {
  fn load(&self, id: &Identity) -> Result<Feature, LoadError> {
    let path = self.checked_path(id)?;
    debug!(id = %id, path = %path.display(), "loading external feature");

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(LoadError::NotFound(id.clone())),
      Err(e) => return Err(LoadError::Read { path, source: e }),
    };

    serde_json::from_str(&content).map_err(|e| LoadError::Parse { path, source: e })
  }

  fn locate(&self, id: &Identity) -> Result<PathBuf, LoadError> {
    let path = self.checked_path(id)?;
    if path.is_file() {
      Ok(path)
    } else {
      Err(LoadError::NotFound(id.clone()))
    }
  }
}
