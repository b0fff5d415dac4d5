//! Raw feature discovery for reactor modules.
//!
//! A [`FeatureSource`] returns the raw features a module defines for a scope,
//! keyed by location. The location string is the feature's cache key for the
//! rest of the build.
//!
//! [`DirectorySource`] reads every `*.json` file below the scope's feature
//! directory of the module (`src/main/features` or `src/test/features`),
//! keyed by its `/`-separated path relative to the module directory.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::consts::FEATURE_FILE_EXT;
use crate::feature::Feature;
use crate::identity::ModuleKey;
use crate::reactor::Module;
use crate::store::{FeatureMap, Scope};

/// Errors that can occur when loading raw features.
#[derive(Debug, Error)]
pub enum SourceError {
  #[error("failed to scan feature directory '{path}': {message}")]
  Walk { path: PathBuf, message: String },

  #[error("failed to read feature file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse feature file '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Loader of record for raw features of reactor modules.
pub trait FeatureSource {
  fn load_features(&self, module: &Module, scope: Scope) -> Result<FeatureMap, SourceError>;
}

/// Reads feature files from module directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectorySource;

impl DirectorySource {
  pub fn new() -> Self {
    Self
  }
}

impl FeatureSource for DirectorySource {
  fn load_features(&self, module: &Module, scope: Scope) -> Result<FeatureMap, SourceError> {
    let dir = module.dir.join(scope.features_dir());
    let mut features = FeatureMap::new();

    if !dir.is_dir() {
      trace!(module = %module.key(), scope = %scope, dir = %dir.display(), "no feature directory");
      return Ok(features);
    }

    for entry in WalkDir::new(&dir).sort_by_file_name() {
      let entry = entry.map_err(|e| SourceError::Walk {
        path: dir.clone(),
        message: e.to_string(),
      })?;

      let path = entry.path();
      if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != FEATURE_FILE_EXT) {
        continue;
      }

      let content = fs::read_to_string(path).map_err(|e| SourceError::Read {
        path: path.to_path_buf(),
        source: e,
      })?;
      let feature: Feature = serde_json::from_str(&content).map_err(|e| SourceError::Parse {
        path: path.to_path_buf(),
        source: e,
      })?;

      let location = location_key(&module.dir, path);
      trace!(module = %module.key(), location, id = %feature.id, "loaded raw feature");
      features.insert(location, feature);
    }

    debug!(module = %module.key(), scope = %scope, count = features.len(), "loaded raw features");
    Ok(features)
  }
}

/// `/`-separated path of a feature file relative to its module directory.
fn location_key(module_dir: &Path, path: &Path) -> String {
  let relative = path.strip_prefix(module_dir).unwrap_or(path);
  relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

/// Raw features held in memory, for embedding and tests. Every load is recorded.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
  features: BTreeMap<(ModuleKey, Scope), FeatureMap>,
  loads: RefCell<Vec<(ModuleKey, Scope)>>,
}

impl MemorySource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a raw feature for a module scope under the given location.
  pub fn with_feature(mut self, module: &ModuleKey, scope: Scope, location: &str, feature: Feature) -> Self {
    self
      .features
      .entry((module.clone(), scope))
      .or_default()
      .insert(location.to_string(), feature);
    self
  }

  /// Module scopes passed to [`FeatureSource::load_features`], in call order.
  pub fn loads(&self) -> Vec<(ModuleKey, Scope)> {
    self.loads.borrow().clone()
  }
}

impl FeatureSource for MemorySource {
  fn load_features(&self, module: &Module, scope: Scope) -> Result<FeatureMap, SourceError> {
    self.loads.borrow_mut().push((module.key(), scope));
    Ok(self.features.get(&(module.key(), scope)).cloned().unwrap_or_default())
  }
}
