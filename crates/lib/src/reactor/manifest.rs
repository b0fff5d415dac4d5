//! Reactor manifest (`fab.json`).
//!
//! Describes the modules of one build, the external repository and the
//! assembly configuration:
//!
//! ```json
//! {
//!   "repository": "repo",
//!   "config": { "attach_packaged_unit": true },
//!   "modules": [
//!     { "group": "org.example", "name": "core", "version": "1.0", "packaging": "bundle" },
//!     { "group": "org.example", "name": "app", "version": "1.0", "packaging": "feature",
//!       "dir": "app", "depends_on": ["org.example:core"] }
//!   ]
//! }
//! ```
//!
//! Relative module directories and the repository path are resolved against
//! the directory containing the manifest. A module without `dir` lives in a
//! directory named after the module.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{Module, Reactor, ReactorError};
use crate::assembly::AssemblyConfig;

/// The parsed content of a reactor manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReactorManifest {
  /// Local repository for external features.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub repository: Option<PathBuf>,

  #[serde(default)]
  pub config: AssemblyConfig,

  pub modules: Vec<Module>,
}

impl ReactorManifest {
  /// Load a manifest and resolve its relative paths.
  pub fn load(path: &Path) -> Result<Self, ReactorError> {
    let content = fs::read_to_string(path).map_err(|e| ReactorError::Read {
      path: path.to_path_buf(),
      source: e,
    })?;

    let mut manifest: ReactorManifest = serde_json::from_str(&content).map_err(|e| ReactorError::Parse {
      path: path.to_path_buf(),
      source: e,
    })?;

    let base = path
      .parent()
      .map(|p| dunce::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()))
      .unwrap_or_default();
    manifest.resolve_paths(&base);

    debug!(path = %path.display(), modules = manifest.modules.len(), "loaded reactor manifest");
    Ok(manifest)
  }

  fn resolve_paths(&mut self, base: &Path) {
    for module in &mut self.modules {
      if module.dir.as_os_str().is_empty() {
        module.dir = PathBuf::from(&module.name);
      }
      if module.dir.is_relative() {
        module.dir = base.join(&module.dir);
      }
    }
    if let Some(repository) = &self.repository
      && repository.is_relative()
    {
      self.repository = Some(base.join(repository));
    }
  }

  /// Build the reactor described by this manifest.
  pub fn reactor(&self) -> Result<Reactor, ReactorError> {
    Reactor::new(self.modules.clone())
  }
}
