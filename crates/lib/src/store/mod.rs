//! Per-module feature cache.
//!
//! A [`FeatureStore`] holds the features of one module in four maps, all keyed
//! by the source location string of the feature:
//!
//! ```text
//! raw main        assembled main
//! raw test        assembled test
//! ```
//!
//! Locations are the cache key rather than identities because one module may
//! define several features in the same scope. Assembled maps are append-only:
//! an entry, once written, is never replaced for the rest of the build.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::consts::{AGGREGATE_KEY_PREFIX, MAIN_FEATURES_DIR, TEST_FEATURES_DIR};
use crate::feature::Feature;
use crate::identity::Identity;

/// Features of one scope, keyed by location, iterated in lexicographic order.
pub type FeatureMap = BTreeMap<String, Feature>;

/// Build scope of a feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
  #[default]
  Main,
  Test,
}

impl Scope {
  pub const ALL: [Scope; 2] = [Scope::Main, Scope::Test];

  pub fn as_str(self) -> &'static str {
    match self {
      Scope::Main => "main",
      Scope::Test => "test",
    }
  }

  /// Feature source directory of this scope, relative to the module directory.
  pub fn features_dir(self) -> &'static str {
    match self {
      Scope::Main => MAIN_FEATURES_DIR,
      Scope::Test => TEST_FEATURES_DIR,
    }
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Build the assembled-map key of an aggregate feature.
pub fn aggregate_key(classifier: &str) -> String {
  format!("{}{}", AGGREGATE_KEY_PREFIX, classifier)
}

/// Whether a key names a synthesized aggregate rather than a source location.
pub fn is_aggregate_key(key: &str) -> bool {
  key.starts_with(AGGREGATE_KEY_PREFIX)
}

/// Render a key for diagnostics, marking aggregates distinctly from source files.
pub fn display_key(key: &str) -> String {
  match key.strip_prefix(AGGREGATE_KEY_PREFIX) {
    Some(classifier) => format!("<aggregate {}>", classifier),
    None => key.to_string(),
  }
}

#[derive(Debug, Default, Clone)]
struct ScopeState {
  raw: FeatureMap,
  assembled: FeatureMap,
  processed: bool,
}

/// The feature cache of one module.
#[derive(Debug, Default, Clone)]
pub struct FeatureStore {
  main: ScopeState,
  test: ScopeState,
}

impl FeatureStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self, scope: Scope) -> &ScopeState {
    match scope {
      Scope::Main => &self.main,
      Scope::Test => &self.test,
    }
  }

  fn state_mut(&mut self, scope: Scope) -> &mut ScopeState {
    match scope {
      Scope::Main => &mut self.main,
      Scope::Test => &mut self.test,
    }
  }

  /// Mark a scope as processed.
  ///
  /// Returns `true` if this call performed the transition, `false` if the
  /// scope was already processed (or is being processed).
  pub fn mark_processed(&mut self, scope: Scope) -> bool {
    let state = self.state_mut(scope);
    if state.processed {
      return false;
    }
    state.processed = true;
    true
  }

  pub fn is_processed(&self, scope: Scope) -> bool {
    self.state(scope).processed
  }

  pub fn raw(&self, scope: Scope) -> &FeatureMap {
    &self.state(scope).raw
  }

  pub fn raw_mut(&mut self, scope: Scope) -> &mut FeatureMap {
    &mut self.state_mut(scope).raw
  }

  /// Replace the raw features of a scope.
  pub fn set_raw(&mut self, scope: Scope, features: FeatureMap) {
    self.state_mut(scope).raw = features;
  }

  pub fn assembled(&self, scope: Scope) -> &FeatureMap {
    &self.state(scope).assembled
  }

  pub fn is_assembled(&self, scope: Scope, key: &str) -> bool {
    self.state(scope).assembled.contains_key(key)
  }

  /// Record an assembled feature.
  ///
  /// The first write for a key wins; later writes are ignored and the
  /// memoized value is returned.
  pub fn insert_assembled(&mut self, scope: Scope, key: &str, feature: Feature) -> &Feature {
    trace!(scope = %scope, key, id = %feature.id, "storing assembled feature");
    self.state_mut(scope).assembled.entry(key.to_string()).or_insert(feature)
  }

  /// Find an assembled feature by exact identity.
  pub fn find_assembled(&self, scope: Scope, id: &Identity) -> Option<(&str, &Feature)> {
    find_by_id(&self.state(scope).assembled, id)
  }

  /// Find a raw feature by exact identity.
  pub fn find_raw(&self, scope: Scope, id: &Identity) -> Option<(&str, &Feature)> {
    find_by_id(&self.state(scope).raw, id)
  }
}

fn find_by_id<'a>(map: &'a FeatureMap, id: &Identity) -> Option<(&'a str, &'a Feature)> {
  map.iter().find(|(_, f)| &f.id == id).map(|(k, f)| (k.as_str(), f))
}
