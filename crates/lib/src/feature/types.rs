//! Feature model types.
//!
//! A [`Feature`] is a named, versioned descriptor aggregating bundle
//! references ([`Artifact`]), [`Extension`]s and configuration. Features are
//! created raw (as read from source) and turned into terminal, assembled
//! features by a [`Merger`](crate::merge::Merger).
//!
//! # Serialization
//!
//! All types serialize with serde. Ordered containers are used everywhere so
//! that the JSON form, and therefore [`Hashable`] digests, are deterministic.
//!
//! ```json
//! {
//!   "id": "org.example:app:feature:1.0",
//!   "title": "Application",
//!   "bundles": [
//!     { "id": "org.example:core:1.0", "start_order": 20 }
//!   ],
//!   "extensions": {
//!     "content-packages": {
//!       "state": "optional",
//!       "kind": "artifact_list",
//!       "content": [{ "id": "org.example:content:zip:1.0" }]
//!     }
//!   },
//!   "prototype": { "id": "org.example:base:feature:1.0" }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::util::hash::Hashable;

/// A reference to one bundle or module artifact inside a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
  pub id: Identity,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_order: Option<u32>,

  /// Opaque metadata for downstream tooling. Round-trips unchanged.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub metadata: BTreeMap<String, String>,
}

impl Artifact {
  pub fn new(id: Identity) -> Self {
    Self {
      id,
      start_order: None,
      metadata: BTreeMap::new(),
    }
  }

  pub fn with_start_order(mut self, start_order: u32) -> Self {
    self.start_order = Some(start_order);
    self
  }
}

/// An ordered set of artifacts, unique by identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifacts(Vec<Artifact>);

impl Artifacts {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an artifact, replacing an existing entry with the same identity in place.
  ///
  /// Returns `true` if the artifact was not present before.
  pub fn insert(&mut self, artifact: Artifact) -> bool {
    match self.0.iter_mut().find(|a| a.id == artifact.id) {
      Some(existing) => {
        *existing = artifact;
        false
      }
      None => {
        self.0.push(artifact);
        true
      }
    }
  }

  /// Remove the artifact with the given identity, if present.
  pub fn remove(&mut self, id: &Identity) -> Option<Artifact> {
    let pos = self.0.iter().position(|a| &a.id == id)?;
    Some(self.0.remove(pos))
  }

  pub fn get(&self, id: &Identity) -> Option<&Artifact> {
    self.0.iter().find(|a| &a.id == id)
  }

  pub fn contains(&self, id: &Identity) -> bool {
    self.get(id).is_some()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl FromIterator<Artifact> for Artifacts {
  fn from_iter<T: IntoIterator<Item = Artifact>>(iter: T) -> Self {
    let mut artifacts = Artifacts::new();
    for artifact in iter {
      artifacts.insert(artifact);
    }
    artifacts
  }
}

impl<'a> IntoIterator for &'a Artifacts {
  type Item = &'a Artifact;
  type IntoIter = std::slice::Iter<'a, Artifact>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

/// Whether a consumer must understand an extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionState {
  Required,
  #[default]
  Optional,
}

/// The shape of an extension's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
  ArtifactList,
  Structured,
  Text,
}

/// Extension content, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum ExtensionContent {
  ArtifactList(Artifacts),
  Structured(serde_json::Value),
  Text(String),
}

/// A named extension of a feature. The name is the key in [`Feature::extensions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
  #[serde(default)]
  pub state: ExtensionState,

  #[serde(flatten)]
  pub content: ExtensionContent,
}

impl Extension {
  pub fn new(state: ExtensionState, content: ExtensionContent) -> Self {
    Self { state, content }
  }

  pub fn kind(&self) -> ExtensionKind {
    match self.content {
      ExtensionContent::ArtifactList(_) => ExtensionKind::ArtifactList,
      ExtensionContent::Structured(_) => ExtensionKind::Structured,
      ExtensionContent::Text(_) => ExtensionKind::Text,
    }
  }

  /// The artifacts of an artifact-list extension.
  pub fn artifacts(&self) -> Option<&Artifacts> {
    match &self.content {
      ExtensionContent::ArtifactList(artifacts) => Some(artifacts),
      _ => None,
    }
  }
}

/// A base feature this feature inherits from, with removals applied to the base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
  pub id: Identity,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub removed_bundles: Vec<Identity>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub removed_extensions: Vec<String>,
}

impl Prototype {
  pub fn new(id: Identity) -> Self {
    Self {
      id,
      removed_bundles: Vec::new(),
      removed_extensions: Vec::new(),
    }
  }
}

/// A feature descriptor, raw or assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
  pub id: Identity,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vendor: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub license: Option<String>,

  #[serde(default, skip_serializing_if = "Artifacts::is_empty")]
  pub bundles: Artifacts,

  /// Extensions keyed by their unique name.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub extensions: BTreeMap<String, Extension>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub variables: BTreeMap<String, String>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub framework_properties: BTreeMap<String, String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prototype: Option<Prototype>,

  /// Terminal flag: an assembled feature is never merged again.
  #[serde(default)]
  pub assembled: bool,
}

impl Feature {
  /// Create an empty, raw feature.
  pub fn new(id: Identity) -> Self {
    Self {
      id,
      title: None,
      description: None,
      vendor: None,
      license: None,
      bundles: Artifacts::new(),
      extensions: BTreeMap::new(),
      variables: BTreeMap::new(),
      framework_properties: BTreeMap::new(),
      prototype: None,
      assembled: false,
    }
  }

  pub fn classifier(&self) -> Option<&str> {
    self.id.classifier()
  }

  /// Identities of every bundle and every artifact-list extension entry.
  pub fn referenced_artifacts(&self) -> impl Iterator<Item = &Identity> {
    self.bundles.iter().map(|a| &a.id).chain(
      self
        .extensions
        .values()
        .filter_map(Extension::artifacts)
        .flat_map(|artifacts| artifacts.iter().map(|a| &a.id)),
    )
  }
}

impl Hashable for Feature {}
