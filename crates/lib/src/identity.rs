//! Artifact coordinates.
//!
//! An [`Identity`] names a feature or artifact by `(group, name, version,
//! classifier, type)`. Equality is structural over all five fields. The
//! `(group, name)` pair alone identifies the owning module of the build graph,
//! see [`ModuleKey`].
//!
//! # Text Form
//!
//! - `group:name:version` - default type, no classifier
//! - `group:name:type:version`
//! - `group:name:type:classifier:version`
//!
//! ```
//! use fab_lib::identity::Identity;
//!
//! let id: Identity = "org.example:app:feature:web:1.0".parse().unwrap();
//! assert_eq!(id.classifier(), Some("web"));
//! assert_eq!(id.module_key().as_str(), "org.example:app");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_TYPE;

/// Errors that can occur when parsing an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
  /// Wrong number of `:`-separated segments.
  #[error("invalid coordinate '{0}': expected group:name[:type[:classifier]]:version")]
  Malformed(String),

  /// A required segment is empty.
  #[error("invalid coordinate '{input}': {segment} must not be empty")]
  EmptySegment { input: String, segment: &'static str },

  /// A segment that cannot name a repository directory or file.
  #[error("invalid coordinate '{input}': {segment} '{value}' is not a valid path component")]
  InvalidSegment {
    input: String,
    segment: &'static str,
    value: String,
  },
}

/// Whether `value` can be used as one component of a repository path.
pub(crate) fn is_path_component(value: &str) -> bool {
  !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '\\'])
}

/// A structured coordinate naming an artifact or feature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
  group: String,
  name: String,
  version: String,
  classifier: Option<String>,
  type_: String,
}

impl Identity {
  /// Create an identity with the default type and no classifier.
  pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      group: group.into(),
      name: name.into(),
      version: version.into(),
      classifier: None,
      type_: DEFAULT_TYPE.to_string(),
    }
  }

  /// Return a copy with the given classifier. An empty classifier is no classifier.
  pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
    self.classifier = Some(classifier.into()).filter(|c| !c.is_empty());
    self
  }

  /// Return a copy without a classifier.
  pub fn without_classifier(mut self) -> Self {
    self.classifier = None;
    self
  }

  /// Return a copy with the given type.
  pub fn with_type(mut self, type_: impl Into<String>) -> Self {
    self.type_ = type_.into();
    self
  }

  pub fn group(&self) -> &str {
    &self.group
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn classifier(&self) -> Option<&str> {
    self.classifier.as_deref()
  }

  pub fn type_(&self) -> &str {
    &self.type_
  }

  /// The key of the module owning this identity (`group:name`).
  pub fn module_key(&self) -> ModuleKey {
    ModuleKey::new(&self.group, &self.name)
  }

  /// Whether this identity belongs to the given module.
  pub fn is_owned_by(&self, module: &ModuleKey) -> bool {
    module.matches(&self.group, &self.name)
  }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (&self.classifier, self.type_.as_str()) {
      (None, DEFAULT_TYPE) => write!(f, "{}:{}:{}", self.group, self.name, self.version),
      (None, type_) => write!(f, "{}:{}:{}:{}", self.group, self.name, type_, self.version),
      (Some(classifier), type_) => write!(
        f,
        "{}:{}:{}:{}:{}",
        self.group, self.name, type_, classifier, self.version
      ),
    }
  }
}

impl FromStr for Identity {
  type Err = IdentityError;

  fn from_str(input: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = input.split(':').collect();

    let (group, name, type_, classifier, version) = match parts.as_slice() {
      [group, name, version] => (*group, *name, DEFAULT_TYPE, None, *version),
      [group, name, type_, version] => (*group, *name, *type_, None, *version),
      [group, name, type_, classifier, version] => (*group, *name, *type_, Some(*classifier), *version),
      _ => return Err(IdentityError::Malformed(input.to_string())),
    };

    for (segment, value) in [("group", group), ("name", name), ("type", type_), ("version", version)] {
      if value.is_empty() {
        return Err(IdentityError::EmptySegment {
          input: input.to_string(),
          segment,
        });
      }
    }

    let segments = [("group", group), ("name", name), ("type", type_), ("version", version)];
    for (segment, value) in segments.into_iter().chain(classifier.map(|c| ("classifier", c))) {
      if !value.is_empty() && !is_path_component(value) {
        return Err(IdentityError::InvalidSegment {
          input: input.to_string(),
          segment,
          value: value.to_string(),
        });
      }
    }

    Ok(Self {
      group: group.to_string(),
      name: name.to_string(),
      version: version.to_string(),
      // An empty classifier segment reads as "no classifier".
      classifier: classifier.filter(|c| !c.is_empty()).map(str::to_string),
      type_: type_.to_string(),
    })
  }
}

impl TryFrom<String> for Identity {
  type Error = IdentityError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Identity> for String {
  fn from(id: Identity) -> Self {
    id.to_string()
  }
}

/// The `group:name` key of a module in the build graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleKey(String);

impl ModuleKey {
  pub fn new(group: &str, name: &str) -> Self {
    Self(format!("{}:{}", group, name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  fn matches(&self, group: &str, name: &str) -> bool {
    self
      .0
      .split_once(':')
      .is_some_and(|(g, n)| g == group && n == name)
  }
}

impl fmt::Display for ModuleKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
