//! Types shared by the assembly engine: errors, configuration and diagnostics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{Identity, ModuleKey};
use crate::loader::LoadError;
use crate::reactor::ReactorError;
use crate::source::SourceError;
use crate::store::{Scope, display_key};
use crate::validate::ClassifierError;

/// Errors that abort a build.
#[derive(Debug, Error)]
pub enum AssemblyError {
  /// A feature references something that could not be provided.
  #[error("feature {feature} references {reference}, which could not be resolved")]
  UnresolvedReference { feature: Identity, reference: Identity },

  /// The external repository failed for a reason other than absence.
  #[error("failed to resolve external feature {id}: {source}")]
  ExternalResolution {
    id: Identity,
    #[source]
    source: LoadError,
  },

  #[error(transparent)]
  Classifier(#[from] ClassifierError),

  #[error(
    "module {module} produces a packaged unit but defines more than one feature: {}",
    .locations.join(", ")
  )]
  AmbiguousPackagedUnitTarget { module: ModuleKey, locations: Vec<String> },

  #[error("failed to load {scope} features of module {module}: {source}")]
  Source {
    module: ModuleKey,
    scope: Scope,
    #[source]
    source: SourceError,
  },

  #[error("module {0} is not part of the reactor")]
  UnknownModule(ModuleKey),

  #[error("an aggregate of module {module} has an empty classifier")]
  UnclassifiedAggregate { module: ModuleKey },

  #[error("aggregate '{classifier}' of module {module} selects no features")]
  EmptyAggregate { module: ModuleKey, classifier: String },

  #[error(transparent)]
  Reactor(#[from] ReactorError),
}

fn default_dependency_scope() -> String {
  "provided".to_string()
}

/// Build-level assembly options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
  /// Attach a module's compiled artifact to its only main feature.
  pub attach_packaged_unit: bool,

  /// Type of the attached artifact; the module packaging when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub packaged_unit_type: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub packaged_unit_start_order: Option<u32>,

  /// Do not add referenced artifacts and features to module dependencies.
  pub skip_dependency_augmentation: bool,

  /// Scope of dependencies added by augmentation.
  #[serde(default = "default_dependency_scope")]
  pub dependency_scope: String,

  /// Aggregates to synthesize, per module.
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub aggregates: BTreeMap<ModuleKey, Vec<AggregateDecl>>,
}

impl Default for AssemblyConfig {
  fn default() -> Self {
    Self {
      attach_packaged_unit: false,
      packaged_unit_type: None,
      packaged_unit_start_order: None,
      skip_dependency_augmentation: false,
      dependency_scope: default_dependency_scope(),
      aggregates: BTreeMap::new(),
    }
  }
}

/// Declaration of an aggregate feature built from assembled features of one module scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDecl {
  /// Classifier of the synthesized feature.
  pub classifier: String,

  #[serde(default)]
  pub scope: Scope,

  /// Classifiers of the features to merge, in order. `*` selects every
  /// feature and the empty string selects the unclassified one.
  pub includes: Vec<String>,
}

impl AggregateDecl {
  pub fn new(classifier: impl Into<String>, includes: &[&str]) -> Self {
    Self {
      classifier: classifier.into(),
      scope: Scope::Main,
      includes: includes.iter().map(|s| s.to_string()).collect(),
    }
  }

  pub fn in_scope(mut self, scope: Scope) -> Self {
    self.scope = scope;
    self
  }

  /// Whether a feature with the given classifier is part of this aggregate.
  pub fn selects(&self, classifier: Option<&str>) -> bool {
    self.includes.iter().any(|include| match classifier {
      _ if include == "*" => true,
      Some(c) => include == c,
      None => include.is_empty(),
    })
  }
}

/// Category of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
  CycleDetected,
  FeatureNotFound,
  DuplicateClassifier,
  AmbiguousPackagedUnit,
}

impl DiagnosticKind {
  /// Whether this diagnostic accompanies a fatal error.
  pub fn is_error(self) -> bool {
    !matches!(self, DiagnosticKind::CycleDetected)
  }
}

/// A build-tool-visible message recorded during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub kind: DiagnosticKind,
  pub module: ModuleKey,
  pub subject: String,
}

impl Diagnostic {
  pub fn new(kind: DiagnosticKind, module: &ModuleKey, subject: impl Into<String>) -> Self {
    Self {
      kind,
      module: module.clone(),
      subject: subject.into(),
    }
  }

  pub(crate) fn cycle(module: &ModuleKey, id: &Identity) -> Self {
    Self::new(DiagnosticKind::CycleDetected, module, id.to_string())
  }

  pub(crate) fn not_found(module: &ModuleKey, id: &Identity) -> Self {
    Self::new(DiagnosticKind::FeatureNotFound, module, id.to_string())
  }

  pub(crate) fn classifier(error: &ClassifierError) -> Self {
    let locations: Vec<String> = error.locations().iter().map(|l| display_key(l)).collect();
    Self::new(DiagnosticKind::DuplicateClassifier, error.module(), locations.join(", "))
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      DiagnosticKind::CycleDetected => write!(f, "cyclic reference through {} inside {}", self.subject, self.module),
      DiagnosticKind::FeatureNotFound => write!(f, "unable to find feature {} for {}", self.subject, self.module),
      DiagnosticKind::DuplicateClassifier => {
        write!(f, "conflicting feature classifiers in {}: {}", self.module, self.subject)
      }
      DiagnosticKind::AmbiguousPackagedUnit => write!(
        f,
        "cannot attach packaged unit of {}, several features defined: {}",
        self.module, self.subject
      ),
    }
  }
}
