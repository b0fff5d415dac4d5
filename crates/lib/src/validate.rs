//! Classifier invariants of a module's feature set.
//!
//! Features are partitioned into buckets by classifier. "No classifier" is a
//! bucket of its own, distinct from every classifier string. Any bucket with
//! more than one entry is a fatal configuration error:
//!
//! - more than one entry in the unclassified bucket is
//!   [`ClassifierError::MultipleUnclassified`]
//! - more than one entry for a classifier is [`ClassifierError::DuplicateClassifier`]

use std::collections::BTreeMap;

use thiserror::Error;

use crate::identity::ModuleKey;
use crate::store::{FeatureMap, display_key};

/// A classifier invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
  #[error("module {module} defines more than one feature without classifier: {}", render(.locations))]
  MultipleUnclassified { module: ModuleKey, locations: Vec<String> },

  #[error("module {module} defines classifier '{classifier}' more than once: {}", render(.locations))]
  DuplicateClassifier {
    module: ModuleKey,
    classifier: String,
    locations: Vec<String>,
  },
}

impl ClassifierError {
  pub fn module(&self) -> &ModuleKey {
    match self {
      ClassifierError::MultipleUnclassified { module, .. } => module,
      ClassifierError::DuplicateClassifier { module, .. } => module,
    }
  }

  /// The raw location keys in conflict.
  pub fn locations(&self) -> &[String] {
    match self {
      ClassifierError::MultipleUnclassified { locations, .. } => locations,
      ClassifierError::DuplicateClassifier { locations, .. } => locations,
    }
  }
}

fn render(locations: &[String]) -> String {
  locations.iter().map(|l| display_key(l)).collect::<Vec<_>>().join(", ")
}

/// Classifier bucket. Orders the unclassified bucket first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket<'a> {
  Unclassified,
  Classified(&'a str),
}

/// Validate `(location, classifier)` entries of one module.
///
/// Buckets are checked in order (unclassified first, then classifiers
/// lexicographically), so the reported error is deterministic.
pub fn validate_classifiers<'a, I>(module: &ModuleKey, entries: I) -> Result<(), ClassifierError>
where
  I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
  let mut buckets: BTreeMap<Bucket<'a>, Vec<String>> = BTreeMap::new();

  for (location, classifier) in entries {
    let bucket = match classifier {
      Some(c) => Bucket::Classified(c),
      None => Bucket::Unclassified,
    };
    buckets.entry(bucket).or_default().push(location.to_string());
  }

  for (bucket, locations) in buckets {
    if locations.len() < 2 {
      continue;
    }
    return Err(match bucket {
      Bucket::Unclassified => ClassifierError::MultipleUnclassified {
        module: module.clone(),
        locations,
      },
      Bucket::Classified(classifier) => ClassifierError::DuplicateClassifier {
        module: module.clone(),
        classifier: classifier.to_string(),
        locations,
      },
    });
  }

  Ok(())
}

/// Validate a map of features keyed by location.
pub fn validate_features(module: &ModuleKey, features: &FeatureMap) -> Result<(), ClassifierError> {
  validate_classifiers(module, features.iter().map(|(k, f)| (k.as_str(), f.classifier())))
}
