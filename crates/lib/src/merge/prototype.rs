//! Default merger: prototype inheritance.
//!
//! The assembled feature starts from the resolved prototype (minus the
//! removed bundles and extensions) and lays the base feature over it:
//!
//! - bundles are appended; an identical identity replaces the inherited entry
//! - artifact-list extensions present on both sides are merged entry by entry,
//!   any other extension of the base replaces the inherited one
//! - variables and framework properties are overridden key by key
//! - vendor and license are inherited unless the base sets them; title and
//!   description always come from the base

use tracing::{debug, trace};

use super::{FeatureProvider, Merger};
use crate::assembly::AssemblyError;
use crate::feature::{Extension, ExtensionContent, Feature, Prototype};
use crate::identity::Identity;

#[derive(Debug, Clone, Copy, Default)]
pub struct PrototypeMerger;

impl PrototypeMerger {
  pub fn new() -> Self {
    Self
  }
}

impl Merger for PrototypeMerger {
  fn assemble(&self, base: &Feature, provider: &mut dyn FeatureProvider) -> Result<Feature, AssemblyError> {
    if base.assembled {
      return Ok(base.clone());
    }

    let mut result = match &base.prototype {
      Some(prototype) => {
        let parent = provider
          .provide(&prototype.id)?
          .ok_or_else(|| AssemblyError::UnresolvedReference {
            feature: base.id.clone(),
            reference: prototype.id.clone(),
          })?;
        inherit(&base.id, parent, prototype)
      }
      None => Feature::new(base.id.clone()),
    };

    overlay(&mut result, base);
    result.prototype = None;
    result.assembled = true;

    debug!(id = %result.id, bundles = result.bundles.len(), "assembled feature");
    Ok(result)
  }

  fn aggregate(&self, id: Identity, features: &[&Feature]) -> Result<Feature, AssemblyError> {
    let mut result = Feature::new(id);
    for feature in features {
      overlay(&mut result, feature);
    }
    result.assembled = true;

    debug!(id = %result.id, parts = features.len(), "aggregated features");
    Ok(result)
  }
}

/// Turn a resolved prototype into the starting point of `id`.
fn inherit(id: &Identity, mut parent: Feature, prototype: &Prototype) -> Feature {
  for removed in &prototype.removed_bundles {
    if parent.bundles.remove(removed).is_none() {
      trace!(prototype = %prototype.id, bundle = %removed, "removed bundle not present in prototype");
    }
  }
  for name in &prototype.removed_extensions {
    parent.extensions.remove(name);
  }

  parent.id = id.clone();
  parent.title = None;
  parent.description = None;
  parent.prototype = None;
  parent.assembled = false;
  parent
}

fn overlay(target: &mut Feature, source: &Feature) {
  if source.title.is_some() {
    target.title = source.title.clone();
  }
  if source.description.is_some() {
    target.description = source.description.clone();
  }
  if source.vendor.is_some() {
    target.vendor = source.vendor.clone();
  }
  if source.license.is_some() {
    target.license = source.license.clone();
  }

  for artifact in &source.bundles {
    target.bundles.insert(artifact.clone());
  }

  for (name, extension) in &source.extensions {
    match target.extensions.get_mut(name) {
      Some(existing) => merge_extension(existing, extension),
      None => {
        target.extensions.insert(name.clone(), extension.clone());
      }
    }
  }

  target
    .variables
    .extend(source.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
  target
    .framework_properties
    .extend(source.framework_properties.iter().map(|(k, v)| (k.clone(), v.clone())));
}

fn merge_extension(target: &mut Extension, source: &Extension) {
  match (&mut target.content, &source.content) {
    (ExtensionContent::ArtifactList(existing), ExtensionContent::ArtifactList(added)) => {
      for artifact in added {
        existing.insert(artifact.clone());
      }
      target.state = source.state;
    }
    _ => *target = source.clone(),
  }
}
