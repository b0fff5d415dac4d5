//! Per-module, per-scope assembly.
//!
//! [`AssemblyCoordinator::process`] runs the following steps for one module
//! scope, at most once per build:
//!
//! 1. load the raw features from the [`FeatureSource`]
//! 2. validate classifiers
//! 3. attach the packaged unit (main scope only)
//! 4. assemble every raw feature not assembled yet, in location order
//! 5. build declared aggregates
//! 6. add referenced artifacts and features to the module dependencies
//!
//! Processing the test scope processes the main scope first.

use tracing::{debug, info, trace};

use super::aggregate::build_aggregates;
use super::resolver::ReferenceResolver;
use super::session::{BuildSession, InFlight};
use super::types::{AssemblyConfig, AssemblyError, Diagnostic, DiagnosticKind};
use crate::feature::Artifact;
use crate::identity::{Identity, ModuleKey};
use crate::loader::ExternalArtifactLoader;
use crate::merge::Merger;
use crate::reactor::{DependencySink, Module};
use crate::source::FeatureSource;
use crate::store::{FeatureMap, Scope, aggregate_key};
use crate::validate::{ClassifierError, validate_classifiers, validate_features};

pub struct AssemblyCoordinator<'a> {
  merger: &'a dyn Merger,
  loader: &'a dyn ExternalArtifactLoader,
  source: &'a dyn FeatureSource,
  config: AssemblyConfig,
}

impl<'a> AssemblyCoordinator<'a> {
  pub fn new(
    merger: &'a dyn Merger,
    loader: &'a dyn ExternalArtifactLoader,
    source: &'a dyn FeatureSource,
    config: AssemblyConfig,
  ) -> Self {
    Self {
      merger,
      loader,
      source,
      config,
    }
  }

  pub fn config(&self) -> &AssemblyConfig {
    &self.config
  }

  pub(crate) fn merger(&self) -> &'a dyn Merger {
    self.merger
  }

  pub(crate) fn loader(&self) -> &'a dyn ExternalArtifactLoader {
    self.loader
  }

  /// Process one module scope. Calling this again for the same module scope
  /// is a no-op.
  pub fn process(&self, session: &mut BuildSession, module: &ModuleKey, scope: Scope) -> Result<(), AssemblyError> {
    let mut in_flight = InFlight::default();
    self.process_in(session, &mut in_flight, module, scope)
  }

  /// Process every module in build order, main scope before test scope.
  pub fn process_all(&self, session: &mut BuildSession) -> Result<(), AssemblyError> {
    let order = session.reactor().build_order()?;
    info!(modules = order.len(), "assembling reactor");
    for key in &order {
      for scope in Scope::ALL {
        self.process(session, key, scope)?;
      }
    }
    Ok(())
  }

  /// Load a module's raw features and check its classifiers without assembling.
  pub fn validate(&self, module: &Module) -> Result<(), AssemblyError> {
    let key = module.key();
    self.check_aggregates(&key)?;
    let main = self.load(module, Scope::Main)?;
    let test = self.load(module, Scope::Test)?;
    self.check_classifiers(&key, &main, &test)?;
    Ok(())
  }

  pub(crate) fn process_in(
    &self,
    session: &mut BuildSession,
    in_flight: &mut InFlight,
    key: &ModuleKey,
    scope: Scope,
  ) -> Result<(), AssemblyError> {
    let module = session
      .reactor()
      .get(key)
      .cloned()
      .ok_or_else(|| AssemblyError::UnknownModule(key.clone()))?;

    if !session.store_mut(key).mark_processed(scope) {
      trace!(module = %key, scope = %scope, "already processed");
      return Ok(());
    }

    if scope == Scope::Test {
      self.process_in(session, in_flight, key, Scope::Main)?;
    }

    info!(module = %key, scope = %scope, "processing module");
    self.check_aggregates(key)?;

    let raw = self.load(&module, scope)?;
    session.store_mut(key).set_raw(scope, raw);

    let checked = {
      let store = session.store_mut(key);
      self.check_classifiers(key, store.raw(Scope::Main), store.raw(Scope::Test))
    };
    if let Err(e) = checked {
      session.report(Diagnostic::classifier(&e));
      return Err(e.into());
    }

    if scope == Scope::Main {
      self.attach_packaged_unit(session, &module)?;
    }

    let locations: Vec<String> = session.store_mut(key).raw(scope).keys().cloned().collect();
    for location in locations {
      let store = session.store_mut(key);
      if store.is_assembled(scope, &location) {
        trace!(module = %key, scope = %scope, location, "already assembled on demand");
        continue;
      }
      let Some(base) = store.raw(scope).get(&location).cloned() else {
        continue;
      };

      let entered = in_flight.enter(&base.id);
      let result = self
        .merger
        .assemble(&base, &mut ReferenceResolver::new(self, session, in_flight, key.clone(), scope));
      if entered {
        in_flight.leave(&base.id);
      }

      session.store_mut(key).insert_assembled(scope, &location, result?);
    }

    build_aggregates(self, session, &module, scope)?;

    if !self.config.skip_dependency_augmentation {
      self.augment_dependencies(session, key, scope);
    }

    let assembled = session.store_mut(key).assembled(scope).len();
    info!(module = %key, scope = %scope, assembled, "processed module");
    Ok(())
  }

  fn load(&self, module: &Module, scope: Scope) -> Result<FeatureMap, AssemblyError> {
    self
      .source
      .load_features(module, scope)
      .map_err(|e| AssemblyError::Source {
        module: module.key(),
        scope,
        source: e,
      })
  }

  /// Aggregates are always classified features.
  fn check_aggregates(&self, key: &ModuleKey) -> Result<(), AssemblyError> {
    let declared = self.config.aggregates.get(key).into_iter().flatten();
    if declared.into_iter().any(|decl| decl.classifier.is_empty()) {
      return Err(AssemblyError::UnclassifiedAggregate { module: key.clone() });
    }
    Ok(())
  }

  /// Check each scope on its own, then main together with the classified
  /// test features and the declared aggregates.
  fn check_classifiers(&self, key: &ModuleKey, main: &FeatureMap, test: &FeatureMap) -> Result<(), ClassifierError> {
    validate_features(key, main)?;
    validate_features(key, test)?;

    let aggregates: Vec<(String, &str)> = self
      .config
      .aggregates
      .get(key)
      .into_iter()
      .flatten()
      .map(|decl| (aggregate_key(&decl.classifier), decl.classifier.as_str()))
      .collect();

    let entries = main
      .iter()
      .map(|(location, f)| (location.as_str(), f.classifier()))
      .chain(
        test
          .iter()
          .filter_map(|(location, f)| f.classifier().map(|c| (location.as_str(), Some(c)))),
      )
      .chain(aggregates.iter().map(|(k, c)| (k.as_str(), Some(*c))));
    validate_classifiers(key, entries)
  }

  fn attach_packaged_unit(&self, session: &mut BuildSession, module: &Module) -> Result<(), AssemblyError> {
    if !self.config.attach_packaged_unit || !module.produces_packaged_unit() {
      return Ok(());
    }

    let key = module.key();
    let raw = session.store_mut(&key).raw_mut(Scope::Main);
    if raw.len() > 1 {
      let locations: Vec<String> = raw.keys().cloned().collect();
      session.report(Diagnostic::new(
        DiagnosticKind::AmbiguousPackagedUnit,
        &key,
        locations.join(", "),
      ));
      return Err(AssemblyError::AmbiguousPackagedUnitTarget { module: key, locations });
    }

    let Some(feature) = raw.values_mut().next() else {
      debug!(module = %key, "no feature to attach the packaged unit to");
      return Ok(());
    };

    let type_ = self.config.packaged_unit_type.as_deref().unwrap_or(&module.packaging);
    let mut artifact = Artifact::new(Identity::new(&module.group, &module.name, &module.version).with_type(type_));
    if let Some(start_order) = self.config.packaged_unit_start_order {
      artifact = artifact.with_start_order(start_order);
    }

    info!(module = %key, feature = %feature.id, artifact = %artifact.id, "attaching packaged unit");
    feature.bundles.insert(artifact);
    Ok(())
  }

  fn augment_dependencies(&self, session: &mut BuildSession, key: &ModuleKey, scope: Scope) {
    let store = session.store_mut(key);
    let mut ids: Vec<Identity> = store
      .assembled(scope)
      .values()
      .flat_map(|f| f.referenced_artifacts())
      .cloned()
      .collect();
    ids.extend(session.references(key).cloned());

    let dependency_scope = &self.config.dependency_scope;
    let reactor = session.reactor_mut();
    for id in &ids {
      if reactor.ensure_dependency(key, id, dependency_scope) {
        debug!(module = %key, dependency = %id, scope = %dependency_scope, "added dependency");
      }
    }
  }
}
