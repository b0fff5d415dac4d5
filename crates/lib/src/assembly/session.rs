//! Per-build state.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{error, warn};

use super::types::{Diagnostic, DiagnosticKind};
use crate::identity::{Identity, ModuleKey};
use crate::reactor::Reactor;
use crate::store::{FeatureStore, Scope, is_aggregate_key};

/// Everything one build knows: the reactor, one [`FeatureStore`] per module,
/// the features each module referenced and the diagnostics reported so far.
///
/// A session is owned by exactly one build. After an [`AssemblyError`](super::AssemblyError)
/// the stores may hold a partially processed module and the session should be
/// discarded.
#[derive(Debug, Default)]
pub struct BuildSession {
  reactor: Reactor,
  stores: BTreeMap<ModuleKey, FeatureStore>,
  references: BTreeMap<ModuleKey, BTreeSet<Identity>>,
  diagnostics: Vec<Diagnostic>,
}

impl BuildSession {
  pub fn new(reactor: Reactor) -> Self {
    let stores = reactor
      .modules()
      .iter()
      .map(|m| (m.key(), FeatureStore::new()))
      .collect();
    Self {
      reactor,
      stores,
      references: BTreeMap::new(),
      diagnostics: Vec::new(),
    }
  }

  pub fn reactor(&self) -> &Reactor {
    &self.reactor
  }

  pub(crate) fn reactor_mut(&mut self) -> &mut Reactor {
    &mut self.reactor
  }

  pub fn store(&self, module: &ModuleKey) -> Option<&FeatureStore> {
    self.stores.get(module)
  }

  pub(crate) fn store_mut(&mut self, module: &ModuleKey) -> &mut FeatureStore {
    self.stores.entry(module.clone()).or_default()
  }

  /// Features of other modules or the external repository referenced while assembling `module`.
  pub fn references(&self, module: &ModuleKey) -> impl Iterator<Item = &Identity> {
    self.references.get(module).into_iter().flatten()
  }

  pub(crate) fn record_reference(&mut self, module: &ModuleKey, id: &Identity) {
    self.references.entry(module.clone()).or_default().insert(id.clone());
  }

  pub fn diagnostics(&self) -> &[Diagnostic] {
    &self.diagnostics
  }

  /// Number of diagnostics of one kind.
  pub fn count(&self, kind: DiagnosticKind) -> usize {
    self.diagnostics.iter().filter(|d| d.kind == kind).count()
  }

  /// Record a diagnostic and emit it as a log event.
  pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
    if diagnostic.kind.is_error() {
      error!(module = %diagnostic.module, kind = ?diagnostic.kind, "{}", diagnostic);
    } else {
      warn!(module = %diagnostic.module, kind = ?diagnostic.kind, "{}", diagnostic);
    }
    self.diagnostics.push(diagnostic);
  }

  /// Bundle identities of all assembled features that no reactor module owns,
  /// i.e. the artifacts the external repository has to provide.
  pub fn external_artifacts(&self) -> BTreeSet<Identity> {
    self
      .stores
      .values()
      .flat_map(|store| Scope::ALL.into_iter().flat_map(move |scope| store.assembled(scope).iter()))
      .filter(|(key, _)| !is_aggregate_key(key))
      .flat_map(|(_, feature)| feature.bundles.iter().map(|a| &a.id))
      .filter(|id| !self.reactor.contains(&id.module_key()))
      .cloned()
      .collect()
  }
}

/// Identities currently being resolved within one top-level `process` call.
#[derive(Debug, Default)]
pub(crate) struct InFlight(BTreeSet<Identity>);

impl InFlight {
  /// Mark `id` as being resolved. Returns `false` if it already was.
  pub(crate) fn enter(&mut self, id: &Identity) -> bool {
    self.0.insert(id.clone())
  }

  pub(crate) fn leave(&mut self, id: &Identity) {
    self.0.remove(id);
  }
}
