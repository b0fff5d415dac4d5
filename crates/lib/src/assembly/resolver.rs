//! Reference resolution for the merger.
//!
//! A [`ReferenceResolver`] is bound to the module and scope whose feature is
//! being assembled. Lookups go, in order, to:
//!
//! 1. the module's own features (assembled first, raw features assembled on
//!    demand; test lookups fall back to main)
//! 2. another reactor module owning the identity, processed first
//! 3. the external repository
//!
//! An identity that is requested while it is already being resolved is a
//! cycle: the request is answered with "not found" and a diagnostic.

use tracing::{debug, trace};

use super::coordinator::AssemblyCoordinator;
use super::session::{BuildSession, InFlight};
use super::types::{AssemblyError, Diagnostic};
use crate::feature::Feature;
use crate::identity::{Identity, ModuleKey};
use crate::merge::FeatureProvider;
use crate::store::Scope;

pub struct ReferenceResolver<'a, 's> {
  coordinator: &'s AssemblyCoordinator<'a>,
  session: &'s mut BuildSession,
  in_flight: &'s mut InFlight,
  module: ModuleKey,
  scope: Scope,
}

impl<'a, 's> ReferenceResolver<'a, 's> {
  pub(crate) fn new(
    coordinator: &'s AssemblyCoordinator<'a>,
    session: &'s mut BuildSession,
    in_flight: &'s mut InFlight,
    module: ModuleKey,
    scope: Scope,
  ) -> Self {
    Self {
      coordinator,
      session,
      in_flight,
      module,
      scope,
    }
  }

  pub fn module(&self) -> &ModuleKey {
    &self.module
  }

  pub fn scope(&self) -> Scope {
    self.scope
  }

  /// A resolver for another module or scope sharing this build and in-flight set.
  fn rebind(&mut self, module: ModuleKey, scope: Scope) -> ReferenceResolver<'a, '_> {
    ReferenceResolver::new(self.coordinator, &mut *self.session, &mut *self.in_flight, module, scope)
  }

  /// Process `module` in `scope` with `id` released from the in-flight set, so
  /// sibling features referencing `id` are not taken for a cycle. A real cycle
  /// through `id` still hits the entry the coordinator holds while assembling it.
  fn process_released(&mut self, id: &Identity, module: &ModuleKey, scope: Scope) -> Result<(), AssemblyError> {
    self.in_flight.leave(id);
    let result = self.coordinator.process_in(self.session, self.in_flight, module, scope);
    self.in_flight.enter(id);
    result
  }

  fn dispatch(&mut self, id: &Identity) -> Result<Option<Feature>, AssemblyError> {
    let owner = id.module_key();

    if owner == self.module {
      let found = self.lookup_local(id)?;
      if found.is_none() {
        self.session.report(Diagnostic::not_found(&self.module, id));
      }
      return Ok(found);
    }

    if self.session.reactor().contains(&owner) {
      debug!(module = %self.module, owner = %owner, id = %id, "resolving feature from reactor module");
      let scope = self.scope;
      self.process_released(id, &owner, scope)?;
      let found = self.rebind(owner, scope).lookup_local(id)?;
      if found.is_none() {
        self.session.report(Diagnostic::not_found(&self.module, id));
      }
      return Ok(found);
    }

    debug!(module = %self.module, id = %id, "resolving feature from external repository");
    match self.coordinator.loader().load(id) {
      Ok(feature) => Ok(Some(feature)),
      Err(e) if e.is_not_found() => {
        self.session.report(Diagnostic::not_found(&self.module, id));
        Ok(None)
      }
      Err(e) => Err(AssemblyError::ExternalResolution {
        id: id.clone(),
        source: e,
      }),
    }
  }

  /// Look `id` up among the features of the bound module.
  fn lookup_local(&mut self, id: &Identity) -> Result<Option<Feature>, AssemblyError> {
    let scopes: &[Scope] = match self.scope {
      Scope::Main => &[Scope::Main],
      Scope::Test => &[Scope::Test, Scope::Main],
    };

    for &scope in scopes {
      if scope != self.scope {
        let module = self.module.clone();
        self.process_released(id, &module, scope)?;
      }

      let store = self.session.store_mut(&self.module);
      if let Some((_, feature)) = store.find_assembled(scope, id) {
        trace!(module = %self.module, scope = %scope, id = %id, "found assembled feature");
        return Ok(Some(feature.clone()));
      }

      let Some((location, raw)) = store.find_raw(scope, id) else {
        continue;
      };
      let (location, raw) = (location.to_string(), raw.clone());

      debug!(module = %self.module, scope = %scope, location, id = %id, "assembling feature on demand");
      let module = self.module.clone();
      let merger = self.coordinator.merger();
      let assembled = merger.assemble(&raw, &mut self.rebind(module, scope))?;
      let stored = self
        .session
        .store_mut(&self.module)
        .insert_assembled(scope, &location, assembled);
      return Ok(Some(stored.clone()));
    }

    Ok(None)
  }
}

impl FeatureProvider for ReferenceResolver<'_, '_> {
  fn provide(&mut self, id: &Identity) -> Result<Option<Feature>, AssemblyError> {
    if !self.in_flight.enter(id) {
      self.session.report(Diagnostic::cycle(&self.module, id));
      return Ok(None);
    }

    let result = self.dispatch(id);
    self.in_flight.leave(id);

    if let Ok(Some(_)) = &result
      && !id.is_owned_by(&self.module)
    {
      self.session.record_reference(&self.module, id);
    }
    result
  }
}
