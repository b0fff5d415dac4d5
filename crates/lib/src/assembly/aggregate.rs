//! Aggregate features: several assembled features of one module scope merged
//! into one new classified feature.

use tracing::debug;

use super::coordinator::AssemblyCoordinator;
use super::session::BuildSession;
use super::types::AssemblyError;
use crate::consts::FEATURE_TYPE;
use crate::feature::Feature;
use crate::identity::Identity;
use crate::reactor::Module;
use crate::store::{Scope, aggregate_key, is_aggregate_key};

pub(crate) fn build_aggregates(
  coordinator: &AssemblyCoordinator<'_>,
  session: &mut BuildSession,
  module: &Module,
  scope: Scope,
) -> Result<(), AssemblyError> {
  let key = module.key();
  let Some(decls) = coordinator.config().aggregates.get(&key) else {
    return Ok(());
  };

  for decl in decls.iter().filter(|d| d.scope == scope) {
    let store = session.store_mut(&key);
    let target = aggregate_key(&decl.classifier);
    if store.is_assembled(scope, &target) {
      continue;
    }

    let parts: Vec<Feature> = store
      .assembled(scope)
      .iter()
      .filter(|(location, f)| !is_aggregate_key(location) && decl.selects(f.classifier()))
      .map(|(_, f)| f.clone())
      .collect();
    if parts.is_empty() {
      return Err(AssemblyError::EmptyAggregate {
        module: key,
        classifier: decl.classifier.clone(),
      });
    }

    let id = Identity::new(&module.group, &module.name, &module.version)
      .with_type(FEATURE_TYPE)
      .with_classifier(&decl.classifier);
    let refs: Vec<&Feature> = parts.iter().collect();
    let aggregate = coordinator.merger().aggregate(id, &refs)?;

    debug!(module = %key, scope = %scope, id = %aggregate.id, parts = parts.len(), "built aggregate");
    store.insert_assembled(scope, &target, aggregate);
  }

  Ok(())
}
