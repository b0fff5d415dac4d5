//! Implementation of the `fab validate` command.

use std::path::Path;

use anyhow::{Context, Result, bail};

use fab_lib::assembly::AssemblyCoordinator;
use fab_lib::loader::RepositoryLoader;
use fab_lib::merge::PrototypeMerger;
use fab_lib::reactor::ReactorManifest;
use fab_lib::source::DirectorySource;

use crate::output::{Status, print_status};

/// Load the raw features of every module and check their classifiers.
///
/// Every module is checked; the command fails if any of them is invalid.
pub fn cmd_validate(manifest_path: &Path) -> Result<()> {
  let manifest = ReactorManifest::load(manifest_path)
    .with_context(|| format!("Failed to load reactor manifest: {}", manifest_path.display()))?;
  let reactor = manifest.reactor().context("Invalid reactor")?;

  let loader = match &manifest.repository {
    Some(root) => RepositoryLoader::with_path(root.clone()),
    None => RepositoryLoader::new(),
  };
  let merger = PrototypeMerger::new();
  let source = DirectorySource::new();
  let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, manifest.config.clone());

  let mut failures = 0;
  for module in reactor.modules() {
    match coordinator.validate(module) {
      Ok(()) => print_status(Status::Done, &module.key().to_string()),
      Err(e) => {
        failures += 1;
        print_status(Status::Failed, &format!("{}: {}", module.key(), e));
      }
    }
  }

  if failures > 0 {
    bail!("{} module(s) failed validation", failures);
  }
  Ok(())
}
