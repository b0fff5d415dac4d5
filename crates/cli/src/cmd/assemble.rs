//! Implementation of the `fab assemble` command.
//!
//! Loads the reactor manifest, assembles every module (main, then test) in
//! build order and optionally writes the assembled features to an output
//! directory:
//!
//! ```text
//! <out>/<group>/<name>/<scope>/<path below the scope's feature dir>
//! <out>/<group>/<name>/<scope>/aggregate-<classifier>.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use fab_lib::assembly::{AssemblyCoordinator, BuildSession, Diagnostic};
use fab_lib::consts::{AGGREGATE_KEY_PREFIX, FEATURE_FILE_EXT};
use fab_lib::loader::{ExternalArtifactLoader, RepositoryLoader};
use fab_lib::merge::PrototypeMerger;
use fab_lib::reactor::{Module, ReactorManifest};
use fab_lib::source::DirectorySource;
use fab_lib::store::Scope;
use fab_lib::util::hash::Hashable;

use crate::output::{
  OutputFormat, Status, format_duration, print_added_dependency, print_diagnostic, print_feature, print_json,
  print_module_heading, print_stat, print_status,
};

pub struct AssembleOptions {
  pub manifest: PathBuf,
  pub out: Option<PathBuf>,
  pub attach_packaged_unit: bool,
  pub skip_dependencies: bool,
  pub locate: bool,
}

#[derive(Debug, Serialize)]
struct AssembleSummary {
  modules: Vec<ModuleSummary>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  missing_artifacts: Vec<String>,
  diagnostics: Vec<Diagnostic>,
  #[serde(skip_serializing_if = "Option::is_none")]
  out: Option<PathBuf>,
  elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
struct ModuleSummary {
  module: String,
  features: Vec<FeatureSummary>,
  added_dependencies: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FeatureSummary {
  scope: Scope,
  key: String,
  id: String,
  digest: String,
}

pub fn cmd_assemble(options: &AssembleOptions, format: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let manifest = ReactorManifest::load(&options.manifest)
    .with_context(|| format!("Failed to load reactor manifest: {}", options.manifest.display()))?;

  let mut config = manifest.config.clone();
  config.attach_packaged_unit |= options.attach_packaged_unit;
  config.skip_dependency_augmentation |= options.skip_dependencies;

  let loader = match &manifest.repository {
    Some(root) => RepositoryLoader::with_path(root.clone()),
    None => RepositoryLoader::new(),
  };
  debug!(repository = %loader.root().display(), "using repository");

  let merger = PrototypeMerger::new();
  let source = DirectorySource::new();
  let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, config);
  let mut session = BuildSession::new(manifest.reactor().context("Invalid reactor")?);

  coordinator.process_all(&mut session).context("Assembly failed")?;

  let out = match &options.out {
    Some(out) => {
      write_features(&session, out)?;
      Some(dunce::canonicalize(out).unwrap_or_else(|_| out.clone()))
    }
    None => None,
  };

  let missing_artifacts = if options.locate {
    locate_external(&session, &loader)?
  } else {
    Vec::new()
  };

  let summary = AssembleSummary {
    modules: summarize_modules(&manifest, &session)?,
    missing_artifacts,
    diagnostics: session.diagnostics().to_vec(),
    out,
    elapsed_ms: start.elapsed().as_millis(),
  };

  if format.is_json() {
    print_json(&summary)?;
  } else {
    print_summary(&summary, start);
  }

  Ok(())
}

fn summarize_modules(manifest: &ReactorManifest, session: &BuildSession) -> Result<Vec<ModuleSummary>> {
  let mut modules = Vec::new();

  for module in session.reactor().modules() {
    let key = module.key();
    let mut features = Vec::new();
    if let Some(store) = session.store(&key) {
      for scope in Scope::ALL {
        for (location, feature) in store.assembled(scope) {
          let digest = feature
            .compute_hash()
            .with_context(|| format!("Failed to compute digest of {}", feature.id))?;
          features.push(FeatureSummary {
            scope,
            key: location.clone(),
            id: feature.id.to_string(),
            digest: digest.0,
          });
        }
      }
    }

    let declared = manifest
      .modules
      .iter()
      .find(|m| m.key() == key)
      .map(|m| m.dependencies.as_slice())
      .unwrap_or_default();
    let added_dependencies = module
      .dependencies
      .iter()
      .filter(|d| !declared.contains(d))
      .map(|d| d.id.to_string())
      .collect();

    modules.push(ModuleSummary {
      module: key.to_string(),
      features,
      added_dependencies,
    });
  }

  Ok(modules)
}

fn locate_external(session: &BuildSession, loader: &RepositoryLoader) -> Result<Vec<String>> {
  let mut missing = Vec::new();
  for id in session.external_artifacts() {
    match loader.locate(&id) {
      Ok(path) => debug!(id = %id, path = %path.display(), "located artifact"),
      Err(e) if e.is_not_found() => missing.push(id.to_string()),
      Err(e) => return Err(e).with_context(|| format!("Failed to locate artifact {}", id)),
    }
  }
  Ok(missing)
}

fn write_features(session: &BuildSession, out: &Path) -> Result<()> {
  for module in session.reactor().modules() {
    let Some(store) = session.store(&module.key()) else {
      continue;
    };
    for scope in Scope::ALL {
      for (location, feature) in store.assembled(scope) {
        let path = feature_path(out, module, scope, location);
        if let Some(parent) = path.parent() {
          fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(feature).context("Failed to serialize feature")?;
        fs::write(&path, json).with_context(|| format!("Failed to write feature: {}", path.display()))?;
        debug!(id = %feature.id, path = %path.display(), "wrote assembled feature");
      }
    }
  }
  Ok(())
}

fn feature_path(out: &Path, module: &Module, scope: Scope, location: &str) -> PathBuf {
  let dir = out.join(&module.group).join(&module.name).join(scope.as_str());
  if let Some(classifier) = location.strip_prefix(AGGREGATE_KEY_PREFIX) {
    return dir.join(format!("aggregate-{}.{}", classifier, FEATURE_FILE_EXT));
  }
  let relative = location
    .strip_prefix(scope.features_dir())
    .map(|r| r.trim_start_matches('/'))
    .unwrap_or(location);
  relative.split('/').fold(dir, |path, segment| path.join(segment))
}

fn print_summary(summary: &AssembleSummary, start: Instant) {
  let total: usize = summary.modules.iter().map(|m| m.features.len()).sum();
  print_status(
    Status::Done,
    &format!("Assembled {} feature(s) in {} module(s)", total, summary.modules.len()),
  );

  for module in &summary.modules {
    if module.features.is_empty() && module.added_dependencies.is_empty() {
      continue;
    }
    print_module_heading(&module.module);
    for feature in &module.features {
      print_feature(feature.scope, &feature.id, &feature.digest);
    }
    for dependency in &module.added_dependencies {
      print_added_dependency(dependency);
    }
  }

  for diagnostic in &summary.diagnostics {
    print_diagnostic(diagnostic);
  }
  for id in &summary.missing_artifacts {
    print_status(Status::Warning, &format!("Artifact {} not found in repository", id));
  }

  println!();
  if let Some(out) = &summary.out {
    print_stat("Written to", &out.display().to_string());
  }
  if summary.modules.is_empty() {
    print_status(Status::Note, "Reactor declares no modules");
  }
  print_stat("Duration", &format_duration(start.elapsed()));
}
