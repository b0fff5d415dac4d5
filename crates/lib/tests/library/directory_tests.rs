//! End-to-end assembly of a reactor read from disk.

use std::path::Path;

use fab_lib::assembly::{AssemblyCoordinator, BuildSession};
use fab_lib::loader::RepositoryLoader;
use fab_lib::merge::PrototypeMerger;
use fab_lib::reactor::ReactorManifest;
use fab_lib::source::DirectorySource;
use fab_lib::store::Scope;
use fab_lib::util::hash::Hashable;
use tempfile::TempDir;

use super::common::{id, key, write};

fn setup(root: &Path) {
  write(
    &root.join("fab.json"),
    r#"{
      "repository": "repo",
      "config": {
        "attach_packaged_unit": true,
        "aggregates": { "org.example:app": [{ "classifier": "all", "includes": ["*"] }] }
      },
      "modules": [
        { "group": "org.example", "name": "app", "version": "1.0", "packaging": "bundle",
          "depends_on": ["org.example:base"] },
        { "group": "org.example", "name": "base", "version": "1.0", "packaging": "feature" }
      ]
    }"#,
  );
  write(
    &root.join("base/src/main/features/base.json"),
    r#"{
      "id": "org.example:base:feature:1.0",
      "prototype": { "id": "org.other:platform:feature:2.0" },
      "bundles": [{ "id": "org.example:util:1.0", "start_order": 10 }]
    }"#,
  );
  write(
    &root.join("app/src/main/features/app.json"),
    r#"{
      "id": "org.example:app:feature:1.0",
      "title": "App",
      "prototype": { "id": "org.example:base:feature:1.0" },
      "variables": { "port": "8080" }
    }"#,
  );
  write(
    &root.join("app/src/test/features/it.json"),
    r#"{
      "id": "org.example:app:feature:it:1.0",
      "prototype": { "id": "org.example:app:feature:1.0" }
    }"#,
  );
  write(
    &root.join("repo/org/other/platform/2.0/platform-2.0.feature"),
    r#"{
      "id": "org.other:platform:feature:2.0",
      "bundles": [{ "id": "org.other:runtime:2.0" }],
      "framework_properties": { "launch": "lazy" }
    }"#,
  );
}

fn assemble(root: &Path) -> BuildSession {
  let manifest = ReactorManifest::load(&root.join("fab.json")).unwrap();
  let loader = RepositoryLoader::with_path(manifest.repository.clone().unwrap());
  let merger = PrototypeMerger::new();
  let source = DirectorySource::new();
  let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, manifest.config.clone());
  let mut session = BuildSession::new(manifest.reactor().unwrap());
  coordinator.process_all(&mut session).unwrap();
  session
}

#[test]
fn assembles_reactor_from_disk() {
  let temp = TempDir::new().unwrap();
  setup(temp.path());

  let session = assemble(temp.path());

  let store = session.store(&key("org.example:app")).unwrap();
  let app = &store.assembled(Scope::Main)["src/main/features/app.json"];
  assert!(app.assembled);
  assert_eq!(app.title.as_deref(), Some("App"));
  assert_eq!(app.variables["port"], "8080");
  assert_eq!(app.framework_properties["launch"], "lazy");
  let bundles: Vec<String> = app.bundles.iter().map(|a| a.id.to_string()).collect();
  assert_eq!(
    bundles,
    vec!["org.other:runtime:2.0", "org.example:util:1.0", "org.example:app:bundle:1.0"]
  );

  let all = &store.assembled(Scope::Main)[":aggregate:all"];
  assert_eq!(all.id, id("org.example:app:feature:all:1.0"));

  let it = &store.assembled(Scope::Test)["src/test/features/it.json"];
  assert_eq!(it.bundles.len(), 3);

  let app_module = session.reactor().get(&key("org.example:app")).unwrap();
  let deps: Vec<String> = app_module.dependencies.iter().map(|d| d.id.to_string()).collect();
  assert!(deps.contains(&"org.example:base:feature:1.0".to_string()));
  assert!(deps.contains(&"org.other:runtime:2.0".to_string()));
  assert!(!deps.contains(&"org.example:app:bundle:1.0".to_string()));

  assert_eq!(
    session.external_artifacts().into_iter().collect::<Vec<_>>(),
    vec![id("org.example:util:1.0"), id("org.other:runtime:2.0")]
  );
}

#[test]
fn assembly_is_deterministic() {
  let temp = TempDir::new().unwrap();
  setup(temp.path());

  let first = assemble(temp.path());
  let second = assemble(temp.path());

  let digest = |session: &BuildSession| {
    let store = session.store(&key("org.example:app")).unwrap();
    store
      .assembled(Scope::Main)
      .values()
      .map(|f| f.compute_hash().unwrap())
      .collect::<Vec<_>>()
  };
  assert_eq!(digest(&first), digest(&second));
  assert!(first.diagnostics().is_empty());
}
