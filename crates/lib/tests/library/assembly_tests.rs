//! Assembly across modules, scopes and the external repository.

use fab_lib::assembly::{AssemblyConfig, AssemblyCoordinator, AssemblyError, DiagnosticKind};
use fab_lib::feature::Artifact;
use fab_lib::loader::MemoryLoader;
use fab_lib::reactor::{Dependency, Module};
use fab_lib::source::MemorySource;
use fab_lib::store::Scope;

use super::common::{CountingMerger, derived, feature, id, key, session};

fn app() -> Module {
  Module::new("org.example", "app", "1.0").with_packaging("feature")
}

fn base() -> Module {
  Module::new("org.example", "base", "1.0").with_packaging("feature")
}

mod reactor_references {
  use super::*;

  #[test]
  fn owner_module_is_processed_exactly_once() {
    let source = MemorySource::new()
      .with_feature(
        &key("org.example:app"),
        Scope::Main,
        "a.json",
        derived("org.example:app:feature:1.0", "org.example:base:feature:1.0"),
      )
      .with_feature(
        &key("org.example:app"),
        Scope::Main,
        "b.json",
        derived("org.example:app:feature:web:1.0", "org.example:base:feature:1.0"),
      )
      .with_feature(
        &key("org.example:base"),
        Scope::Main,
        "base.json",
        feature("org.example:base:feature:1.0"),
      );
    let merger = CountingMerger::new();
    let loader = MemoryLoader::new();
    let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
    let mut session = session(vec![app(), base()]);

    coordinator
      .process(&mut session, &key("org.example:app"), Scope::Main)
      .unwrap();

    let base_loads = source
      .loads()
      .into_iter()
      .filter(|(module, _)| *module == key("org.example:base"))
      .count();
    assert_eq!(base_loads, 1);
    assert_eq!(merger.count("org.example:base:feature:1.0"), 1);
    assert!(loader.calls().is_empty());
    assert!(
      session
        .store(&key("org.example:base"))
        .unwrap()
        .is_processed(Scope::Main)
    );
  }

  #[test]
  fn test_scope_reference_falls_back_to_owner_main() {
    let source = MemorySource::new()
      .with_feature(
        &key("org.example:app"),
        Scope::Test,
        "it.json",
        derived("org.example:app:feature:it:1.0", "org.example:base:feature:1.0"),
      )
      .with_feature(
        &key("org.example:base"),
        Scope::Main,
        "base.json",
        feature("org.example:base:feature:1.0"),
      );
    let merger = CountingMerger::new();
    let loader = MemoryLoader::new();
    let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
    let mut session = session(vec![app(), base()]);

    coordinator
      .process(&mut session, &key("org.example:app"), Scope::Test)
      .unwrap();

    let base_store = session.store(&key("org.example:base")).unwrap();
    assert!(base_store.is_processed(Scope::Main));
    assert!(base_store.is_processed(Scope::Test));
    assert!(loader.calls().is_empty());
    assert!(session.diagnostics().is_empty());
  }

  #[test]
  fn cross_module_cycle_is_reported_once() {
    let source = MemorySource::new()
      .with_feature(
        &key("org.example:app"),
        Scope::Main,
        "a.json",
        derived("org.example:app:feature:1.0", "org.example:base:feature:1.0"),
      )
      .with_feature(
        &key("org.example:base"),
        Scope::Main,
        "b.json",
        derived("org.example:base:feature:1.0", "org.example:app:feature:1.0"),
      );
    let merger = CountingMerger::new();
    let loader = MemoryLoader::new();
    let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
    let mut session = session(vec![app(), base()]);

    let err = coordinator
      .process(&mut session, &key("org.example:app"), Scope::Main)
      .unwrap_err();

    assert!(matches!(err, AssemblyError::UnresolvedReference { .. }));
    assert_eq!(session.count(DiagnosticKind::CycleDetected), 1);
    assert!(loader.calls().is_empty());
  }

  #[test]
  fn shared_prototype_assembles_in_any_module_order() {
    let source = MemorySource::new()
      .with_feature(
        &key("org.example:app"),
        Scope::Main,
        "a.json",
        derived("org.example:app:feature:1.0", "org.example:base:feature:1.0"),
      )
      .with_feature(
        &key("org.example:base"),
        Scope::Main,
        "a-ext.json",
        derived("org.example:base:feature:ext:1.0", "org.example:base:feature:1.0"),
      )
      .with_feature(
        &key("org.example:base"),
        Scope::Main,
        "base.json",
        feature("org.example:base:feature:1.0"),
      );
    let loader = MemoryLoader::new();

    for order in [["org.example:app", "org.example:base"], ["org.example:base", "org.example:app"]] {
      let merger = CountingMerger::new();
      let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
      let mut session = session(vec![app(), base()]);

      for module in order {
        coordinator.process(&mut session, &key(module), Scope::Main).unwrap();
      }

      assert_eq!(session.count(DiagnosticKind::CycleDetected), 0, "order {order:?}");
      assert_eq!(merger.count("org.example:base:feature:1.0"), 1);
      let base_store = session.store(&key("org.example:base")).unwrap();
      assert_eq!(base_store.assembled(Scope::Main).len(), 2);
      assert_eq!(
        session.store(&key("org.example:app")).unwrap().assembled(Scope::Main).len(),
        1
      );
    }
  }

  #[test]
  fn missing_feature_in_owner_module_is_not_found() {
    let source = MemorySource::new().with_feature(
      &key("org.example:app"),
      Scope::Main,
      "a.json",
      derived("org.example:app:feature:1.0", "org.example:base:feature:other:1.0"),
    );
    let merger = CountingMerger::new();
    let loader = MemoryLoader::new();
    let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
    let mut session = session(vec![app(), base()]);

    let err = coordinator
      .process(&mut session, &key("org.example:app"), Scope::Main)
      .unwrap_err();

    match err {
      AssemblyError::UnresolvedReference { feature, reference } => {
        assert_eq!(feature, id("org.example:app:feature:1.0"));
        assert_eq!(reference, id("org.example:base:feature:other:1.0"));
      }
      other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.count(DiagnosticKind::FeatureNotFound), 1);
    assert!(loader.calls().is_empty(), "reactor-owned identities never reach the loader");
  }
}

mod external_references {
  use super::*;

  #[test]
  fn resolves_from_loader() {
    let mut external = feature("org.other:platform:feature:2.0");
    external.bundles.insert(Artifact::new(id("org.other:runtime:2.0")));
    let source = MemorySource::new().with_feature(
      &key("org.example:app"),
      Scope::Main,
      "a.json",
      derived("org.example:app:feature:1.0", "org.other:platform:feature:2.0"),
    );
    let merger = CountingMerger::new();
    let loader = MemoryLoader::new().with_feature(external);
    let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
    let mut session = session(vec![app()]);

    coordinator
      .process(&mut session, &key("org.example:app"), Scope::Main)
      .unwrap();

    let assembled = &session.store(&key("org.example:app")).unwrap().assembled(Scope::Main)["a.json"];
    assert!(assembled.bundles.contains(&id("org.other:runtime:2.0")));
    assert_eq!(loader.calls(), vec![id("org.other:platform:feature:2.0")]);
  }

  #[test]
  fn absent_feature_is_loaded_once_then_fails() {
    let source = MemorySource::new().with_feature(
      &key("org.example:app"),
      Scope::Main,
      "a.json",
      derived("org.example:app:feature:1.0", "org.other:missing:feature:1.0"),
    );
    let merger = CountingMerger::new();
    let loader = MemoryLoader::new();
    let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
    let mut session = session(vec![app()]);

    let err = coordinator
      .process(&mut session, &key("org.example:app"), Scope::Main)
      .unwrap_err();

    assert!(matches!(err, AssemblyError::UnresolvedReference { .. }));
    assert_eq!(loader.calls(), vec![id("org.other:missing:feature:1.0")]);
    assert_eq!(session.count(DiagnosticKind::FeatureNotFound), 1);
  }
}

mod dependencies {
  use super::*;

  fn fixture() -> MemorySource {
    let mut app_feature = derived("org.example:app:feature:1.0", "org.example:base:feature:1.0");
    app_feature.bundles.insert(Artifact::new(id("org.other:http:3.1")));
    app_feature
      .bundles
      .insert(Artifact::new(id("org.example:app:bundle:1.0")));
    MemorySource::new()
      .with_feature(&key("org.example:app"), Scope::Main, "a.json", app_feature)
      .with_feature(
        &key("org.example:base"),
        Scope::Main,
        "base.json",
        feature("org.example:base:feature:1.0"),
      )
  }

  #[test]
  fn referenced_artifacts_and_features_become_dependencies() {
    let source = fixture();
    let merger = CountingMerger::new();
    let loader = MemoryLoader::new();
    let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
    let mut session = session(vec![app(), base()]);

    coordinator.process_all(&mut session).unwrap();
    coordinator.process_all(&mut session).unwrap();

    let module = session.reactor().get(&key("org.example:app")).unwrap();
    assert_eq!(
      module.dependencies,
      vec![
        Dependency {
          id: id("org.other:http:3.1"),
          scope: "provided".to_string(),
        },
        Dependency {
          id: id("org.example:base:feature:1.0"),
          scope: "provided".to_string(),
        },
      ]
    );
    assert_eq!(merger.total(), 2);
  }

  #[test]
  fn augmentation_can_be_disabled() {
    let source = fixture();
    let merger = CountingMerger::new();
    let loader = MemoryLoader::new();
    let config = AssemblyConfig {
      skip_dependency_augmentation: true,
      ..AssemblyConfig::default()
    };
    let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, config);
    let mut session = session(vec![app(), base()]);

    coordinator.process_all(&mut session).unwrap();

    assert!(
      session
        .reactor()
        .modules()
        .iter()
        .all(|m| m.dependencies.is_empty())
    );
  }
}

#[test]
fn process_all_follows_build_order() {
  let source = MemorySource::new()
    .with_feature(
      &key("org.example:app"),
      Scope::Main,
      "a.json",
      feature("org.example:app:feature:1.0"),
    )
    .with_feature(
      &key("org.example:base"),
      Scope::Main,
      "base.json",
      feature("org.example:base:feature:1.0"),
    );
  let merger = CountingMerger::new();
  let loader = MemoryLoader::new();
  let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());
  let mut session = session(vec![app().depending_on(key("org.example:base")), base()]);

  coordinator.process_all(&mut session).unwrap();

  let order: Vec<String> = source
    .loads()
    .into_iter()
    .map(|(module, scope)| format!("{module}/{scope}"))
    .collect();
  assert_eq!(
    order,
    vec![
      "org.example:base/main",
      "org.example:base/test",
      "org.example:app/main",
      "org.example:app/test",
    ]
  );
}
