//! Classifier uniqueness across scopes.

use fab_lib::assembly::{AssemblyConfig, AssemblyCoordinator, AssemblyError, DiagnosticKind};
use fab_lib::loader::MemoryLoader;
use fab_lib::reactor::Module;
use fab_lib::source::MemorySource;
use fab_lib::store::Scope;
use fab_lib::validate::ClassifierError;

use super::common::{CountingMerger, feature, key, session};

fn module() -> Module {
  Module::new("g", "app", "1").with_packaging("feature")
}

fn run(source: &MemorySource, scope: Scope) -> (Result<(), AssemblyError>, usize, usize) {
  let merger = CountingMerger::new();
  let loader = MemoryLoader::new();
  let coordinator = AssemblyCoordinator::new(&merger, &loader, source, AssemblyConfig::default());
  let mut session = session(vec![module()]);
  let result = coordinator.process(&mut session, &key("g:app"), scope);
  let diagnostics = session.count(DiagnosticKind::DuplicateClassifier);
  (result, diagnostics, merger.total())
}

#[test]
fn two_unclassified_main_features_are_fatal() {
  let source = MemorySource::new()
    .with_feature(&key("g:app"), Scope::Main, "a.json", feature("g:app:feature:1"))
    .with_feature(&key("g:app"), Scope::Main, "b.json", feature("g:app:feature:1"));

  let (result, diagnostics, merged) = run(&source, Scope::Main);

  match result.unwrap_err() {
    AssemblyError::Classifier(ClassifierError::MultipleUnclassified { locations, .. }) => {
      assert_eq!(locations, vec!["a.json", "b.json"]);
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(diagnostics, 1);
  assert_eq!(merged, 0, "validation runs before assembly");
}

#[test]
fn unclassified_features_in_main_and_test_coexist() {
  let source = MemorySource::new()
    .with_feature(&key("g:app"), Scope::Main, "main.json", feature("g:app:feature:1"))
    .with_feature(&key("g:app"), Scope::Test, "test.json", feature("g:app:feature:1"));

  let (result, diagnostics, merged) = run(&source, Scope::Test);

  result.unwrap();
  assert_eq!(diagnostics, 0);
  assert_eq!(merged, 2);
}

#[test]
fn classifier_shared_by_main_and_test_is_fatal() {
  let source = MemorySource::new()
    .with_feature(&key("g:app"), Scope::Main, "main.json", feature("g:app:feature:it:1"))
    .with_feature(&key("g:app"), Scope::Test, "test.json", feature("g:app:feature:it:1"));

  let (result, diagnostics, _) = run(&source, Scope::Test);

  match result.unwrap_err() {
    AssemblyError::Classifier(ClassifierError::DuplicateClassifier {
      classifier, locations, ..
    }) => {
      assert_eq!(classifier, "it");
      assert_eq!(locations, vec!["main.json", "test.json"]);
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(diagnostics, 1);
}

#[test]
fn validate_checks_without_assembling() {
  let source = MemorySource::new()
    .with_feature(&key("g:app"), Scope::Main, "a.json", feature("g:app:feature:web:1"))
    .with_feature(&key("g:app"), Scope::Main, "b.json", feature("g:app:feature:web:1"));
  let merger = CountingMerger::new();
  let loader = MemoryLoader::new();
  let coordinator = AssemblyCoordinator::new(&merger, &loader, &source, AssemblyConfig::default());

  let err = coordinator.validate(&module()).unwrap_err();

  assert!(matches!(
    err,
    AssemblyError::Classifier(ClassifierError::DuplicateClassifier { .. })
  ));
  assert_eq!(merger.total(), 0);
}
