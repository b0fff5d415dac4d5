//! Reactor types: modules, dependencies and the module registry.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;

use petgraph::Direction;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_TYPE, FEATURE_TYPE};
use crate::identity::{Identity, ModuleKey};

/// Errors that can occur when describing or ordering the reactor.
#[derive(Debug, Error)]
pub enum ReactorError {
  #[error("failed to read reactor manifest '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse reactor manifest '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("module {0} is declared more than once")]
  DuplicateModule(ModuleKey),

  #[error("module {module} depends on unknown module {dependency}")]
  UnknownModule { module: ModuleKey, dependency: ModuleKey },

  #[error("module dependency cycle: {}", .modules.iter().map(ModuleKey::as_str).collect::<Vec<_>>().join(" -> "))]
  Cycle { modules: Vec<ModuleKey> },
}

/// A declared build dependency of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
  pub id: Identity,
  pub scope: String,
}

fn default_packaging() -> String {
  DEFAULT_TYPE.to_string()
}

/// One module of the build graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
  pub group: String,
  pub name: String,
  pub version: String,

  /// Packaging of the module's build output (`jar`, `bundle`, `pom`, `feature`, ...).
  #[serde(default = "default_packaging")]
  pub packaging: String,

  /// Module directory. Relative paths are resolved against the manifest.
  #[serde(default)]
  pub dir: PathBuf,

  /// Modules that must be built before this one.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<ModuleKey>,

  /// Declared build dependencies, extended by dependency augmentation.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub dependencies: Vec<Dependency>,
}

impl Module {
  pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
    let name = name.into();
    Self {
      group: group.into(),
      dir: PathBuf::from(&name),
      name,
      version: version.into(),
      packaging: default_packaging(),
      depends_on: Vec::new(),
      dependencies: Vec::new(),
    }
  }

  pub fn with_packaging(mut self, packaging: impl Into<String>) -> Self {
    self.packaging = packaging.into();
    self
  }

  pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.dir = dir.into();
    self
  }

  pub fn depending_on(mut self, module: ModuleKey) -> Self {
    self.depends_on.push(module);
    self
  }

  pub fn key(&self) -> ModuleKey {
    ModuleKey::new(&self.group, &self.name)
  }

  /// Identity of the module's own build output.
  pub fn identity(&self) -> Identity {
    Identity::new(&self.group, &self.name, &self.version).with_type(&self.packaging)
  }

  /// Whether the build produces exactly one packaged unit (a compiled artifact).
  pub fn produces_packaged_unit(&self) -> bool {
    self.packaging != "pom" && self.packaging != FEATURE_TYPE
  }

  /// Add a dependency unless an equivalent entry exists.
  ///
  /// Returns `true` if the dependency was added.
  pub fn ensure_dependency(&mut self, id: &Identity, scope: &str) -> bool {
    if id.is_owned_by(&self.key()) || self.dependencies.iter().any(|d| &d.id == id) {
      return false;
    }
    self.dependencies.push(Dependency {
      id: id.clone(),
      scope: scope.to_string(),
    });
    true
  }
}

/// Sink for dependency augmentation.
pub trait DependencySink {
  /// Ensure `module` declares a dependency on `id`. Idempotent.
  ///
  /// Returns `true` if a dependency was added.
  fn ensure_dependency(&mut self, module: &ModuleKey, id: &Identity, scope: &str) -> bool;
}

/// The set of modules known to one build, addressable by `group:name`.
#[derive(Debug, Clone, Default)]
pub struct Reactor {
  modules: Vec<Module>,
  index: BTreeMap<ModuleKey, usize>,
}

impl Reactor {
  /// Create a reactor from modules in declaration order.
  pub fn new(modules: Vec<Module>) -> Result<Self, ReactorError> {
    let mut index = BTreeMap::new();
    for (pos, module) in modules.iter().enumerate() {
      if index.insert(module.key(), pos).is_some() {
        return Err(ReactorError::DuplicateModule(module.key()));
      }
    }

    for module in &modules {
      for dependency in &module.depends_on {
        if !index.contains_key(dependency) {
          return Err(ReactorError::UnknownModule {
            module: module.key(),
            dependency: dependency.clone(),
          });
        }
      }
    }

    Ok(Self { modules, index })
  }

  pub fn get(&self, key: &ModuleKey) -> Option<&Module> {
    self.index.get(key).map(|&pos| &self.modules[pos])
  }

  fn get_mut(&mut self, key: &ModuleKey) -> Option<&mut Module> {
    self.index.get(key).map(|&pos| &mut self.modules[pos])
  }

  pub fn contains(&self, key: &ModuleKey) -> bool {
    self.index.contains_key(key)
  }

  /// Modules in declaration order.
  pub fn modules(&self) -> &[Module] {
    &self.modules
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  /// Module keys ordered so that `depends_on` targets come first.
  ///
  /// Among modules whose dependencies are satisfied, declaration order wins.
  pub fn build_order(&self) -> Result<Vec<ModuleKey>, ReactorError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..self.modules.len()).map(|pos| graph.add_node(pos)).collect();

    for (pos, module) in self.modules.iter().enumerate() {
      for dependency in &module.depends_on {
        let &dep_pos = self.index.get(dependency).ok_or_else(|| ReactorError::UnknownModule {
          module: module.key(),
          dependency: dependency.clone(),
        })?;
        graph.update_edge(nodes[dep_pos], nodes[pos], ());
      }
    }

    let mut in_degree: Vec<usize> = nodes
      .iter()
      .map(|&idx| graph.neighbors_directed(idx, Direction::Incoming).count())
      .collect();
    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&pos| in_degree[pos] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(pos) = ready.pop_first() {
      order.push(self.modules[pos].key());
      for next in graph.neighbors_directed(nodes[pos], Direction::Outgoing) {
        let next_pos = graph[next];
        in_degree[next_pos] -= 1;
        if in_degree[next_pos] == 0 {
          ready.insert(next_pos);
        }
      }
    }

    if order.len() < nodes.len() {
      // Report the first strongly connected component with more than one member or a self edge.
      let cycle = kosaraju_scc(&graph)
        .into_iter()
        .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .unwrap_or_default();
      let mut members: Vec<usize> = cycle.into_iter().map(|idx| graph[idx]).collect();
      members.sort_unstable();
      return Err(ReactorError::Cycle {
        modules: members.into_iter().map(|pos| self.modules[pos].key()).collect(),
      });
    }

    debug!(order = ?order.iter().map(ModuleKey::as_str).collect::<Vec<_>>(), "computed build order");
    Ok(order)
  }
}

impl DependencySink for Reactor {
  fn ensure_dependency(&mut self, module: &ModuleKey, id: &Identity, scope: &str) -> bool {
    self
      .get_mut(module)
      .is_some_and(|module| module.ensure_dependency(id, scope))
  }
}
