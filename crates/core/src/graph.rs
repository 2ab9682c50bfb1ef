//! Module graph: dependency edges between modules, cycle detection, and
//! deterministic ordering for emission.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::dependency::DependencyKind;
use crate::error::{BundleError, Result};
use crate::module::{Module, ModuleId};

/// Directed graph of modules.
///
/// Edges run from dependency to dependent, so a topological ordering yields
/// dependencies before the modules that import them. Edge weights record how
/// the dependency was requested; dynamic imports are excluded from static
/// closures during chunk assignment.
#[derive(Debug, Default)]
pub struct ModuleGraph {
  graph: DiGraph<ModuleId, DependencyKind>,
  nodes: HashMap<ModuleId, NodeIndex>,
  modules: HashMap<ModuleId, Module>,
  /// Insertion order, for deterministic iteration.
  order: Vec<ModuleId>,
}

impl ModuleGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Intern a node for the id, creating it if absent.
  fn ensure_node(&mut self, id: &ModuleId) -> NodeIndex {
    if let Some(&idx) = self.nodes.get(id) {
      return idx;
    }
    let idx = self.graph.add_node(id.clone());
    self.nodes.insert(id.clone(), idx);
    idx
  }

  /// Attach a module record to the graph.
  pub fn add_module(&mut self, module: Module) {
    self.ensure_node(&module.id);
    if !self.modules.contains_key(&module.id) {
      self.order.push(module.id.clone());
    }
    self.modules.insert(module.id.clone(), module);
  }

  /// Record that `importer` depends on `imported`.
  ///
  /// Either endpoint may be added before its module record exists; the node
  /// is interned on demand.
  pub fn add_dependency(&mut self, importer: &ModuleId, imported: &ModuleId, kind: DependencyKind) {
    let importer_idx = self.ensure_node(importer);
    let imported_idx = self.ensure_node(imported);
    // Edge from dependency to dependent.
    self.graph.add_edge(imported_idx, importer_idx, kind);
  }

  pub fn module(&self, id: &ModuleId) -> Option<&Module> {
    self.modules.get(id)
  }

  /// Modules in insertion order.
  pub fn modules(&self) -> impl Iterator<Item = &Module> {
    self.order.iter().filter_map(|id| self.modules.get(id))
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  pub fn entry_modules(&self) -> Vec<&Module> {
    self.modules().filter(|m| m.is_entry).collect()
  }

  /// Direct dependencies of a module, optionally restricted to static edges.
  pub fn dependencies_of(&self, id: &ModuleId, static_only: bool) -> Vec<ModuleId> {
    let Some(&idx) = self.nodes.get(id) else {
      return Vec::new();
    };

    let mut deps: Vec<ModuleId> = self
      .graph
      .edges_directed(idx, Direction::Incoming)
      .filter(|edge| !static_only || *edge.weight() != DependencyKind::DynamicImport)
      .map(|edge| self.graph[edge.source()].clone())
      .collect();

    deps.sort();
    deps.dedup();
    deps
  }

  /// All targets of dynamic-import edges, in deterministic order.
  pub fn dynamic_targets(&self) -> Vec<ModuleId> {
    let mut targets: Vec<ModuleId> = self
      .graph
      .edge_indices()
      .filter(|&e| self.graph[e] == DependencyKind::DynamicImport)
      .filter_map(|e| self.graph.edge_endpoints(e))
      .map(|(source, _)| self.graph[source].clone())
      .collect();

    targets.sort();
    targets.dedup();
    targets
  }

  /// Fail if the graph contains an import cycle.
  ///
  /// The error lists the modules participating in one strongly connected
  /// component of the cycle.
  pub fn ensure_acyclic(&self) -> Result<()> {
    if toposort(&self.graph, None).is_ok() {
      return Ok(());
    }

    let cycle = tarjan_scc(&self.graph)
      .into_iter()
      .find(|scc| scc.len() > 1 || scc.iter().any(|&n| self.graph.find_edge(n, n).is_some()))
      .unwrap_or_default();

    let mut modules: Vec<ModuleId> = cycle.into_iter().map(|idx| self.graph[idx].clone()).collect();
    modules.sort();

    Err(BundleError::CircularDependency { modules })
  }

  /// Module ids in topological order: dependencies before dependents.
  pub fn topological_order(&self) -> Result<Vec<ModuleId>> {
    match toposort(&self.graph, None) {
      Ok(sorted) => Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect()),
      Err(_) => {
        self.ensure_acyclic()?;
        Ok(Vec::new())
      }
    }
  }
}
