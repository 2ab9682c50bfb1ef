//! Chunk assignment: splitting the module graph into output bundles.
//!
//! One entry chunk holds the static-import closure of the entry module. Each
//! dynamic `import()` target roots an async chunk holding whatever part of
//! its own static closure the entry chunk does not already cover.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::ModuleGraph;
use crate::module::ModuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkKind {
  Entry,
  Async,
}

/// An output bundle: a named group of modules with a designated entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
  pub id: String,
  pub name: String,
  pub kind: ChunkKind,
  /// Member modules in topological order (dependencies first).
  pub modules: Vec<ModuleId>,
  /// The module the chunk's runtime starts from.
  pub entry: ModuleId,
}

/// Expand `[name]` in a filename template.
pub fn chunk_filename(template: &str, name: &str) -> String {
  template.replace("[name]", name)
}

/// Static-import closure of a root module.
fn static_closure(graph: &ModuleGraph, root: &ModuleId) -> BTreeSet<ModuleId> {
  let mut closure = BTreeSet::new();
  let mut stack = vec![root.clone()];

  while let Some(id) = stack.pop() {
    if !closure.insert(id.clone()) {
      continue;
    }
    for dep in graph.dependencies_of(&id, true) {
      stack.push(dep);
    }
  }

  closure
}

/// Derive a chunk name from a module path, e.g. `/src/pages/about.js` -> `about`.
fn chunk_name_for(graph: &ModuleGraph, id: &ModuleId) -> String {
  graph
    .module(id)
    .and_then(|m| m.path.file_stem())
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| "chunk".to_string())
}

/// Assign every reachable module to a chunk.
///
/// Assignment is deterministic: chunk member lists follow the graph's
/// topological order, and async chunks are created in sorted order of their
/// root module ids. Modules already claimed by the entry chunk are not
/// duplicated into async chunks.
pub fn assign_chunks(graph: &ModuleGraph) -> Result<Vec<Chunk>> {
  let topo = graph.topological_order()?;
  let mut chunks = Vec::new();

  let Some(entry) = graph.entry_modules().first().map(|m| m.id.clone()) else {
    return Ok(chunks);
  };

  let entry_set = static_closure(graph, &entry);
  chunks.push(Chunk {
    id: "main".to_string(),
    name: "main".to_string(),
    kind: ChunkKind::Entry,
    modules: topo.iter().filter(|id| entry_set.contains(id)).cloned().collect(),
    entry: entry.clone(),
  });

  let mut used_names = BTreeSet::from(["main".to_string()]);

  for root in graph.dynamic_targets() {
    let closure = static_closure(graph, &root);
    let modules: Vec<ModuleId> = topo
      .iter()
      .filter(|id| closure.contains(id) && !entry_set.contains(id))
      .cloned()
      .collect();

    if modules.is_empty() {
      // Entire closure already lives in the entry chunk.
      continue;
    }

    let base = chunk_name_for(graph, &root);
    let mut name = base.clone();
    let mut counter = 1;
    while !used_names.insert(name.clone()) {
      name = format!("{}_{}", base, counter);
      counter += 1;
    }

    chunks.push(Chunk {
      id: name.clone(),
      name,
      kind: ChunkKind::Async,
      modules,
      entry: root,
    });
  }

  Ok(chunks)
}
