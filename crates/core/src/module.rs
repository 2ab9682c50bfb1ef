//! Module records: one per source file in the dependency graph.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dependency::Dependency;

/// Stable identifier of a module within a compilation.
///
/// The id is the canonical path of the source file, which makes it unique per
/// compilation and stable across runs on the same tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub String);

impl std::fmt::Display for ModuleId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl ModuleId {
  pub fn from_path(path: &Path) -> Self {
    ModuleId(path.display().to_string())
  }
}

/// Kind of a module, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleType {
  JavaScript,
  TypeScript,
  Json,
  Css,
  Asset,
}

impl ModuleType {
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("js") => ModuleType::JavaScript,
      Some("ts") => ModuleType::TypeScript,
      Some("json") => ModuleType::Json,
      Some("css") => ModuleType::Css,
      _ => ModuleType::Asset,
    }
  }
}

/// A source file after loader transformation, with its scanned dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
  pub id: ModuleId,
  pub path: PathBuf,
  /// Content after the matching loader ran.
  pub content: String,
  pub module_type: ModuleType,
  pub dependencies: Vec<Dependency>,
  /// Map from raw request string to the module id it resolved to. Filled in
  /// during graph construction and consumed by code generation.
  pub resolved: BTreeMap<String, ModuleId>,
  pub is_entry: bool,
}

impl Module {
  pub fn new(id: ModuleId, path: PathBuf, content: String, is_entry: bool) -> Self {
    let module_type = ModuleType::from_path(&path);
    Self {
      id,
      path,
      content,
      module_type,
      dependencies: Vec::new(),
      resolved: BTreeMap::new(),
      is_entry,
    }
  }
}
