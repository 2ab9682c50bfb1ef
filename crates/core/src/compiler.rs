//! Compilation: graph construction and code generation.
//!
//! The compiler walks the dependency graph from the configured entry, runs
//! each file through its matching loader, resolves every import request, and
//! renders one asset per chunk. Emitted assets use a CommonJS-style runtime:
//! every chunk registers its module factories in one registry shared through
//! `globalThis`, so `__bindery_require__` can reach any module no matter
//! which chunk carried it. Dynamic imports go through `__bindery_load__`,
//! which pulls the chunk asset in first when its modules are not registered
//! yet.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::LazyLock;

use bindery_resolver::Resolver;
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::chunk::{Chunk, ChunkKind, assign_chunks, chunk_filename};
use crate::config::{Config, Mode};
use crate::dependency::scan_dependencies;
use crate::error::Result;
use crate::graph::ModuleGraph;
use crate::loader::{LoaderRegistry, RuleSet};
use crate::module::{Module, ModuleId};

/// Everything a compilation produced.
#[derive(Debug)]
pub struct CompilationResult {
  pub chunks: Vec<Chunk>,
  /// Asset filename to rendered content, in deterministic order.
  pub assets: BTreeMap<String, String>,
  /// All modules in the graph, in topological order.
  pub modules: Vec<ModuleId>,
}

pub struct Compiler {
  config: Config,
  rules: RuleSet,
  loaders: LoaderRegistry,
  resolver: Resolver,
}

impl Compiler {
  pub fn new(config: Config) -> Result<Self> {
    let rules = RuleSet::compile(&config.module)?;
    let resolver = Resolver::new()
      .with_extensions(config.resolve.extensions.clone())
      .with_alias(config.resolve.alias.clone());

    Ok(Self {
      config,
      rules,
      loaders: LoaderRegistry::new(),
      resolver,
    })
  }

  pub async fn compile(&self) -> Result<CompilationResult> {
    info!(entry = %self.config.entry, "starting compilation");

    let graph = self.build_graph().await?;
    graph.ensure_acyclic()?;

    let chunks = assign_chunks(&graph)?;
    let assets = self.render_assets(&chunks, &graph);
    let modules = graph.topological_order()?;

    info!(
      modules = modules.len(),
      chunks = chunks.len(),
      assets = assets.len(),
      "compilation finished"
    );

    Ok(CompilationResult { chunks, assets, modules })
  }

  /// Walk the import graph from the entry, loading and transforming each
  /// file once.
  async fn build_graph(&self) -> Result<ModuleGraph> {
    let mut graph = ModuleGraph::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut stack: Vec<(PathBuf, bool)> = vec![(PathBuf::from(&self.config.entry), true)];

    while let Some((path, is_entry)) = stack.pop() {
      let canonical = tokio::fs::canonicalize(&path).await?;
      if !visited.insert(canonical.clone()) {
        continue;
      }

      let raw = tokio::fs::read_to_string(&canonical).await?;
      let source = match self.rules.loader_for(&canonical) {
        Some(name) => {
          debug!(path = %canonical.display(), loader = name, "transforming");
          self.loaders.transform(name, &raw, &canonical).await?
        }
        None => raw,
      };

      let id = ModuleId::from_path(&canonical);
      let mut module = Module::new(id.clone(), canonical.clone(), source, is_entry);

      for dep in scan_dependencies(&module.content) {
        let resolved = self.resolver.resolve(&dep.request, &canonical).await?;
        let dep_id = ModuleId::from_path(&resolved);

        graph.add_dependency(&id, &dep_id, dep.kind);
        module.resolved.insert(dep.request.clone(), dep_id);
        module.dependencies.push(dep);
        stack.push((resolved, false));
      }

      debug!(id = %id, deps = module.dependencies.len(), "module loaded");
      graph.add_module(module);
    }

    Ok(graph)
  }

  fn render_assets(&self, chunks: &[Chunk], graph: &ModuleGraph) -> BTreeMap<String, String> {
    // Filenames first: dynamic import rewrites need to name the asset that
    // carries the target module.
    let mut filenames = Vec::with_capacity(chunks.len());
    let mut async_assets: BTreeMap<ModuleId, String> = BTreeMap::new();

    for chunk in chunks {
      let template = match chunk.kind {
        ChunkKind::Entry => &self.config.output.filename,
        ChunkKind::Async => &self.config.output.chunk_filename,
      };
      let filename = chunk_filename(template, &chunk.name);
      if chunk.kind == ChunkKind::Async {
        async_assets.insert(chunk.entry.clone(), filename.clone());
      }
      filenames.push(filename);
    }

    let mut assets = BTreeMap::new();
    for (chunk, filename) in chunks.iter().zip(filenames) {
      assets.insert(filename, self.render_chunk(chunk, graph, &async_assets));
    }

    assets
  }

  /// Render one chunk: the shared-registry runtime plus a factory per module.
  ///
  /// The registry and the module cache live on `globalThis`, so every chunk
  /// loaded into the same environment feeds the same `__bindery_require__`.
  /// Async chunks only register their factories; the entry chunk kicks off
  /// execution.
  fn render_chunk(
    &self,
    chunk: &Chunk,
    graph: &ModuleGraph,
    async_assets: &BTreeMap<ModuleId, String>,
  ) -> String {
    let mut out = String::new();

    out.push_str("(function (global) {\n");
    out.push_str("  var registry = (global.__bindery_modules__ = global.__bindery_modules__ || {});\n");
    out.push_str("  var cache = (global.__bindery_cache__ = global.__bindery_cache__ || {});\n");
    out.push_str("  function __bindery_require__(id) {\n");
    out.push_str("    if (cache[id]) {\n");
    out.push_str("      return cache[id].exports;\n");
    out.push_str("    }\n");
    out.push_str("    var module = (cache[id] = { id: id, exports: {} });\n");
    out.push_str(
      "    registry[id].call(module.exports, module, module.exports, __bindery_require__, __bindery_load__);\n",
    );
    out.push_str("    return module.exports;\n");
    out.push_str("  }\n");
    out.push_str("  function __bindery_load__(asset, id) {\n");
    out.push_str("    if (registry[id]) {\n");
    out.push_str("      return Promise.resolve(__bindery_require__(id));\n");
    out.push_str("    }\n");
    out.push_str("    if (typeof require === \"function\" && typeof __dirname !== \"undefined\") {\n");
    out.push_str("      require(require(\"path\").join(__dirname, asset));\n");
    out.push_str("      return Promise.resolve(__bindery_require__(id));\n");
    out.push_str("    }\n");
    out.push_str("    return new Promise(function (resolve, reject) {\n");
    out.push_str("      var script = document.createElement(\"script\");\n");
    out.push_str("      script.src = asset;\n");
    out.push_str("      script.onload = function () { resolve(__bindery_require__(id)); };\n");
    out.push_str("      script.onerror = reject;\n");
    out.push_str("      document.head.appendChild(script);\n");
    out.push_str("    });\n");
    out.push_str("  }\n");

    for id in &chunk.modules {
      let Some(module) = graph.module(id) else {
        continue;
      };

      if self.config.mode == Mode::Development {
        out.push_str(&format!("  // module: {}\n", id));
      }
      out.push_str(&format!(
        "  registry[{}] = function (module, exports, __bindery_require__, __bindery_load__) {{\n",
        js_string(&id.0)
      ));
      out.push_str(&rewrite_module(module, async_assets));
      out.push_str("\n  };\n");
    }

    if chunk.kind == ChunkKind::Entry {
      out.push_str(&format!("  return __bindery_require__({});\n", js_string(&chunk.entry.0)));
    }
    out.push_str("})(typeof globalThis !== \"undefined\" ? globalThis : this);\n");
    out
  }
}

/// JSON-escape a string for embedding in generated JavaScript.
fn js_string(s: &str) -> String {
  serde_json::Value::String(s.to_string()).to_string()
}

static NAMED_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"import\s*\{([^}]*)\}\s*from\s*["']([^"']+)["']\s*;?"#).unwrap());

static NAMESPACE_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"import\s*\*\s*as\s+([\w$]+)\s+from\s*["']([^"']+)["']\s*;?"#).unwrap());

static DEFAULT_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"import\s+([\w$]+)\s+from\s*["']([^"']+)["']\s*;?"#).unwrap());

static SIDE_EFFECT_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"import\s*["']([^"']+)["']\s*;?"#).unwrap());

static DYNAMIC_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"import\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap());

static REQUIRE_CALL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"require\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap());

static EXPORT_DECL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"export\s+(function|const|let|var|class)\s+([\w$]+)").unwrap());

static EXPORT_DEFAULT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"export\s+default\s+").unwrap());

/// Rewrite ES module syntax in a module's source to runtime calls.
///
/// Import requests are replaced with the module ids they resolved to, so the
/// generated factory registry and the runtime lookups always agree. Dynamic
/// imports whose target roots an async chunk go through `__bindery_load__`
/// with that chunk's asset name. Exported declarations keep their definition
/// in place; the `exports` assignments are appended at the end of the
/// factory body.
fn rewrite_module(module: &Module, async_assets: &BTreeMap<ModuleId, String>) -> String {
  let resolve = |request: &str| -> String {
    match module.resolved.get(request) {
      Some(id) => js_string(&id.0),
      None => js_string(request),
    }
  };

  let mut source = module.content.clone();

  source = NAMED_IMPORT
    .replace_all(&source, |caps: &Captures| {
      format!("const {{{}}} = __bindery_require__({});", &caps[1], resolve(&caps[2]))
    })
    .into_owned();

  source = NAMESPACE_IMPORT
    .replace_all(&source, |caps: &Captures| {
      format!("const {} = __bindery_require__({});", &caps[1], resolve(&caps[2]))
    })
    .into_owned();

  source = DEFAULT_IMPORT
    .replace_all(&source, |caps: &Captures| {
      format!("const {} = __bindery_require__({}).default;", &caps[1], resolve(&caps[2]))
    })
    .into_owned();

  source = SIDE_EFFECT_IMPORT
    .replace_all(&source, |caps: &Captures| {
      format!("__bindery_require__({});", resolve(&caps[1]))
    })
    .into_owned();

  source = DYNAMIC_IMPORT
    .replace_all(&source, |caps: &Captures| {
      if let Some(id) = module.resolved.get(&caps[1])
        && let Some(asset) = async_assets.get(id)
      {
        return format!("__bindery_load__({}, {})", js_string(asset), js_string(&id.0));
      }
      format!("Promise.resolve(__bindery_require__({}))", resolve(&caps[1]))
    })
    .into_owned();

  source = REQUIRE_CALL
    .replace_all(&source, |caps: &Captures| {
      format!("__bindery_require__({})", resolve(&caps[1]))
    })
    .into_owned();

  let exported: Vec<String> = EXPORT_DECL
    .captures_iter(&source)
    .map(|caps| caps[2].to_string())
    .collect();

  source = EXPORT_DECL.replace_all(&source, "$1 $2").into_owned();
  source = EXPORT_DEFAULT.replace_all(&source, "module.exports.default = ").into_owned();

  for name in exported {
    source.push_str(&format!("\nmodule.exports.{} = {};", name, name));
  }

  source
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use std::path::Path;
  use tempfile::TempDir;

  fn write(temp: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = temp.path().join(name);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
  }

  fn config_for(entry: &Path) -> Config {
    Config::default().with_entry(entry.to_str().unwrap())
  }

  #[tokio::test]
  async fn compiles_entry_with_named_import() {
    let temp = TempDir::new().unwrap();
    let entry = write(
      &temp,
      "index.js",
      "import { helper } from './helper.js';\nhelper();\n",
    );
    write(&temp, "helper.js", "export function helper() { return 1; }\n");

    let compiler = Compiler::new(config_for(&entry)).unwrap();
    let result = compiler.compile().await.unwrap();

    assert_eq!(result.modules.len(), 2);
    assert_eq!(result.chunks.len(), 1);

    let bundle = &result.assets["bundle.js"];
    assert!(bundle.contains("__bindery_require__"));
    assert!(bundle.contains("module.exports.helper = helper;"));
    // The import was rewritten to the resolved module id, not the raw request.
    assert!(!bundle.contains("from './helper.js'"));
  }

  #[tokio::test]
  async fn unresolved_import_fails_the_compilation() {
    let temp = TempDir::new().unwrap();
    let entry = write(&temp, "index.js", "import { gone } from './missing';\n");

    let compiler = Compiler::new(config_for(&entry)).unwrap();
    let err = compiler.compile().await.unwrap_err();
    assert!(err.to_string().contains("./missing"));
  }

  #[tokio::test]
  async fn dynamic_import_emits_a_chunk_asset() {
    let temp = TempDir::new().unwrap();
    let entry = write(&temp, "index.js", "import('./page.js');\n");
    write(&temp, "page.js", "export const title = 'page';\n");

    let compiler = Compiler::new(config_for(&entry)).unwrap();
    let result = compiler.compile().await.unwrap();

    assert_eq!(result.chunks.len(), 2);
    assert!(result.assets.contains_key("bundle.js"));
    // Named via the chunkFilename template.
    assert!(result.assets.contains_key("page.chunk.js"));
    assert!(result.assets["page.chunk.js"].contains("module.exports.title"));

    // The entry pulls the chunk asset in through the loader, and both sides
    // share one registry.
    let bundle = &result.assets["bundle.js"];
    assert!(bundle.contains(r#"__bindery_load__("page.chunk.js","#));
    assert!(bundle.contains("global.__bindery_modules__"));
    assert!(result.assets["page.chunk.js"].contains("global.__bindery_modules__"));
  }

  #[tokio::test]
  async fn typescript_rule_strips_annotations_before_emission() {
    let temp = TempDir::new().unwrap();
    let entry = write(&temp, "index.js", "import { add } from './math';\nadd(1, 2);\n");
    write(&temp, "math.ts", "export function add(a: number, b: number) { return a + b; }\n");

    let compiler = Compiler::new(config_for(&entry)).unwrap();
    let result = compiler.compile().await.unwrap();

    let bundle = &result.assets["bundle.js"];
    assert!(bundle.contains("function add(a, b)"));
    assert!(!bundle.contains(": number"));
  }

  #[tokio::test]
  async fn json_import_becomes_default_export() {
    let temp = TempDir::new().unwrap();
    let entry = write(&temp, "index.js", "import pkg from './pkg.json';\n");
    write(&temp, "pkg.json", r#"{"name": "demo"}"#);

    let compiler = Compiler::new(config_for(&entry)).unwrap();
    let result = compiler.compile().await.unwrap();

    let bundle = &result.assets["bundle.js"];
    assert!(bundle.contains(r#"module.exports.default = {"name": "demo"};"#));
    assert!(bundle.contains(".default;"));
  }

  #[tokio::test]
  async fn development_mode_emits_module_banners() {
    let temp = TempDir::new().unwrap();
    let entry = write(&temp, "index.js", "const x = 1;\n");

    let mut config = config_for(&entry);
    config.mode = Mode::Development;
    let dev = Compiler::new(config.clone()).unwrap().compile().await.unwrap();
    assert!(dev.assets["bundle.js"].contains("// module:"));

    config.mode = Mode::Production;
    let prod = Compiler::new(config).unwrap().compile().await.unwrap();
    assert!(!prod.assets["bundle.js"].contains("// module:"));
  }

  #[tokio::test]
  async fn circular_imports_are_rejected() {
    let temp = TempDir::new().unwrap();
    let entry = write(&temp, "a.js", "import { b } from './b.js';\nexport const a = 1;\n");
    write(&temp, "b.js", "import { a } from './a.js';\nexport const b = 2;\n");

    let compiler = Compiler::new(config_for(&entry)).unwrap();
    let err = compiler.compile().await.unwrap_err();
    assert!(err.to_string().contains("circular dependency"));
  }

  #[test]
  fn rewrite_handles_export_forms() {
    let module = Module::new(
      ModuleId("m".to_string()),
      PathBuf::from("m.js"),
      concat!(
        "export function f() {}\n",
        "export const value = 3;\n",
        "export default f;\n",
      )
      .to_string(),
      false,
    );

    let out = rewrite_module(&module, &BTreeMap::new());
    assert!(out.contains("function f() {}"));
    assert!(out.contains("const value = 3;"));
    assert!(out.contains("module.exports.default = f;"));
    assert!(out.contains("module.exports.f = f;"));
    assert!(out.contains("module.exports.value = value;"));
    assert!(!out.contains("export "));
  }

  #[test]
  fn rewrite_routes_dynamic_imports_through_the_chunk_loader() {
    let mut module = Module::new(
      ModuleId("entry".to_string()),
      PathBuf::from("entry.js"),
      "import('./page.js');\nimport('./shared.js');\n".to_string(),
      true,
    );
    module
      .resolved
      .insert("./page.js".to_string(), ModuleId("page".to_string()));
    module
      .resolved
      .insert("./shared.js".to_string(), ModuleId("shared".to_string()));

    let mut async_assets = BTreeMap::new();
    async_assets.insert(ModuleId("page".to_string()), "page.chunk.js".to_string());

    let out = rewrite_module(&module, &async_assets);
    // A target that roots an async chunk loads that chunk's asset first.
    assert!(out.contains(r#"__bindery_load__("page.chunk.js", "page")"#));
    // A target already carried by the current chunk resolves in place.
    assert!(out.contains(r#"Promise.resolve(__bindery_require__("shared"))"#));
  }
}
