//! Loader transforms and rule matching.
//!
//! A loader rewrites a matched source file's contents before it enters the
//! dependency graph. Rules from the config are compiled once into a
//! `RuleSet`; the first rule whose `test` matches a path (and whose `exclude`
//! does not) selects the loader.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::config::ModuleConfig;
use crate::error::{BundleError, Result};

/// Loader identifiers with a built-in implementation. `useLoader` values in
/// the config are validated against this set.
pub const BUILTIN_LOADERS: &[&str] = &["javascript", "typescript", "json"];

/// A transform applied to a matched source file's contents.
#[async_trait]
pub trait Loader: Send + Sync {
  async fn transform(&self, source: &str, path: &Path) -> Result<String>;
  fn name(&self) -> &str;
}

/// Registry of loaders keyed by identifier.
pub struct LoaderRegistry {
  loaders: HashMap<String, Box<dyn Loader>>,
}

impl Default for LoaderRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl LoaderRegistry {
  /// Create a registry with the built-in loaders registered.
  pub fn new() -> Self {
    let mut registry = Self {
      loaders: HashMap::new(),
    };
    registry.register(Box::new(JavaScriptLoader));
    registry.register(Box::new(TypeScriptLoader));
    registry.register(Box::new(JsonLoader));
    registry
  }

  pub fn register(&mut self, loader: Box<dyn Loader>) {
    self.loaders.insert(loader.name().to_string(), loader);
  }

  /// Run the named loader over a file's contents.
  pub async fn transform(&self, name: &str, source: &str, path: &Path) -> Result<String> {
    match self.loaders.get(name) {
      Some(loader) => loader.transform(source, path).await,
      None => Err(BundleError::LoaderNotFound(name.to_string())),
    }
  }
}

/// Identity transform for plain JavaScript.
pub struct JavaScriptLoader;

#[async_trait]
impl Loader for JavaScriptLoader {
  async fn transform(&self, source: &str, _path: &Path) -> Result<String> {
    Ok(source.to_string())
  }

  fn name(&self) -> &str {
    "javascript"
  }
}

/// Line-level type annotation stripper.
///
/// Not a TypeScript compiler: it removes simple `: type` annotations so that
/// straightforward TS sources run as JS. Generic or structural annotations
/// pass through untouched.
pub struct TypeScriptLoader;

static TYPE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\s*[A-Za-z_$][\w$]*(\[\])?").unwrap());

#[async_trait]
impl Loader for TypeScriptLoader {
  async fn transform(&self, source: &str, _path: &Path) -> Result<String> {
    let stripped = source
      .lines()
      .map(|line| TYPE_ANNOTATION.replace_all(line, "").into_owned())
      .collect::<Vec<_>>()
      .join("\n");
    Ok(stripped)
  }

  fn name(&self) -> &str {
    "typescript"
  }
}

/// Wraps a JSON document as an ES module with a default export.
pub struct JsonLoader;

#[async_trait]
impl Loader for JsonLoader {
  async fn transform(&self, source: &str, path: &Path) -> Result<String> {
    // Reject malformed JSON here rather than emitting a broken bundle.
    serde_json::from_str::<serde_json::Value>(source).map_err(|e| BundleError::Parse {
      file: path.to_path_buf(),
      message: e.to_string(),
    })?;
    Ok(format!("export default {};", source.trim_end()))
  }

  fn name(&self) -> &str {
    "json"
  }
}

/// A rule with its patterns compiled.
#[derive(Debug)]
struct CompiledRule {
  test: Regex,
  exclude: Option<Regex>,
  loader: String,
}

/// Config rules compiled for repeated matching.
#[derive(Debug)]
pub struct RuleSet {
  rules: Vec<CompiledRule>,
}

impl RuleSet {
  /// Compile every rule's `test` and `exclude` pattern.
  ///
  /// Validated configs cannot fail here; the `Result` covers direct callers
  /// with unvalidated `ModuleConfig` values.
  pub fn compile(config: &ModuleConfig) -> Result<Self> {
    let mut rules = Vec::with_capacity(config.rules.len());

    for (i, rule) in config.rules.iter().enumerate() {
      let test = Regex::new(&rule.test).map_err(|e| {
        BundleError::config(format!("module.rules[{}].test", i), format!("invalid pattern: {}", e))
      })?;
      let exclude = rule
        .exclude
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|e| {
          BundleError::config(
            format!("module.rules[{}].exclude", i),
            format!("invalid pattern: {}", e),
          )
        })?;
      rules.push(CompiledRule {
        test,
        exclude,
        loader: rule.use_loader.clone(),
      });
    }

    Ok(Self { rules })
  }

  /// Loader for a path, from the first rule that matches. `None` means the
  /// file passes through untransformed.
  pub fn loader_for(&self, path: &Path) -> Option<&str> {
    let haystack = path.to_string_lossy();

    self
      .rules
      .iter()
      .find(|rule| {
        rule.test.is_match(&haystack) && !rule.exclude.as_ref().is_some_and(|ex| ex.is_match(&haystack))
      })
      .map(|rule| rule.loader.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Rule;

  fn rule(test: &str, loader: &str, exclude: Option<&str>) -> Rule {
    Rule {
      test: test.to_string(),
      use_loader: loader.to_string(),
      exclude: exclude.map(str::to_string),
    }
  }

  fn rule_set(rules: Vec<Rule>) -> RuleSet {
    RuleSet::compile(&ModuleConfig { rules }).unwrap()
  }

  #[test]
  fn first_matching_rule_wins() {
    let rules = rule_set(vec![
      rule(r"\.special\.js$", "json", None),
      rule(r"\.js$", "javascript", None),
    ]);
    assert_eq!(rules.loader_for(Path::new("a.special.js")), Some("json"));
    assert_eq!(rules.loader_for(Path::new("a.js")), Some("javascript"));
  }

  #[test]
  fn exclude_suppresses_a_match() {
    let rules = rule_set(vec![rule(r"\.js$", "javascript", Some("node_modules"))]);
    assert_eq!(rules.loader_for(Path::new("src/app.js")), Some("javascript"));
    assert_eq!(rules.loader_for(Path::new("node_modules/dep/index.js")), None);
  }

  #[test]
  fn unmatched_path_has_no_loader() {
    let rules = rule_set(vec![rule(r"\.js$", "javascript", None)]);
    assert_eq!(rules.loader_for(Path::new("style.css")), None);
  }

  #[tokio::test]
  async fn unknown_loader_name_errors() {
    let registry = LoaderRegistry::new();
    let err = registry
      .transform("coffeescript", "x", Path::new("a.coffee"))
      .await
      .unwrap_err();
    assert!(matches!(err, BundleError::LoaderNotFound(_)));
  }

  #[tokio::test]
  async fn typescript_loader_strips_annotations() {
    let registry = LoaderRegistry::new();
    let out = registry
      .transform(
        "typescript",
        "function add(a: number, b: number) { return a + b; }",
        Path::new("math.ts"),
      )
      .await
      .unwrap();
    assert_eq!(out, "function add(a, b) { return a + b; }");
  }

  #[tokio::test]
  async fn json_loader_wraps_as_default_export() {
    let registry = LoaderRegistry::new();
    let out = registry
      .transform("json", r#"{"name": "pkg"}"#, Path::new("package.json"))
      .await
      .unwrap();
    assert_eq!(out, r#"export default {"name": "pkg"};"#);
  }

  #[tokio::test]
  async fn json_loader_rejects_malformed_json() {
    let registry = LoaderRegistry::new();
    let err = registry
      .transform("json", "{not json", Path::new("bad.json"))
      .await
      .unwrap_err();
    assert!(matches!(err, BundleError::Parse { .. }));
  }

  #[test]
  fn compile_reports_bad_pattern_with_rule_index() {
    let err = RuleSet::compile(&ModuleConfig {
      rules: vec![rule("[unclosed", "javascript", None)],
    })
    .unwrap_err();
    assert!(err.to_string().contains("module.rules[0].test"));
  }
}
