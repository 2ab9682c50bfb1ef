//! Dependency scanning: extracting import requests from module source.
//!
//! The scanner is regex-based: it recognizes ES static imports, side-effect
//! imports, dynamic `import()`, and CommonJS `require()`. It does not parse
//! the language, so requests inside comments or strings are picked up too.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a dependency was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyKind {
  /// `import ... from '...'` or `import '...'`.
  Import,
  /// Dynamic `import('...')`, which roots an async chunk.
  DynamicImport,
  /// `require('...')`.
  Require,
}

/// Byte range of the request string within the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
  pub start: usize,
  pub end: usize,
}

/// A single import request found in a module's source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
  pub request: String,
  pub kind: DependencyKind,
  pub span: Span,
}

static STATIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
  // `import defaultExport from '...'`, `import { a, b } from '...'`,
  // `import * as ns from '...'`, and side-effect `import '...'`.
  Regex::new(r#"import\s+(?:[\w$*\s{},]+\s+from\s+)?["']([^"']+)["']"#).unwrap()
});

static DYNAMIC_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"import\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap());

static REQUIRE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"require\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap());

/// Scan module source for import requests.
///
/// Results are ordered by position in the source. A request imported both
/// statically and dynamically yields two entries with different kinds.
pub fn scan_dependencies(source: &str) -> Vec<Dependency> {
  let mut deps = Vec::new();

  for (regex, kind) in [
    (&*STATIC_IMPORT, DependencyKind::Import),
    (&*DYNAMIC_IMPORT, DependencyKind::DynamicImport),
    (&*REQUIRE, DependencyKind::Require),
  ] {
    for cap in regex.captures_iter(source) {
      if let Some(request) = cap.get(1) {
        deps.push(Dependency {
          request: request.as_str().to_string(),
          kind,
          span: Span {
            start: request.start(),
            end: request.end(),
          },
        });
      }
    }
  }

  deps.sort_by_key(|d| d.span.start);
  deps
}

#[cfg(test)]
mod tests {
  use super::*;

  fn requests(source: &str) -> Vec<(String, DependencyKind)> {
    scan_dependencies(source)
      .into_iter()
      .map(|d| (d.request, d.kind))
      .collect()
  }

  #[test]
  fn scans_named_import() {
    let deps = requests(r#"import { helper } from './helper.js';"#);
    assert_eq!(deps, vec![("./helper.js".to_string(), DependencyKind::Import)]);
  }

  #[test]
  fn scans_default_and_namespace_imports() {
    let deps = requests(
      r#"
      import util from './util';
      import * as math from './math';
      "#,
    );
    assert_eq!(
      deps,
      vec![
        ("./util".to_string(), DependencyKind::Import),
        ("./math".to_string(), DependencyKind::Import),
      ]
    );
  }

  #[test]
  fn scans_side_effect_import() {
    let deps = requests(r#"import './polyfill';"#);
    assert_eq!(deps, vec![("./polyfill".to_string(), DependencyKind::Import)]);
  }

  #[test]
  fn scans_dynamic_import() {
    let deps = requests(r#"const page = await import('./page');"#);
    assert_eq!(deps, vec![("./page".to_string(), DependencyKind::DynamicImport)]);
  }

  #[test]
  fn scans_require() {
    let deps = requests(r#"const fs = require("./shim");"#);
    assert_eq!(deps, vec![("./shim".to_string(), DependencyKind::Require)]);
  }

  #[test]
  fn results_are_ordered_by_position() {
    let deps = requests(
      r#"
      import a from './a';
      const b = require('./b');
      import('./c');
      "#,
    );
    assert_eq!(
      deps,
      vec![
        ("./a".to_string(), DependencyKind::Import),
        ("./b".to_string(), DependencyKind::Require),
        ("./c".to_string(), DependencyKind::DynamicImport),
      ]
    );
  }

  #[test]
  fn span_points_at_the_request() {
    let source = r#"import { x } from './x';"#;
    let deps = scan_dependencies(source);
    assert_eq!(&source[deps[0].span.start..deps[0].span.end], "./x");
  }

  #[test]
  fn no_imports_yields_empty() {
    assert!(scan_dependencies("const x = 1;").is_empty());
  }
}
