//! Import specifier resolution for bindery.
//!
//! Turns a request string such as `./helper` into a concrete file path using
//! alias rewriting, an ordered extension search, and directory index lookup.
//! Extension order is precedence: given `[".js", ".ts"]`, a request that
//! could resolve to either file resolves to the `.js` one.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

/// Errors that can occur during module resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// No file matched the request from the given context.
  #[error("module not found: {request} (imported from {context})")]
  NotFound { request: String, context: String },

  /// I/O error while probing the filesystem.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Default extension search order when no configuration is supplied.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".ts", ".json"];

/// Resolves import requests to canonical file paths.
///
/// A resolver is cheap to construct and holds no filesystem state; every
/// `resolve` call probes the filesystem directly.
#[derive(Debug, Clone)]
pub struct Resolver {
  extensions: Vec<String>,
  alias: BTreeMap<String, String>,
}

impl Default for Resolver {
  fn default() -> Self {
    Self::new()
  }
}

impl Resolver {
  /// Create a resolver with the default extension order and no aliases.
  pub fn new() -> Self {
    Self {
      extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
      alias: BTreeMap::new(),
    }
  }

  /// Replace the extension search order.
  pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
    self.extensions = extensions;
    self
  }

  /// Replace the alias table.
  pub fn with_alias(mut self, alias: BTreeMap<String, String>) -> Self {
    self.alias = alias;
    self
  }

  /// Resolve a request string relative to the importing file.
  ///
  /// `context` is the path of the module doing the import (a file), or a
  /// directory to resolve against. Resolution proceeds as:
  ///
  /// 1. alias rewriting (longest matching prefix, path-boundary aware)
  /// 2. exact path probe
  /// 3. extension probing in configured order (the extension is appended,
  ///    never substituted, so `./a.spec` can resolve to `a.spec.js`)
  /// 4. directory index probe (`index` + each extension in order)
  ///
  /// The returned path is canonicalized.
  pub async fn resolve(&self, request: &str, context: &Path) -> Result<PathBuf> {
    let request = self.apply_alias(request);

    let context_dir = if is_file(context).await {
      context.parent().unwrap_or(context)
    } else {
      context
    };

    let candidate = context_dir.join(request.as_ref());
    trace!(request = %request, candidate = %candidate.display(), "resolving");

    // Exact match wins over any extension probing.
    if is_file(&candidate).await {
      return Ok(tokio::fs::canonicalize(&candidate).await?);
    }

    // Append each extension in order. The first hit wins.
    for ext in &self.extensions {
      let with_ext = append_extension(&candidate, ext);
      if is_file(&with_ext).await {
        return Ok(tokio::fs::canonicalize(&with_ext).await?);
      }
    }

    // Directory import: probe for an index file.
    if is_dir(&candidate).await {
      for ext in &self.extensions {
        let index = candidate.join(format!("index{}", ext));
        if is_file(&index).await {
          return Ok(tokio::fs::canonicalize(&index).await?);
        }
      }
    }

    Err(ResolveError::NotFound {
      request: request.into_owned(),
      context: context.display().to_string(),
    })
  }

  /// Rewrite a request through the alias table.
  ///
  /// The longest alias key that matches wins. A key matches the request
  /// exactly or at a path boundary: alias `lib` rewrites `lib` and `lib/x`
  /// but not `library`.
  fn apply_alias<'a>(&self, request: &'a str) -> std::borrow::Cow<'a, str> {
    let mut best: Option<(&str, &str)> = None;

    for (key, target) in &self.alias {
      let matches = request == key || request.strip_prefix(key).is_some_and(|rest| rest.starts_with('/'));
      if matches && best.is_none_or(|(k, _)| key.len() > k.len()) {
        best = Some((key, target));
      }
    }

    match best {
      Some((key, target)) => std::borrow::Cow::Owned(format!("{}{}", target, &request[key.len()..])),
      None => std::borrow::Cow::Borrowed(request),
    }
  }
}

/// Append an extension string (including its leading dot) to a path.
///
/// `Path::set_extension` would replace an existing suffix, which breaks
/// requests like `./config.schema` resolving to `config.schema.json`.
fn append_extension(path: &Path, ext: &str) -> PathBuf {
  let mut s: OsString = path.to_path_buf().into_os_string();
  s.push(ext);
  PathBuf::from(s)
}

async fn is_file(path: &Path) -> bool {
  tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
  tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}
