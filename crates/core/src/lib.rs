//! bindery-core: the bundling pipeline.
//!
//! This crate provides the pieces a bundle run is made of:
//! - `Config`: the validated build configuration record
//! - `Compiler`: graph construction, loader transforms, and code generation
//! - `ModuleGraph`: dependency edges with cycle detection
//! - `Chunk` assignment: entry and async output bundles
//! - `Bundler`: orchestration, asset emission, and plugin dispatch
//!
//! Import resolution lives in the `bindery-resolver` crate.

pub mod bundler;
pub mod chunk;
pub mod compiler;
pub mod config;
pub mod dependency;
pub mod error;
pub mod graph;
pub mod loader;
pub mod module;
pub mod plugin;

pub use bundler::{AssetReport, BundleReport, Bundler};
pub use config::{Config, Mode};
pub use error::{BundleError, Result};
pub use module::{Module, ModuleId};
