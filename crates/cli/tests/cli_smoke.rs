//! CLI smoke tests for bindery.
//!
//! These tests verify that the CLI commands run end to end and return
//! appropriate exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn bindery_cmd() -> Command {
  cargo_bin_cmd!("bindery")
}

/// A valid config pointing at a cwd-relative project.
const VALID_CONFIG: &str = r#"{
  "entry": "./src/index.js",
  "output": {
    "path": "./dist",
    "filename": "bundle.js",
    "chunkFilename": "[name].chunk.js"
  },
  "module": {
    "rules": [
      { "test": "\\.js$", "useLoader": "javascript", "exclude": "node_modules" }
    ]
  },
  "resolve": {
    "extensions": [".js", ".json"],
    "alias": {}
  },
  "plugins": [],
  "mode": "Development"
}"#;

/// Same record with an unknown mode string.
const BAD_MODE_CONFIG: &str = r#"{
  "entry": "./src/index.js",
  "output": { "path": "./dist", "filename": "bundle.js", "chunkFilename": "[name].chunk.js" },
  "module": { "rules": [] },
  "resolve": { "extensions": [".js"], "alias": {} },
  "plugins": [],
  "mode": "Staging"
}"#;

/// Create a temp project with a config and a two-module source tree.
fn temp_project() -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("bindery.config.json"), VALID_CONFIG).unwrap();
  std::fs::create_dir_all(temp.path().join("src")).unwrap();
  std::fs::write(
    temp.path().join("src/index.js"),
    "import { helper } from './helper.js';\nhelper();\n",
  )
  .unwrap();
  std::fs::write(
    temp.path().join("src/helper.js"),
    "export function helper() { return 1; }\n",
  )
  .unwrap();
  temp
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  bindery_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  bindery_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("bindery"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["build", "check", "init"] {
    bindery_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// init
// =============================================================================

#[test]
fn init_writes_a_starter_config() {
  let temp = TempDir::new().unwrap();
  let dir = temp.path().join("myapp");

  bindery_cmd().arg("init").arg(&dir).assert().success();

  let written = std::fs::read_to_string(dir.join("bindery.config.json")).unwrap();
  assert!(written.contains("\"entry\""));
  assert!(written.contains("chunkFilename"));
}

#[test]
fn init_fails_if_config_exists() {
  let temp = temp_project();

  bindery_cmd()
    .arg("init")
    .arg(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("already exists"));
}

// =============================================================================
// check
// =============================================================================

#[test]
fn check_accepts_a_valid_config() {
  let temp = temp_project();

  bindery_cmd()
    .arg("check")
    .arg("--config")
    .arg(temp.path().join("bindery.config.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("config ok"));
}

#[test]
fn check_rejects_an_unknown_mode() {
  let temp = TempDir::new().unwrap();
  let config = temp.path().join("bindery.config.json");
  std::fs::write(&config, BAD_MODE_CONFIG).unwrap();

  bindery_cmd()
    .arg("check")
    .arg("--config")
    .arg(&config)
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown variant"));
}

#[test]
fn check_rejects_a_missing_config_file() {
  bindery_cmd()
    .arg("check")
    .arg("--config")
    .arg("/no/such/bindery.config.json")
    .assert()
    .failure();
}

// =============================================================================
// build
// =============================================================================

#[test]
fn build_bundles_the_discovered_config() {
  let temp = temp_project();

  bindery_cmd()
    .arg("build")
    .current_dir(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("bundle.js"));

  let bundle = std::fs::read_to_string(temp.path().join("dist/bundle.js")).unwrap();
  assert!(bundle.contains("__bindery_require__"));
}

#[test]
fn build_entry_argument_overrides_config() {
  let temp = temp_project();
  std::fs::write(temp.path().join("other.js"), "console.log('other');\n").unwrap();

  bindery_cmd()
    .arg("build")
    .arg("./other.js")
    .arg("--output")
    .arg("./out")
    .current_dir(temp.path())
    .assert()
    .success();

  assert!(temp.path().join("out/bundle.js").exists());
}

#[test]
fn build_fails_when_the_entry_is_missing() {
  let temp = TempDir::new().unwrap();

  bindery_cmd()
    .arg("build")
    .current_dir(temp.path())
    .assert()
    .failure();
}
