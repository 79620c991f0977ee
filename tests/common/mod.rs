//! Shared helpers for integration tests; thin re-exports over `test_support`.

#[allow(unused_imports)]
pub use test_support::{
  cmd_bin, fixture_source_patch, fixtures_dir, git, init_fixture_repo, read_fixture_text, tempdir, FIXTURE_SOURCE,
};

pub const BIN: &str = "upgrade-bench";

#[allow(dead_code)]
pub fn read_schema(name: &str) -> serde_json::Value {
  let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
  let path = manifest_dir.join("tests").join("schemas").join(name);
  let data = std::fs::read(&path).expect("schema file");
  serde_json::from_slice(&data).expect("valid schema JSON")
}
