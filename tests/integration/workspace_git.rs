use upgrade_bench::exec::SystemShell;
use upgrade_bench::workspace::Workspace;

use crate::common::{fixture_source_patch, git, init_fixture_repo, tempdir, FIXTURE_SOURCE};

fn cloned<'a>(shell: &'a SystemShell, origin: &std::path::Path, root: &std::path::Path) -> Workspace<'a> {
  let ws = Workspace::new(shell, root.join("acme__web"));
  ws.prepare(origin.to_str().unwrap()).unwrap();
  ws
}

#[test]
fn clone_reports_origin_head() {
  let origin = init_fixture_repo();
  let root = tempdir();
  let shell = SystemShell;
  let ws = cloned(&shell, origin.path(), root.path());

  let expected = git(origin.path(), &["rev-parse", "HEAD"]);
  assert_eq!(ws.head_commit().unwrap(), expected.trim());
  assert_eq!(std::fs::read_to_string(ws.dir().join("src/index.ts")).unwrap(), FIXTURE_SOURCE);
}

#[test]
fn patch_without_trailing_newline_applies_and_resets() {
  let origin = init_fixture_repo();
  let root = tempdir();
  let shell = SystemShell;
  let ws = cloned(&shell, origin.path(), root.path());

  assert!(ws.apply_patch(&fixture_source_patch()).unwrap());
  let diff = ws.diff(&["src/index.ts"]).unwrap();
  assert!(diff.contains("+export const answer: number = 43;"));
  assert!(ws.diff(&["package.json"]).unwrap().is_empty());

  ws.reset_hard().unwrap();
  assert!(ws.diff(&["src/index.ts"]).unwrap().is_empty());
  assert_eq!(std::fs::read_to_string(ws.dir().join("src/index.ts")).unwrap(), FIXTURE_SOURCE);
}

#[test]
fn rejected_patches_are_false_not_errors() {
  let origin = init_fixture_repo();
  let root = tempdir();
  let shell = SystemShell;
  let ws = cloned(&shell, origin.path(), root.path());

  assert!(!ws.apply_patch("this is not a diff").unwrap());

  let stale = fixture_source_patch().replace("= 42;", "= 41;");
  assert!(!ws.apply_patch(&stale).unwrap());
  assert_eq!(std::fs::read_to_string(ws.dir().join("src/index.ts")).unwrap(), FIXTURE_SOURCE);
}

#[test]
fn prepare_replaces_previous_checkout() {
  let origin = init_fixture_repo();
  let root = tempdir();
  let shell = SystemShell;
  let ws = cloned(&shell, origin.path(), root.path());
  std::fs::write(ws.dir().join("leftover.txt"), "x").unwrap();

  ws.prepare(origin.path().to_str().unwrap()).unwrap();
  assert!(!ws.dir().join("leftover.txt").exists());
  assert!(ws.dir().join("tsconfig.json").exists());
}

#[test]
fn checkout_of_unknown_ref_fails() {
  let origin = init_fixture_repo();
  let root = tempdir();
  let shell = SystemShell;
  let ws = cloned(&shell, origin.path(), root.path());
  assert!(ws.checkout_ref("deadbeefdeadbeef").is_err());
}
