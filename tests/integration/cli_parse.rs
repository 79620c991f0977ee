use upgrade_bench::diagnostics::{Diagnostic, Layout};

use crate::common::{cmd_bin, fixtures_dir, BIN};

fn outline(items: &[Diagnostic]) -> String {
  items
    .iter()
    .map(|d| format!("{}:{}:{} {} {:?}", d.path, d.line, d.column, d.code, d.layout))
    .collect::<Vec<_>>()
    .join("\n")
}

#[test]
fn parse_file_emits_diagnostics_json() {
  test_support::init_insta();
  let path = fixtures_dir().join("tsc_pretty.txt");

  let out = cmd_bin(BIN).args(["parse", "--file", path.to_str().unwrap()]).output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let items: Vec<Diagnostic> = serde_json::from_slice(&out.stdout).unwrap();
  insta::assert_snapshot!(outline(&items), @r"
  src/app.ts:3:7 TS2322 Colon
  src/util/format.ts:10:1 TS2741 Colon
  ");

  assert_eq!(
    items[0].message,
    "Type 'string' is not assignable to type 'number'.\n\n3 const n: number = value;\n        ~"
  );
  assert_eq!(
    items[1].message,
    "Property 'id' is missing in type '{}' but required in type 'User'.\n  The expected type comes from property 'user' which is declared here."
  );
  assert!(items.iter().all(|d| d.layout == Layout::Colon));
}

#[test]
fn parse_reads_stdin() {
  let out = cmd_bin(BIN)
    .arg("parse")
    .write_stdin("src/a.ts(4,1): error TS2304: Cannot find name 'x'.\nFound 1 error in src/a.ts:4\n")
    .output()
    .unwrap();
  assert!(out.status.success());

  let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(v.as_array().map(Vec::len), Some(1));
  assert_eq!(v[0]["path"], "src/a.ts");
  assert_eq!(v[0]["layout"], "paren");
  assert_eq!(v[0]["message"], "Cannot find name 'x'.");
}

#[test]
fn parse_of_clean_output_is_empty() {
  let out = cmd_bin(BIN).arg("parse").write_stdin("").output().unwrap();
  assert!(out.status.success());
  assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "[]");
}
