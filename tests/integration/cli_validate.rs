use jsonschema::validator_for;

use crate::common::{cmd_bin, fixtures_dir, read_fixture_text, read_schema, tempdir, BIN};

fn validate_cmd(output: &std::path::Path) -> assert_cmd::Command {
  let mut cmd = cmd_bin(BIN);
  cmd
    .env("UPGRADE_BENCH_FIXTURE_GRAPHQL", read_fixture_text("validate_graphql.json"))
    .env("UPGRADE_BENCH_FIXTURE_DIFF", read_fixture_text("express_bump.diff"))
    .env_remove("GITHUB_TOKEN")
    .env_remove("GH_TOKEN")
    .args([
      "validate",
      "--input",
      fixtures_dir().join("validate_candidates.csv").to_str().unwrap(),
      "-o",
      output.to_str().unwrap(),
    ]);
  cmd
}

#[test]
fn validate_screens_candidates_into_json_store() {
  let td = tempdir();
  let store = td.path().join("matches.json");

  let out = validate_cmd(&store).output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary["candidates"], 3);
  assert_eq!(summary["emitted"], 1);
  assert_eq!(summary["skipped"], 2);
  assert_eq!(summary["failed"], 0);

  let tasks: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&store).unwrap()).unwrap();
  let validator = validator_for(&read_schema("task.schema.json")).expect("compile schema");
  validator.validate(&tasks).expect("task store conforms to schema");

  let task = &tasks[0];
  assert_eq!(tasks.as_array().map(Vec::len), Some(1));
  assert_eq!(task["id"], "acme__web-12");
  assert_eq!(task["package"], "express");
  assert_eq!(task["versionFrom"], "4.18.2");
  assert_eq!(task["versionTo"], "5.0.0");
  assert_eq!(task["packageManager"], "npm");
  assert_eq!(task["nodeVersion"], "v18.19.0");
  assert_eq!(task["commit"], "0f1e2d3c");
  assert_eq!(task["prNumber"], 12);
  assert!(task["patch"].as_str().unwrap().contains("\"express\": \"^5.0.0\""));
}

#[test]
fn validate_appends_to_existing_csv_store() {
  let td = tempdir();
  let store = td.path().join("matches.csv");

  assert!(validate_cmd(&store).output().unwrap().status.success());
  assert!(validate_cmd(&store).output().unwrap().status.success());

  let mut reader = csv::Reader::from_path(&store).unwrap();
  let ids: Vec<String> = reader
    .records()
    .map(|r| r.unwrap().get(0).unwrap().to_string())
    .collect();
  assert_eq!(ids, vec!["acme__web-12", "acme__web-12"]);
}

#[test]
fn validate_respects_limit() {
  let td = tempdir();
  let store = td.path().join("matches.json");

  let out = validate_cmd(&store).args(["--limit", "1"]).output().unwrap();
  assert!(out.status.success());
  let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary["candidates"], 1);
  assert_eq!(summary["emitted"], 1);
}

#[test]
fn validate_aborts_on_rate_limit() {
  let td = tempdir();
  let store = td.path().join("matches.json");

  let out = validate_cmd(&store)
    .env(
      "UPGRADE_BENCH_FIXTURE_GRAPHQL",
      r#"{"data":null,"errors":[{"type":"RATE_LIMITED","message":"API rate limit exceeded"}]}"#,
    )
    .output()
    .unwrap();
  assert!(!out.status.success());
  assert!(!store.exists());
}
