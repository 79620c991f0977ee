use crate::common::{cmd_bin, tempdir, BIN};

const TASKS: &str = r#"[
  {
    "id": "acme__web-lodash-5.0.0",
    "owner": "acme",
    "name": "web",
    "packageManager": "npm",
    "package": "lodash",
    "versionTo": "5.0.0",
    "nodeVersion": "v20.12.2",
    "commit": "0f1e2d3c"
  }
]"#;

fn write_inputs(dir: &std::path::Path, predictions: &str) -> (std::path::PathBuf, std::path::PathBuf) {
  let tasks = dir.join("tasks.json");
  let preds = dir.join("predictions.json");
  std::fs::write(&tasks, TASKS).unwrap();
  std::fs::write(&preds, predictions).unwrap();
  (tasks, preds)
}

#[test]
fn unmatched_predictions_are_counted_not_evaluated() {
  let td = tempdir();
  let (tasks, preds) = write_inputs(
    td.path(),
    r#"[{ "id": "acme__api-zod-4.0.0", "modelName": "gpt-x", "patch": "diff --git a/x b/x\n" }]"#,
  );
  let logs = td.path().join("logs");

  let out = cmd_bin(BIN)
    .args(["evaluate", "--tasks", tasks.to_str().unwrap(), "--predictions", preds.to_str().unwrap()])
    .args(["--log-dir", logs.to_str().unwrap()])
    .args(["--workspace", td.path().join("ws").to_str().unwrap()])
    .output()
    .unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary["unmatched"], 1);
  assert_eq!(summary["evaluated"], 0);
  assert_eq!(summary["errored"], 0);
  assert!(!logs.exists());
}

#[test]
fn id_filter_skips_other_predictions() {
  let td = tempdir();
  let (tasks, preds) = write_inputs(
    td.path(),
    r#"[{ "id": "acme__web-lodash-5.0.0", "model_name_or_path": "org/model", "patch": "" }]"#,
  );

  let out = cmd_bin(BIN)
    .args(["evaluate", "--tasks", tasks.to_str().unwrap(), "--predictions", preds.to_str().unwrap()])
    .args(["--log-dir", td.path().join("logs").to_str().unwrap(), "--id", "something-else"])
    .output()
    .unwrap();
  assert!(out.status.success());

  let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary, serde_json::json!({ "evaluated": 0, "resolved": 0, "unmatched": 0, "errored": 0 }));
}

#[test]
fn missing_predictions_file_is_an_error() {
  let td = tempdir();
  let (tasks, _) = write_inputs(td.path(), "[]");

  let out = cmd_bin(BIN)
    .args(["evaluate", "--tasks", tasks.to_str().unwrap(), "--predictions"])
    .arg(td.path().join("nope.json"))
    .output()
    .unwrap();
  assert!(!out.status.success());
}
