// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Load and persist tasks, candidates, predictions and evaluation artifacts
// role: persistence/store
// inputs: File paths (.csv → tabular, anything else → JSON array), prediction file or directory
// outputs: Vec<Task>/Vec<Prediction>; rewritten stores; <id>.<model>.eval.log artifacts
// side_effects: Reads and rewrites whole files; creates the log directory
// invariants:
// - Appends are read-modify-write of the whole store; a missing store reads as empty
// - CSV stores always carry every Task column so rows stay rectangular
// - Prediction directories only contribute files ending in .prediction.json, in file-name order
// errors: IO/parse errors surfaced with full path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::model::{PackageManager, Prediction, Task};

pub const PREDICTION_SUFFIX: &str = ".prediction.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
  Json,
  Csv,
}

impl StoreFormat {
  pub fn for_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some(ext) if ext.eq_ignore_ascii_case("csv") => StoreFormat::Csv,
      _ => StoreFormat::Json,
    }
  }
}

/// Flat CSV shape of a Task; every column is always written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRow {
  id: String,
  owner: String,
  name: String,
  #[serde(alias = "pkgManager")]
  package_manager: PackageManager,
  package: String,
  version_from: Option<String>,
  version_to: String,
  node_version: Option<String>,
  #[serde(alias = "baseCommit")]
  commit: String,
  patch: Option<String>,
  pr_url: Option<String>,
  pr_title: Option<String>,
  pr_number: Option<u64>,
}

impl From<Task> for TaskRow {
  fn from(t: Task) -> Self {
    Self {
      id: t.id,
      owner: t.owner,
      name: t.name,
      package_manager: t.package_manager,
      package: t.package,
      version_from: t.version_from,
      version_to: t.version_to,
      node_version: Some(t.node_version),
      commit: t.commit,
      patch: t.patch,
      pr_url: t.pr_url,
      pr_title: t.pr_title,
      pr_number: t.pr_number,
    }
  }
}

impl From<TaskRow> for Task {
  fn from(r: TaskRow) -> Self {
    Self {
      id: r.id,
      owner: r.owner,
      name: r.name,
      package_manager: r.package_manager,
      package: r.package,
      version_from: r.version_from,
      version_to: r.version_to,
      node_version: r
        .node_version
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| crate::model::DEFAULT_NODE_VERSION.to_string()),
      commit: r.commit,
      patch: r.patch,
      pr_url: r.pr_url,
      pr_title: r.pr_title,
      pr_number: r.pr_number,
    }
  }
}

/// Header-row CSV into `T`; unknown columns are ignored.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
  let mut reader = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
  let mut out = Vec::new();
  for (i, row) in reader.deserialize::<T>().enumerate() {
    out.push(row.with_context(|| format!("{}: row {}", path.display(), i + 1))?);
  }
  Ok(out)
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
  let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
  for row in rows {
    writer.serialize(row).with_context(|| format!("writing {}", path.display()))?;
  }
  writer.flush().with_context(|| format!("flushing {}", path.display()))?;
  Ok(())
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
  if !path.exists() {
    return Ok(Vec::new());
  }

  match StoreFormat::for_path(path) {
    StoreFormat::Csv => Ok(read_csv::<TaskRow>(path)?.into_iter().map(Task::from).collect()),
    StoreFormat::Json => {
      let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
      if text.trim().is_empty() {
        return Ok(Vec::new());
      }
      serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
  }
}

pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
  }

  match StoreFormat::for_path(path) {
    StoreFormat::Csv => {
      let rows: Vec<TaskRow> = tasks.iter().cloned().map(TaskRow::from).collect();
      write_csv(path, &rows)
    }
    StoreFormat::Json => {
      let text = serde_json::to_string_pretty(tasks)?;
      std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
  }
}

/// Read the existing store, add `tasks` at the end, rewrite it.
pub fn merge_tasks(path: &Path, tasks: &[Task]) -> Result<usize> {
  let mut all = load_tasks(path)?;
  all.extend_from_slice(tasks);
  save_tasks(path, &all)?;
  Ok(all.len())
}

pub fn append_task(path: &Path, task: &Task) -> Result<usize> {
  merge_tasks(path, std::slice::from_ref(task))
}

/// Predictions from a JSON array file, or from every `*.prediction.json` in a directory.
pub fn load_predictions(path: &Path) -> Result<Vec<Prediction>> {
  if path.is_dir() {
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
      .with_context(|| format!("listing {}", path.display()))?
      .filter_map(|e| e.ok().map(|e| e.path()))
      .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with(PREDICTION_SUFFIX)))
      .collect();
    files.sort();

    let mut out = Vec::with_capacity(files.len());
    for file in files {
      let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
      let p: Prediction = serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
      out.push(p);
    }
    return Ok(out);
  }

  let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// `/` in model names would otherwise create sub-directories.
fn artifact_component(s: &str) -> String {
  s.replace(['/', '\\'], "__")
}

pub fn eval_artifact_path(log_dir: &Path, task_id: &str, model: &str) -> PathBuf {
  log_dir.join(format!("{}.{}.eval.log", artifact_component(task_id), artifact_component(model)))
}

/// Write the literal `true`/`false` result for one (task, model) pair.
pub fn write_eval_result(log_dir: &Path, task_id: &str, model: &str, success: bool) -> Result<PathBuf> {
  std::fs::create_dir_all(log_dir).with_context(|| format!("creating {}", log_dir.display()))?;
  let path = eval_artifact_path(log_dir, task_id, model);
  std::fs::write(&path, success.to_string()).with_context(|| format!("writing {}", path.display()))?;
  Ok(path)
}
