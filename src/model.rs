// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the durable records (Task, Prediction) and the candidate rows fed to the generators
// role: model/types
// outputs: Serializable structs with stable camelCase field names; deterministic task ids
// invariants:
// - Task ids are a pure function of (owner, name, package, version) or (owner, name, pr number)
// - Lockfile presence alone decides the package manager (npm > pnpm > yarn)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime pin used when a repository has no `.nvmrc`.
pub const DEFAULT_NODE_VERSION: &str = "v20.12.2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
  Npm,
  Yarn,
  Pnpm,
}

impl PackageManager {
  pub fn command(&self) -> &'static str {
    match self {
      PackageManager::Npm => "npm",
      PackageManager::Yarn => "yarn",
      PackageManager::Pnpm => "pnpm",
    }
  }

  pub fn lockfile(&self) -> &'static str {
    match self {
      PackageManager::Npm => "package-lock.json",
      PackageManager::Yarn => "yarn.lock",
      PackageManager::Pnpm => "pnpm-lock.yaml",
    }
  }

  /// Pick the package manager from the set of top-level file names.
  /// npm wins over pnpm, pnpm over yarn.
  pub fn from_entries<'a, I>(names: I) -> Option<PackageManager>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let names: Vec<&str> = names.into_iter().collect();
    [PackageManager::Npm, PackageManager::Pnpm, PackageManager::Yarn]
      .into_iter()
      .find(|pm| names.contains(&pm.lockfile()))
  }
}

impl fmt::Display for PackageManager {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.command())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id: String,
  pub owner: String,
  pub name: String,
  #[serde(alias = "pkgManager")]
  pub package_manager: PackageManager,
  pub package: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version_from: Option<String>,
  pub version_to: String,
  #[serde(default = "default_node_version")]
  pub node_version: String,
  #[serde(alias = "baseCommit")]
  pub commit: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub patch: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pr_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pr_title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pr_number: Option<u64>,
}

fn default_node_version() -> String {
  DEFAULT_NODE_VERSION.to_string()
}

impl Task {
  pub fn repo_url(&self) -> String {
    repo_url(&self.owner, &self.name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
  pub id: String,
  #[serde(alias = "model_name_or_path")]
  pub model_name: String,
  pub patch: String,
}

/// A repository to mine for upgrade regressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCandidate {
  pub owner: String,
  pub name: String,
}

/// A historical dependency-bump pull request; extra columns in the input are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestCandidate {
  pub owner: String,
  pub name: String,
  pub pr_url: String,
  pub pr_title: String,
  pub number: u64,
  pub base_sha: String,
}

/// Result of replaying a prediction against its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalOutcome {
  /// Post-patch diagnostics did not exceed the baseline.
  Resolved { before: usize, after: usize },
  Regressed { before: usize, after: usize },
  /// The diff did not apply; nothing was compiled.
  PatchRejected,
}

impl EvalOutcome {
  pub fn from_counts(before: usize, after: usize) -> Self {
    if after > before {
      EvalOutcome::Regressed { before, after }
    } else {
      EvalOutcome::Resolved { before, after }
    }
  }

  pub fn success(&self) -> bool {
    matches!(self, EvalOutcome::Resolved { .. })
  }
}

pub fn repo_url(owner: &str, name: &str) -> String {
  format!("https://github.com/{}/{}", owner, name)
}

/// `owner__name`. GitHub owners are limited to alphanumerics and `-`, so the
/// first `__` always ends the owner even when the repository name contains `__`.
pub fn repo_slug(owner: &str, name: &str) -> String {
  format!("{}__{}", owner, name)
}

/// `owner__name-<packageSlug>__<version>` where `/` in the package becomes `-slash-`.
/// Unique within one repository only: across one owner's repositories,
/// `web-react` + `dom` and `web` + `react-dom` produce the same id.
pub fn upgrade_task_id(owner: &str, name: &str, package: &str, version: &str) -> String {
  format!("{}-{}__{}", repo_slug(owner, name), package.replace('/', "-slash-"), version)
}

pub fn pull_request_task_id(owner: &str, name: &str, number: u64) -> String {
  format!("{}-{}", repo_slug(owner, name), number)
}
