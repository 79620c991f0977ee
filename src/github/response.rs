// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed shapes for aliased GraphQL payloads and the questions the generators ask of them
// role: github/response
// outputs: RepositorySnapshot, PullRequestSummary, ChangedFile
// invariants: Missing repository/ref/PR deserializes to None upstream; entries keep remote order
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::{Deserialize, Serialize};

use crate::model::PackageManager;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
  #[serde(rename = "byteSize", default)]
  pub byte_size: Option<u64>,
  #[serde(default)]
  pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
  pub name: String,
  /// Empty for sub-trees; the query only selects blob fields.
  #[serde(default)]
  pub object: Option<BlobInfo>,
}

/// Top-level file listing of a repository at one ref.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
  pub entries: Vec<TreeEntry>,
}

impl RepositorySnapshot {
  pub fn has_entry(&self, name: &str) -> bool {
    self.entries.iter().any(|e| e.name == name)
  }

  pub fn entry_text(&self, name: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|e| e.name == name)
      .and_then(|e| e.object.as_ref())
      .and_then(|o| o.text.as_deref())
  }

  pub fn has_tsconfig(&self) -> bool {
    self.has_entry("tsconfig.json")
  }

  pub fn package_manager(&self) -> Option<PackageManager> {
    PackageManager::from_entries(self.entries.iter().map(|e| e.name.as_str()))
  }

  /// Trimmed `.nvmrc` content, when present and non-empty.
  pub fn node_version_pin(&self) -> Option<String> {
    self
      .entry_text(".nvmrc")
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
  #[serde(rename = "changeType")]
  pub change_type: String,
  pub additions: u64,
  pub deletions: u64,
  pub path: String,
}

/// Provenance of a dependency-bump pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
  pub created_at: String,
  /// Conclusions of the first commit's check suites (`None` while pending).
  pub check_conclusions: Vec<Option<String>>,
  pub files: Vec<ChangedFile>,
}

// --- raw GraphQL node shapes ---

#[derive(Debug, Deserialize)]
pub(crate) struct Connection<T> {
  #[serde(default = "Vec::new")]
  pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryTreeNode {
  #[serde(default)]
  pub object: Option<TreeObjectNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeObjectNode {
  #[serde(default)]
  pub entries: Option<Vec<TreeEntry>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPullNode {
  #[serde(rename = "pullRequest", default)]
  pub pull_request: Option<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestNode {
  #[serde(rename = "createdAt")]
  pub created_at: String,
  #[serde(default)]
  pub commits: Option<Connection<CommitNode>>,
  #[serde(default)]
  pub files: Option<Connection<ChangedFile>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitNode {
  pub commit: CommitInner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitInner {
  #[serde(rename = "checkSuites", default)]
  pub check_suites: Option<Connection<CheckSuiteNode>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckSuiteNode {
  #[serde(default)]
  pub conclusion: Option<String>,
}

impl RepositoryTreeNode {
  pub fn into_snapshot(self) -> Option<RepositorySnapshot> {
    let entries = self.object?.entries?;
    Some(RepositorySnapshot { entries })
  }
}

impl RepositoryPullNode {
  pub fn into_summary(self) -> Option<PullRequestSummary> {
    let pr = self.pull_request?;

    let check_conclusions = pr
      .commits
      .and_then(|c| c.nodes.into_iter().next())
      .and_then(|n| n.commit.check_suites)
      .map(|s| s.nodes.into_iter().map(|n| n.conclusion).collect())
      .unwrap_or_default();

    Some(PullRequestSummary {
      created_at: pr.created_at,
      check_conclusions,
      files: pr.files.map(|f| f.nodes).unwrap_or_default(),
    })
  }
}
