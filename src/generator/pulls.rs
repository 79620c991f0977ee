// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn historical dependency-bump pull requests into tasks using remote metadata only
// role: generator/pull-requests
// inputs: GithubApi, PullRequestCandidate rows, output store path
// outputs: Tasks merged into the store once per batch
// side_effects: GraphQL batches, one diff download per accepted PR, store rewrite
// invariants:
// - Base commit must carry tsconfig.json, .nvmrc and a lockfile
// - Title must read "bump <pkg> from <a> to <b>"; excluded packages never pass
// - The PR must touch .ts/.tsx/.jsx files and change package.json by exactly two lines
// errors: Rate-limit/remote failures abort; a failed diff download skips only that PR
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;
use std::path::Path;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::is_fatal;
use crate::generator::RunSummary;
use crate::github::batch::chunked;
use crate::github::{
  fetch_pull_requests, fetch_snapshots, ChangedFile, GithubApi, PullRequestRequest, PullRequestSummary,
  RepositorySnapshot, SnapshotRequest,
};
use crate::manifest::{is_noise, MANIFEST_FILE};
use crate::model::{pull_request_task_id, PackageManager, PullRequestCandidate, Task};
use crate::store;

static RE_UPGRADE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Bb]ump ([^\s]+) from ([\d.]+) to ([\d.]+)").unwrap());

const CODE_EXTENSIONS: [&str; 3] = [".ts", ".tsx", ".jsx"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeTitle {
  pub package: String,
  pub version_from: String,
  pub version_to: String,
}

pub fn parse_upgrade_title(title: &str) -> Option<UpgradeTitle> {
  let caps = RE_UPGRADE_TITLE.captures(title)?;
  Some(UpgradeTitle {
    package: caps.get(1)?.as_str().to_string(),
    version_from: caps.get(2)?.as_str().to_string(),
    version_to: caps.get(3)?.as_str().to_string(),
  })
}

/// Noise packages plus the compiler itself.
pub fn is_excluded(package: &str) -> bool {
  is_noise(package) || package == "typescript"
}

pub fn has_code_changes(files: &[ChangedFile]) -> bool {
  files.iter().any(|f| CODE_EXTENSIONS.iter().any(|ext| f.path.ends_with(ext)))
}

/// Exactly one root package.json entry with one line removed and one added.
/// Multi-line version specifiers fail this check.
pub fn only_one_package_modified(files: &[ChangedFile]) -> bool {
  let manifests: Vec<&ChangedFile> = files.iter().filter(|f| f.path == MANIFEST_FILE).collect();
  match manifests.as_slice() {
    [only] => only.additions + only.deletions == 2,
    _ => false,
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  PullRequestMissing,
  CommitMissing,
  NoTsconfig,
  NoNodePin,
  NoLockfile,
  TitleMismatch,
  Excluded(String),
  NoCodeChanges,
  ManifestNotSingleLine,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::PullRequestMissing => f.write_str("pull request not found"),
      SkipReason::CommitMissing => f.write_str("base commit not found"),
      SkipReason::NoTsconfig => f.write_str("no tsconfig.json at base commit"),
      SkipReason::NoNodePin => f.write_str("no .nvmrc at base commit"),
      SkipReason::NoLockfile => f.write_str("no lockfile at base commit"),
      SkipReason::TitleMismatch => f.write_str("title is not a version bump"),
      SkipReason::Excluded(pkg) => write!(f, "{} is excluded", pkg),
      SkipReason::NoCodeChanges => f.write_str("no .ts/.tsx/.jsx changes"),
      SkipReason::ManifestNotSingleLine => f.write_str("package.json change is not a single line"),
    }
  }
}

/// Everything needed to build a task except the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
  pub package_manager: PackageManager,
  pub node_version: String,
  pub upgrade: UpgradeTitle,
}

/// Apply the acceptance checks in order; the first failure wins.
pub fn screen(
  candidate: &PullRequestCandidate,
  snapshot: Option<&RepositorySnapshot>,
  pr: Option<&PullRequestSummary>,
) -> Result<Accepted, SkipReason> {
  let pr = pr.ok_or(SkipReason::PullRequestMissing)?;
  let snapshot = snapshot.ok_or(SkipReason::CommitMissing)?;

  if !snapshot.has_tsconfig() {
    return Err(SkipReason::NoTsconfig);
  }
  let node_version = snapshot.node_version_pin().ok_or(SkipReason::NoNodePin)?;
  let package_manager = snapshot.package_manager().ok_or(SkipReason::NoLockfile)?;

  let upgrade = parse_upgrade_title(&candidate.pr_title).ok_or(SkipReason::TitleMismatch)?;
  if is_excluded(&upgrade.package) {
    return Err(SkipReason::Excluded(upgrade.package));
  }

  if !has_code_changes(&pr.files) {
    return Err(SkipReason::NoCodeChanges);
  }
  if !only_one_package_modified(&pr.files) {
    return Err(SkipReason::ManifestNotSingleLine);
  }

  Ok(Accepted { package_manager, node_version, upgrade })
}

fn build_task(candidate: &PullRequestCandidate, accepted: Accepted, patch: String) -> Task {
  Task {
    id: pull_request_task_id(&candidate.owner, &candidate.name, candidate.number),
    owner: candidate.owner.clone(),
    name: candidate.name.clone(),
    package_manager: accepted.package_manager,
    package: accepted.upgrade.package,
    version_from: Some(accepted.upgrade.version_from),
    version_to: accepted.upgrade.version_to,
    node_version: accepted.node_version,
    commit: candidate.base_sha.clone(),
    patch: Some(patch),
    pr_url: Some(candidate.pr_url.clone()),
    pr_title: Some(candidate.pr_title.clone()),
    pr_number: Some(candidate.number),
  }
}

fn snapshot_request(c: &PullRequestCandidate) -> SnapshotRequest {
  SnapshotRequest::new(c.owner.clone(), c.name.clone(), Some(c.base_sha.clone()))
}

fn pull_request_request(c: &PullRequestCandidate) -> PullRequestRequest {
  PullRequestRequest { owner: c.owner.clone(), name: c.name.clone(), number: c.number }
}

/// Screen `candidates` batch by batch and merge accepted tasks into `output`.
pub fn validate(api: &dyn GithubApi, candidates: &[PullRequestCandidate], output: &Path) -> Result<RunSummary> {
  let mut summary = RunSummary::default();
  let batches: Vec<&[PullRequestCandidate]> = chunked(candidates).collect();
  tracing::info!("[validate] {} candidate(s) in {} batch(es)", candidates.len(), batches.len());

  for batch in batches {
    let pr_requests: Vec<PullRequestRequest> = batch.iter().map(pull_request_request).collect();
    let snap_requests: Vec<SnapshotRequest> = batch.iter().map(snapshot_request).collect();
    let prs = fetch_pull_requests(api, &pr_requests)?;
    let snapshots = fetch_snapshots(api, &snap_requests)?;

    let mut accepted_tasks: Vec<Task> = Vec::new();

    for candidate in batch {
      summary.candidates += 1;
      let subject = candidate.pr_url.as_str();
      let pr = prs.get(&pull_request_request(candidate).key()).and_then(|v| v.as_ref());
      let snapshot = snapshots.get(&snapshot_request(candidate).key()).and_then(|v| v.as_ref());

      let accepted = match screen(candidate, snapshot, pr) {
        Ok(a) => a,
        Err(reason) => {
          summary.record_skip(subject, reason);
          continue;
        }
      };

      match api.pull_request_diff(&candidate.pr_url) {
        Ok(diff) => {
          tracing::info!("[validate] accepted {} ({})", subject, accepted.upgrade.package);
          accepted_tasks.push(build_task(candidate, accepted, diff));
        }
        Err(e) if is_fatal(&e) => return Err(e),
        Err(e) => {
          tracing::warn!("[validate] could not download diff for {}: {:#}", subject, e);
          summary.failed += 1;
        }
      }
    }

    if !accepted_tasks.is_empty() {
      summary.emitted += accepted_tasks.len();
      let total = store::merge_tasks(output, &accepted_tasks)?;
      tracing::info!("[validate] {} now holds {} task(s)", output.display(), total);
    }
  }

  Ok(summary)
}
