// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Mine upgrade regressions from candidate repositories by trial-upgrading one dependency at a time
// role: generator/repositories
// inputs: GithubApi (snapshots), Shell, Registry, RepoCandidate rows, workspace root, output store
// outputs: Tasks appended to the JSON store as soon as each is found
// side_effects: Clones into <workspace_root>/<owner>__<name>; installs; runs tsc; rewrites package.json
// invariants:
// - Each candidate starts from the same post-install state; a hard reset follows every trial
// - A task is emitted only when the post-upgrade diagnostic count exceeds the baseline
// - A trial rewrites exactly one manifest entry; packages listed in both dependency maps are skipped
// - Install failure skips the repository; candidate failures skip the candidate
// errors: is_fatal errors (rate limit, remote, parse shape) abort the run; all others are logged
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::error::is_fatal;
use crate::exec::Shell;
use crate::generator::RunSummary;
use crate::github::batch::chunked;
use crate::github::{fetch_snapshots, GithubApi, RepositorySnapshot, SnapshotRequest};
use crate::manifest::{self, PackageManifest, MANIFEST_FILE};
use crate::model::{repo_slug, repo_url, upgrade_task_id, PackageManager, RepoCandidate, Task, DEFAULT_NODE_VERSION};
use crate::nvm::{resolve_activation, Activation};
use crate::registry::Registry;
use crate::store;
use crate::workspace::Workspace;

/// A dependency whose latest release is on a new major line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCandidate {
  pub package: String,
  pub current: String,
  pub upgraded: String,
}

/// Non-noise dependencies whose latest major differs from the pinned one.
/// Registry failures drop only the affected package.
pub fn find_upgrades(manifest: &PackageManifest, registry: &dyn Registry) -> Vec<UpgradeCandidate> {
  let mut out = Vec::new();

  for dep in manifest.dependencies() {
    if manifest::is_noise(&dep.name) {
      continue;
    }
    if manifest::coerce_major(&dep.spec).is_none() {
      tracing::debug!("[collect] no version in {}@{}", dep.name, dep.spec);
      continue;
    }

    let latest = match registry.latest_version(&dep.name) {
      Ok(Some(v)) => v,
      Ok(None) => continue,
      Err(e) => {
        tracing::warn!("[collect] registry lookup for {} failed: {:#}", dep.name, e);
        continue;
      }
    };

    if manifest::is_major_change(&dep.spec, &latest) {
      out.push(UpgradeCandidate {
        upgraded: manifest::upgraded_spec(&dep.spec, &latest),
        package: dep.name,
        current: dep.spec,
      });
    }
  }

  out
}

pub struct Collector<'a> {
  pub api: &'a dyn GithubApi,
  pub shell: &'a dyn Shell,
  pub registry: &'a dyn Registry,
  pub workspace_root: PathBuf,
  pub output: PathBuf,
}

/// Repository facts read from the remote snapshot before cloning.
struct Eligible {
  package_manager: PackageManager,
  node_version: String,
}

fn eligibility(snapshot: Option<&RepositorySnapshot>) -> Result<Eligible, &'static str> {
  let snapshot = snapshot.ok_or("repository not found")?;
  if !snapshot.has_tsconfig() {
    return Err("no tsconfig.json");
  }
  let package_manager = snapshot.package_manager().ok_or("no lockfile")?;
  Ok(Eligible {
    package_manager,
    node_version: snapshot.node_version_pin().unwrap_or_else(|| DEFAULT_NODE_VERSION.to_string()),
  })
}

impl<'a> Collector<'a> {
  pub fn workspace_dir(&self, repo: &RepoCandidate) -> PathBuf {
    self.workspace_root.join(repo_slug(&repo.owner, &repo.name))
  }

  pub fn collect(&self, repos: &[RepoCandidate]) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let batches: Vec<&[RepoCandidate]> = chunked(repos).collect();
    tracing::info!("[collect] {} repositories in {} batch(es)", repos.len(), batches.len());

    for batch in batches {
      let requests: Vec<SnapshotRequest> =
        batch.iter().map(|r| SnapshotRequest::new(r.owner.clone(), r.name.clone(), None)).collect();
      let snapshots = fetch_snapshots(self.api, &requests)?;

      for (repo, request) in batch.iter().zip(&requests) {
        summary.candidates += 1;
        let subject = format!("{}/{}", repo.owner, repo.name);

        let eligible = match eligibility(snapshots.get(&request.key()).and_then(|s| s.as_ref())) {
          Ok(e) => e,
          Err(reason) => {
            summary.record_skip(&subject, reason);
            continue;
          }
        };

        match self.process_repository(repo, &eligible) {
          Ok(found) => summary.emitted += found,
          Err(e) if is_fatal(&e) => return Err(e),
          Err(e) => {
            tracing::warn!("[collect] {} failed: {:#}", subject, e);
            summary.failed += 1;
          }
        }
      }
    }

    Ok(summary)
  }

  fn process_repository(&self, repo: &RepoCandidate, eligible: &Eligible) -> Result<usize> {
    let ws = Workspace::new(self.shell, self.workspace_dir(repo));
    ws.prepare(&repo_url(&repo.owner, &repo.name))?;

    let activation = resolve_activation(self.shell, ws.dir(), None)?;
    if let Err(e) = ws.install(&activation, eligible.package_manager) {
      tracing::info!("[collect] {}/{} is not installable here, skipping: {:#}", repo.owner, repo.name, e);
      return Ok(0);
    }

    let baseline = ws.compile(&activation)?.len();
    tracing::info!("[collect] {}/{} baseline: {} diagnostic(s)", repo.owner, repo.name, baseline);

    let manifest = PackageManifest::load(ws.dir())?;
    let candidates = find_upgrades(&manifest, self.registry);
    if candidates.is_empty() {
      tracing::info!("[collect] no major upgrades for {}/{}", repo.owner, repo.name);
      return Ok(0);
    }

    let mut found = 0;
    for candidate in &candidates {
      let trial = self.try_candidate(&ws, &activation, repo, eligible, baseline, candidate);
      ws.reset_hard()?;

      match trial {
        Ok(Some(task)) => {
          let total = store::append_task(&self.output, &task)?;
          tracing::info!("[collect] recorded {} ({} task(s) in store)", task.id, total);
          found += 1;
        }
        Ok(None) => {}
        Err(e) if is_fatal(&e) => return Err(e),
        Err(e) => tracing::warn!("[collect] {} trial failed: {:#}", candidate.package, e),
      }
    }

    Ok(found)
  }

  fn try_candidate(
    &self,
    ws: &Workspace<'_>,
    activation: &Activation,
    repo: &RepoCandidate,
    eligible: &Eligible,
    baseline: usize,
    candidate: &UpgradeCandidate,
  ) -> Result<Option<Task>> {
    tracing::info!("[collect] trying {} {} -> {}", candidate.package, candidate.current, candidate.upgraded);

    let mut manifest = PackageManifest::load(ws.dir())?;
    let changed = manifest.set_version(&candidate.package, &candidate.upgraded);
    if changed != 1 {
      tracing::info!(
        "[collect] skipping {}: {} manifest entries would change, expected exactly one",
        candidate.package,
        changed
      );
      return Ok(None);
    }
    manifest.save()?;

    ws.install(activation, eligible.package_manager)?;
    let after = ws.compile(activation)?.len();
    if after <= baseline {
      tracing::info!("[collect] {}: {} diagnostic(s), no regression", candidate.package, after);
      return Ok(None);
    }

    let patch = ws.diff(&[MANIFEST_FILE]).context("recording manifest diff")?;
    let commit = ws.head_commit()?;

    Ok(Some(Task {
      id: upgrade_task_id(&repo.owner, &repo.name, &candidate.package, &candidate.upgraded),
      owner: repo.owner.clone(),
      name: repo.name.clone(),
      package_manager: eligible.package_manager,
      package: candidate.package.clone(),
      version_from: Some(candidate.current.clone()),
      version_to: candidate.upgraded.clone(),
      node_version: eligible.node_version.clone(),
      commit,
      patch: Some(patch).filter(|p| !p.trim().is_empty()),
      pr_url: None,
      pr_title: None,
      pr_number: None,
    }))
  }
}
