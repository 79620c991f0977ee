//! In-place upgrade of a single package in the current project.
//!
//! The install is followed by a poll on the lockfile hash, because some
//! package managers return before the lockfile is fully written.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::error::BenchError;
use crate::exec::Shell;
use crate::manifest::{self, PackageManifest};
use crate::model::PackageManager;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy)]
pub struct LockfileWait {
  pub interval: Duration,
  pub timeout: Duration,
}

impl Default for LockfileWait {
  fn default() -> Self {
    Self { interval: Duration::from_millis(500), timeout: Duration::from_secs(60) }
  }
}

/// Walk up from `start` until a lockfile is found or the repository root (`.git`) is reached.
/// Checks npm, then yarn, then pnpm in each directory; falls back to npm at `start`.
pub fn find_package_manager(start: &Path) -> (PackageManager, PathBuf) {
  const ORDER: [PackageManager; 3] = [PackageManager::Npm, PackageManager::Yarn, PackageManager::Pnpm];

  let mut current = Some(start);
  while let Some(dir) = current {
    for pm in ORDER {
      let candidate = dir.join(pm.lockfile());
      if candidate.exists() {
        return (pm, candidate);
      }
    }
    if dir.join(".git").exists() {
      break;
    }
    current = dir.parent();
  }

  (PackageManager::Npm, start.join(PackageManager::Npm.lockfile()))
}

/// Hex sha256 of the file contents; empty when the file does not exist.
pub fn file_hash(path: &Path) -> Result<String> {
  if !path.exists() {
    return Ok(String::new());
  }
  let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
  Ok(hex::encode(Sha256::digest(&bytes)))
}

pub fn wait_for_file_change(path: &Path, initial_hash: &str, wait: LockfileWait) -> Result<()> {
  let started = Instant::now();

  loop {
    if file_hash(path)? != initial_hash {
      return Ok(());
    }
    if started.elapsed() >= wait.timeout {
      return Err(BenchError::Timeout { waited: wait.timeout, path: path.to_path_buf() }.into());
    }
    std::thread::sleep(wait.interval);
  }
}

/// Bump `package` (and `@types/<package>`) to the registry's latest and reinstall.
/// Returns the first package actually upgraded, or `None` when nothing changed.
pub fn upgrade_package(
  shell: &dyn Shell,
  dir: &Path,
  registry: &dyn Registry,
  package: &str,
  wait: LockfileWait,
) -> Result<Option<String>> {
  let (pm, lockfile) = find_package_manager(dir);
  tracing::info!("[upgrade] package manager: {} ({})", pm, lockfile.display());
  let initial = file_hash(&lockfile)?;

  let mut manifest = PackageManifest::load(dir)?;
  let mut upgraded: Vec<String> = Vec::new();

  for name in [package.to_string(), format!("@types/{}", package)] {
    let Some(current) = manifest.version_of(&name).map(str::to_string) else { continue };
    let Some(latest) = registry.latest_version(&name)? else { continue };

    let next = manifest::upgraded_spec(&current, &latest);
    if next == current {
      continue;
    }
    tracing::info!("[upgrade] {} {} -> {}", name, current, next);
    manifest.set_version(&name, &next);
    upgraded.push(name);
  }

  if upgraded.is_empty() {
    tracing::info!("[upgrade] {} is already at the latest version", package);
    return Ok(None);
  }

  manifest.save()?;
  shell
    .run(dir, &format!("{} install", pm.command()))
    .with_context(|| format!("{} install after upgrading {}", pm, package))?;
  wait_for_file_change(&lockfile, &initial, wait)?;

  Ok(upgraded.into_iter().next())
}
