// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Drive one repository checkout (clone, checkout, install, compile, patch, reset) in its own directory
// role: harness/repository
// inputs: Shell, working directory, repository URL, refs, activation, diff text
// outputs: Diagnostics, HEAD sha, patch application status, manifest diffs
// side_effects: Deletes and recreates the working directory; writes patch files to the system temp dir
// invariants:
// - Every command runs with the workspace dir as its explicit cwd; process cwd is never touched
// - Patches are normalized to end with a newline before `git apply`
// - A rejected patch is Ok(false), never an error
// errors: Clone/checkout/install failures are BenchError::Command with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::compiler;
use crate::diagnostics::Diagnostic;
use crate::exec::{shell_quote, Shell};
use crate::model::PackageManager;
use crate::nvm::Activation;
use crate::util::ensure_trailing_newline;

const APPLY_FLAGS: &str = "--ignore-space-change --ignore-whitespace --reject";

pub struct Workspace<'a> {
  shell: &'a dyn Shell,
  dir: PathBuf,
}

impl<'a> Workspace<'a> {
  pub fn new(shell: &'a dyn Shell, dir: impl Into<PathBuf>) -> Self {
    Self { shell, dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn shell(&self) -> &'a dyn Shell {
    self.shell
  }

  fn git(&self, args: &str) -> Result<String> {
    self.shell.run(&self.dir, &format!("git {}", args))
  }

  /// Fresh clone of `repo_url` into an emptied working directory.
  pub fn prepare(&self, repo_url: &str) -> Result<()> {
    if self.dir.exists() {
      std::fs::remove_dir_all(&self.dir).with_context(|| format!("clearing {}", self.dir.display()))?;
    }
    std::fs::create_dir_all(&self.dir).with_context(|| format!("creating {}", self.dir.display()))?;

    tracing::info!("[workspace] cloning {} into {}", repo_url, self.dir.display());
    self
      .git(&format!("clone {} .", shell_quote(repo_url)))
      .with_context(|| format!("cloning {}", repo_url))?;
    Ok(())
  }

  pub fn checkout_ref(&self, reference: &str) -> Result<()> {
    self
      .git(&format!("checkout {}", shell_quote(reference)))
      .with_context(|| format!("checking out {}", reference))?;
    Ok(())
  }

  pub fn head_commit(&self) -> Result<String> {
    Ok(self.git("rev-parse HEAD")?.trim().to_string())
  }

  pub fn install(&self, activation: &Activation, pm: PackageManager) -> Result<()> {
    tracing::info!("[workspace] {} install in {}", pm, self.dir.display());
    self
      .shell
      .run(&self.dir, &activation.wrap(&format!("{} install", pm.command())))
      .with_context(|| format!("{} install in {}", pm, self.dir.display()))?;
    Ok(())
  }

  pub fn compile(&self, activation: &Activation) -> Result<Vec<Diagnostic>> {
    compiler::type_check(self.shell, &self.dir, activation)
  }

  /// Apply a unified diff; `Ok(false)` when git rejects it.
  pub fn apply_patch(&self, diff: &str) -> Result<bool> {
    let millis = chrono::Utc::now().timestamp_millis();
    let patch_path = std::env::temp_dir().join(format!("patch-{}.diff", millis));
    std::fs::write(&patch_path, ensure_trailing_newline(diff).as_bytes())
      .with_context(|| format!("writing {}", patch_path.display()))?;

    let cmd = format!("git apply {} {}", APPLY_FLAGS, shell_quote(&patch_path.to_string_lossy()));
    let out = self.shell.run_unchecked(&self.dir, &cmd)?;
    let _ = std::fs::remove_file(&patch_path);

    if !out.success {
      tracing::warn!("[workspace] patch rejected in {}: {}", self.dir.display(), out.stderr.trim());
      return Ok(false);
    }
    Ok(true)
  }

  pub fn reset_hard(&self) -> Result<()> {
    self.git("reset --hard").context("git reset --hard")?;
    Ok(())
  }

  /// Working-tree diff limited to `paths`.
  pub fn diff(&self, paths: &[&str]) -> Result<String> {
    let quoted: Vec<String> = paths.iter().map(|p| shell_quote(p)).collect();
    self.git(&format!("diff -- {}", quoted.join(" ")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::exec::testing::{fail, ok, ScriptedShell};

  #[test]
  fn prepare_clears_directory_and_clones_into_it() {
    let td = tempfile::TempDir::new().unwrap();
    let dir = td.path().join("acme__web");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("stale.txt"), "old").unwrap();

    let shell = ScriptedShell::permissive();
    let ws = Workspace::new(&shell, &dir);
    ws.prepare("https://github.com/acme/web").unwrap();

    assert!(dir.exists());
    assert!(!dir.join("stale.txt").exists());
    assert_eq!(shell.commands(), vec!["git clone https://github.com/acme/web ."]);
  }

  #[test]
  fn install_runs_under_activation() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::permissive();
    let ws = Workspace::new(&shell, td.path());
    ws.install(&Activation::new("act"), PackageManager::Pnpm).unwrap();
    assert_eq!(shell.commands(), vec!["act && pnpm install"]);
  }

  #[test]
  fn install_failure_is_an_error() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::new(|_, _| fail("ERESOLVE"));
    let ws = Workspace::new(&shell, td.path());
    assert!(ws.install(&Activation::new("act"), PackageManager::Npm).is_err());
  }

  #[test]
  fn rejected_patch_is_false() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::new(|_, cmd| if cmd.starts_with("git apply") { fail("error: patch failed") } else { ok("") });
    let ws = Workspace::new(&shell, td.path());
    assert!(!ws.apply_patch("garbage").unwrap());
    let cmd = &shell.commands()[0];
    assert!(cmd.starts_with("git apply --ignore-space-change --ignore-whitespace --reject "));
    assert!(cmd.contains("patch-"));
  }

  #[test]
  fn head_commit_is_trimmed() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::new(|_, _| ok("0123abcd\n"));
    let ws = Workspace::new(&shell, td.path());
    assert_eq!(ws.head_commit().unwrap(), "0123abcd");
  }
}
