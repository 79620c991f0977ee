// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Resolve a node runtime through nvm and hand back a reusable activation prefix
// role: environment/runtime
// inputs: Shell, working directory (for .nvmrc), optional target version
// outputs: Activation ("<source nvm> nvm use ...") to prefix later commands
// side_effects: May run `nvm install`; installs yarn and pnpm globally under the activation
// invariants:
// - Explicit version: use → install → use; fatal only when both attempts fail
// - No version: .nvmrc pin if present, otherwise latest LTS
// - Package manager installs are best-effort (logged, not raised)
// errors: anyhow with the failing nvm command in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::exec::{shell_quote, Shell};

// `.` works for /bin/sh and bash alike; `source` does not.
const SOURCE_NVM: &str = ". ~/.nvm/nvm.sh &&";

const GLOBAL_PACKAGE_MANAGERS: [&str; 2] = ["yarn", "pnpm"];

/// Command prefix that selects a node runtime before running a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation(String);

impl Activation {
  pub fn new(prefix: impl Into<String>) -> Self {
    Self(prefix.into())
  }

  pub fn prefix(&self) -> &str {
    &self.0
  }

  /// `"<prefix> && <command>"`
  pub fn wrap(&self, command: &str) -> String {
    format!("{} && {}", self.0, command)
  }
}

impl fmt::Display for Activation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

fn nvm(args: &str) -> String {
  format!("{} nvm {}", SOURCE_NVM, args)
}

/// Resolve the runtime for `dir` and make sure the alternate package managers exist.
pub fn resolve_activation(shell: &dyn Shell, dir: &Path, target: Option<&str>) -> Result<Activation> {
  let activation = match target {
    Some(version) => activate_explicit(shell, dir, version)?,
    None => activate_from_dir(shell, dir),
  };

  install_package_managers(shell, dir, &activation);
  Ok(activation)
}

fn activate_explicit(shell: &dyn Shell, dir: &Path, version: &str) -> Result<Activation> {
  let use_cmd = nvm(&format!("use {}", shell_quote(version)));

  if shell.run(dir, &use_cmd).is_ok() {
    return Ok(Activation::new(use_cmd));
  }

  tracing::info!("[nvm] node {} not available, installing", version);
  shell
    .run(dir, &nvm(&format!("install {}", shell_quote(version))))
    .with_context(|| format!("installing node {}", version))?;
  shell
    .run(dir, &use_cmd)
    .with_context(|| format!("activating node {} after install", version))?;

  Ok(Activation::new(use_cmd))
}

fn activate_from_dir(shell: &dyn Shell, dir: &Path) -> Activation {
  let pin = std::fs::read_to_string(dir.join(".nvmrc"))
    .ok()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty());

  match pin {
    None => {
      tracing::debug!("[nvm] no .nvmrc in {}, using latest LTS", dir.display());
      if let Err(e) = shell.run(dir, &nvm("install --lts")) {
        tracing::debug!("[nvm] `nvm install --lts` failed: {:#}", e);
      }
      Activation::new(nvm(r"use lts/\*"))
    }
    Some(pin) => {
      if shell.run(dir, &nvm(&format!("version {}", shell_quote(&pin)))).is_ok() {
        tracing::debug!("[nvm] using .nvmrc pin {}", pin);
      } else {
        tracing::info!("[nvm] installing .nvmrc pin {}", pin);
        if let Err(e) = shell.run(dir, &nvm("install")) {
          tracing::debug!("[nvm] `nvm install` failed: {:#}", e);
        }
      }
      Activation::new(nvm("use"))
    }
  }
}

fn install_package_managers(shell: &dyn Shell, dir: &Path, activation: &Activation) {
  for pm in GLOBAL_PACKAGE_MANAGERS {
    if let Err(e) = shell.run(dir, &activation.wrap(&format!("npm install -g {}", pm))) {
      tracing::warn!("[nvm] could not install {} globally: {:#}", pm, e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::exec::testing::{fail, ok, ScriptedShell};
  use std::cell::Cell;
  use std::rc::Rc;

  #[test]
  fn explicit_version_used_directly_when_present() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::permissive();
    let act = resolve_activation(&shell, td.path(), Some("v18.19.0")).unwrap();
    assert_eq!(act.prefix(), ". ~/.nvm/nvm.sh && nvm use v18.19.0");
    assert_eq!(shell.count("nvm install"), 0);
    assert_eq!(shell.count("npm install -g yarn"), 1);
    assert_eq!(shell.count("npm install -g pnpm"), 1);
  }

  #[test]
  fn explicit_version_installs_then_retries_use() {
    let td = tempfile::TempDir::new().unwrap();
    let uses = Rc::new(Cell::new(0));
    let seen = uses.clone();
    let shell = ScriptedShell::new(move |_, cmd| {
      if cmd.ends_with("nvm use v16") {
        seen.set(seen.get() + 1);
        if seen.get() == 1 {
          return fail("N/A: version \"v16\" is not yet installed.");
        }
      }
      ok("")
    });
    let act = resolve_activation(&shell, td.path(), Some("v16")).unwrap();
    assert_eq!(act.prefix(), ". ~/.nvm/nvm.sh && nvm use v16");
    assert_eq!(uses.get(), 2);
    assert_eq!(shell.count("nvm install v16"), 1);
  }

  #[test]
  fn explicit_version_fails_when_install_fails() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::new(|_, cmd| if cmd.contains("nvm ") { fail("nope") } else { ok("") });
    assert!(resolve_activation(&shell, td.path(), Some("v99")).is_err());
  }

  #[test]
  fn no_pin_uses_lts() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::permissive();
    let act = resolve_activation(&shell, td.path(), None).unwrap();
    assert_eq!(act.prefix(), r". ~/.nvm/nvm.sh && nvm use lts/\*");
    assert_eq!(shell.count("nvm install --lts"), 1);
  }

  #[test]
  fn pin_file_installs_when_missing() {
    let td = tempfile::TempDir::new().unwrap();
    std::fs::write(td.path().join(".nvmrc"), "18.17.1\n").unwrap();
    let shell = ScriptedShell::new(|_, cmd| if cmd.contains("nvm version") { fail("N/A") } else { ok("") });
    let act = resolve_activation(&shell, td.path(), None).unwrap();
    assert_eq!(act.prefix(), ". ~/.nvm/nvm.sh && nvm use");
    assert_eq!(shell.count("nvm version 18.17.1"), 1);
    assert!(shell.commands().iter().any(|c| c.ends_with("nvm install")));
  }

  #[test]
  fn package_manager_failures_are_tolerated() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::new(|_, cmd| if cmd.contains("npm install -g") { fail("EACCES") } else { ok("") });
    assert!(resolve_activation(&shell, td.path(), Some("v20.12.2")).is_ok());
  }

  #[test]
  fn wrap_joins_with_and() {
    let act = Activation::new(". ~/.nvm/nvm.sh && nvm use");
    assert_eq!(act.wrap("npm install"), ". ~/.nvm/nvm.sh && nvm use && npm install");
  }
}
