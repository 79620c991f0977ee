// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Run shell command strings in an explicit working directory with captured output
// role: process/harness
// inputs: Working directory, a single command string (callers compose "activate && tool")
// outputs: stdout on success; CommandOutput for callers that inspect exit status themselves
// side_effects: Spawns `bash -c` subprocesses
// invariants:
// - Never changes the process-wide current directory
// - Non-zero exit ⇒ BenchError::Command carrying the command and stderr
// - stderr on a zero exit is logged, never an error
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use crate::error::BenchError;

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
  pub success: bool,
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

// --- Trait seam for process execution ---
pub trait Shell {
  /// Run and capture, regardless of exit status. Fails only if the process could not start.
  fn run_unchecked(&self, dir: &Path, command: &str) -> Result<CommandOutput>;

  /// Run and return stdout; a non-zero exit is a `BenchError::Command`.
  fn run(&self, dir: &Path, command: &str) -> Result<String> {
    let out = self.run_unchecked(dir, command)?;

    if !out.success {
      return Err(
        BenchError::Command {
          command: command.to_string(),
          stderr: out.stderr.trim().to_string(),
        }
        .into(),
      );
    }

    if !out.stderr.trim().is_empty() {
      tracing::debug!("[exec] `{}` wrote to stderr: {}", command, out.stderr.trim());
    }

    Ok(out.stdout)
  }
}

/// Runs commands through `bash -c` on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
  fn run_unchecked(&self, dir: &Path, command: &str) -> Result<CommandOutput> {
    tracing::debug!("[exec] ({}) {}", dir.display(), command);

    let out = Command::new("bash")
      .arg("-c")
      .arg(command)
      .current_dir(dir)
      .output()
      .with_context(|| format!("spawning `{}` in {}", command, dir.display()))?;

    Ok(CommandOutput {
      success: out.status.success(),
      code: out.status.code(),
      stdout: String::from_utf8_lossy(&out.stdout).to_string(),
      stderr: String::from_utf8_lossy(&out.stderr).to_string(),
    })
  }
}

/// Quote a value for safe interpolation into a `bash -c` string.
pub fn shell_quote(value: &str) -> String {
  if !value.is_empty()
    && value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '=' | '+' | ','))
  {
    return value.to_string();
  }
  format!("'{}'", value.replace('\'', r"'\''"))
}


/// Scripted stand-in for `SystemShell`; records every command it is asked to run.
#[cfg(any(test, feature = "testutil"))]
pub mod testing {
  use super::*;
  use std::cell::RefCell;

  type Handler = Box<dyn Fn(&Path, &str) -> CommandOutput>;

  pub struct ScriptedShell {
    handler: Handler,
    log: RefCell<Vec<String>>,
  }

  impl ScriptedShell {
    pub fn new<F>(handler: F) -> Self
    where
      F: Fn(&Path, &str) -> CommandOutput + 'static,
    {
      Self { handler: Box::new(handler), log: RefCell::new(Vec::new()) }
    }

    /// A shell where every command succeeds with empty output.
    pub fn permissive() -> Self {
      Self::new(|_, _| ok(""))
    }

    pub fn commands(&self) -> Vec<String> {
      self.log.borrow().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
      self.log.borrow().iter().filter(|c| c.contains(needle)).count()
    }
  }

  impl Shell for ScriptedShell {
    fn run_unchecked(&self, dir: &Path, command: &str) -> Result<CommandOutput> {
      self.log.borrow_mut().push(command.to_string());
      Ok((self.handler)(dir, command))
    }
  }

  pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput { success: true, code: Some(0), stdout: stdout.to_string(), stderr: String::new() }
  }

  pub fn fail(stderr: &str) -> CommandOutput {
    CommandOutput { success: false, code: Some(1), stdout: String::new(), stderr: stderr.to_string() }
  }

  /// Non-zero exit that still carries stdout, the way tsc reports type errors.
  pub fn fail_with_stdout(stdout: &str) -> CommandOutput {
    CommandOutput { success: false, code: Some(2), stdout: stdout.to_string(), stderr: String::new() }
  }
}
