// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Type-check a checkout with tsc under a runtime activation and return parsed diagnostics
// role: harness/compiler
// inputs: Shell, working directory, Activation
// outputs: Vec<Diagnostic> in output order
// side_effects: Spawns tsc
// invariants:
// - tsc exiting non-zero is the normal "has errors" path; stdout is parsed either way
// - --pretty is required so positions are printed in the colon layout
// errors: Missing tsc binary is an error; shape failures surface as BenchError::ParseInvalid
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{bail, Result};

use crate::diagnostics::{self, Diagnostic};
use crate::exec::Shell;
use crate::nvm::Activation;

pub const TSC_COMMAND: &str = "tsc --noEmit --pretty --skipLibCheck";

fn tsc_missing(stderr: &str) -> bool {
  stderr.contains("command not found: tsc") || stderr.contains("tsc: command not found")
}

pub fn type_check(shell: &dyn Shell, dir: &Path, activation: &Activation) -> Result<Vec<Diagnostic>> {
  tracing::info!("[tsc] type-checking {}", dir.display());

  let out = shell.run_unchecked(dir, &activation.wrap(TSC_COMMAND))?;
  if !out.success && tsc_missing(&out.stderr) {
    bail!("TypeScript is not installed: `tsc` was not found in {}", dir.display());
  }

  let found = diagnostics::parse(&out.stdout)?;
  tracing::info!("[tsc] {} diagnostic(s)", found.len());
  Ok(found)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::exec::testing::{fail, fail_with_stdout, ok, ScriptedShell};

  #[test]
  fn errors_on_stdout_are_parsed_despite_exit_code() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::new(|_, _| {
      fail_with_stdout(
        "src/a.ts:3:7 - error TS2322: Type 'string' is not assignable to type 'number'.\n\nFound 1 error in src/a.ts:3\n",
      )
    });
    let act = Activation::new(". ~/.nvm/nvm.sh && nvm use");
    let found = type_check(&shell, td.path(), &act).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].code, "TS2322");
    assert_eq!(shell.commands()[0], ". ~/.nvm/nvm.sh && nvm use && tsc --noEmit --pretty --skipLibCheck");
  }

  #[test]
  fn clean_project_yields_nothing() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::new(|_, _| ok(""));
    let found = type_check(&shell, td.path(), &Activation::new("true")).unwrap();
    assert!(found.is_empty());
  }

  #[test]
  fn missing_tsc_is_an_error() {
    let td = tempfile::TempDir::new().unwrap();
    let shell = ScriptedShell::new(|_, _| fail("bash: line 1: tsc: command not found"));
    let err = type_check(&shell, td.path(), &Activation::new("true")).unwrap_err();
    assert!(format!("{err}").contains("TypeScript is not installed"));
  }
}
