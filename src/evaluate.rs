// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Replay a stored task with a candidate patch and record whether the regression is fixed
// role: evaluation/runner
// inputs: Shell, Task, Prediction, workspace root, log directory
// outputs: EvalOutcome; <id>.<model>.eval.log containing "true" or "false"
// side_effects: Clones into <workspace_root>/<task id>; installs; runs tsc; writes artifacts
// invariants:
// - A rejected patch is a failure and nothing is compiled after it
// - Success iff post-patch diagnostics <= baseline diagnostics
// - An artifact is written only for a completed evaluation
// errors: Setup failures skip the pair (no artifact); is_fatal errors abort the run
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::is_fatal;
use crate::exec::Shell;
use crate::model::{EvalOutcome, Prediction, Task};
use crate::nvm::resolve_activation;
use crate::store;
use crate::workspace::Workspace;

pub struct Evaluator<'a> {
  pub shell: &'a dyn Shell,
  pub workspace_root: PathBuf,
  pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvalSummary {
  pub evaluated: usize,
  pub resolved: usize,
  pub unmatched: usize,
  pub errored: usize,
}

impl<'a> Evaluator<'a> {
  /// Clone at the task commit, take the baseline, apply the patch, compare.
  pub fn score(&self, task: &Task, prediction: &Prediction) -> Result<EvalOutcome> {
    let ws = Workspace::new(self.shell, self.workspace_root.join(&task.id));

    ws.prepare(&task.repo_url())?;
    ws.checkout_ref(&task.commit)?;
    let activation = resolve_activation(self.shell, ws.dir(), Some(&task.node_version))?;

    ws.install(&activation, task.package_manager)?;
    let before = ws.compile(&activation)?.len();
    if before > 0 {
      tracing::warn!("[evaluate] invalid task {}: {} diagnostic(s) before patching", task.id, before);
    }

    ws.reset_hard()?;
    if !ws.apply_patch(&prediction.patch)? {
      tracing::warn!("[evaluate] {}: patch from {} did not apply", task.id, prediction.model_name);
      return Ok(EvalOutcome::PatchRejected);
    }

    ws.install(&activation, task.package_manager)?;
    let after = ws.compile(&activation)?.len();

    Ok(EvalOutcome::from_counts(before, after))
  }

  /// Score one pair and persist its artifact.
  pub fn evaluate(&self, task: &Task, prediction: &Prediction) -> Result<bool> {
    tracing::info!("[evaluate] {} with {}", task.id, prediction.model_name);

    let outcome = self
      .score(task, prediction)
      .with_context(|| format!("evaluating {} for {}", task.id, prediction.model_name))?;
    let success = outcome.success();

    match outcome {
      EvalOutcome::Resolved { before, after } => {
        tracing::info!("[evaluate] {} resolved ({} -> {} diagnostics)", task.id, before, after)
      }
      EvalOutcome::Regressed { before, after } => {
        tracing::info!("[evaluate] {} failed ({} -> {} diagnostics)", task.id, before, after)
      }
      EvalOutcome::PatchRejected => tracing::info!("[evaluate] {} failed (patch rejected)", task.id),
    }

    let path = store::write_eval_result(&self.log_dir, &task.id, &prediction.model_name, success)?;
    tracing::debug!("[evaluate] wrote {}", path.display());
    Ok(success)
  }

  /// Pair predictions with tasks by id and evaluate each pair in order.
  pub fn evaluate_all(&self, tasks: &[Task], predictions: &[Prediction], only: Option<&str>) -> Result<EvalSummary> {
    let by_id: BTreeMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut summary = EvalSummary::default();

    for prediction in predictions {
      if only.is_some_and(|id| id != prediction.id) {
        continue;
      }

      let Some(task) = by_id.get(prediction.id.as_str()) else {
        tracing::warn!("[evaluate] no task with id {}, skipping", prediction.id);
        summary.unmatched += 1;
        continue;
      };

      match self.evaluate(task, prediction) {
        Ok(success) => {
          summary.evaluated += 1;
          if success {
            summary.resolved += 1;
          }
        }
        Err(e) if is_fatal(&e) => return Err(e),
        Err(e) => {
          tracing::warn!("[evaluate] {:#}", e);
          summary.errored += 1;
        }
      }
    }

    Ok(summary)
  }
}
