// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Wire an EffectiveConfig to its backends and run it
// role: orchestration/dispatch
// inputs: EffectiveConfig (normalized CLI)
// outputs: JSON summaries or diagnostics on stdout; stores and artifacts on disk
// side_effects: Network (GitHub, npm registry), subprocesses, filesystem writes
// invariants:
// - Only stdout carries machine-readable output; logs go to stderr
// - Fixture env vars replace remote backends wholesale (no token lookup in fixture mode)
// errors: anyhow with context; fatal errors propagate to a non-zero exit
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::EffectiveConfig;
use crate::diagnostics;
use crate::evaluate::Evaluator;
use crate::exec::SystemShell;
use crate::generator::{pulls, repos::Collector};
use crate::github::api::env_wants_fixture;
use crate::github::{build_api, get_github_token, GithubApi, RetryPolicy};
use crate::model::{PullRequestCandidate, RepoCandidate};
use crate::registry::build_registry;
use crate::store;
use crate::upgrade::{upgrade_package, LockfileWait};

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn github(retry_attempts: u32) -> Result<Box<dyn GithubApi>> {
  let token = if env_wants_fixture() { None } else { get_github_token() };
  let defaults = RetryPolicy::default();
  let retry = RetryPolicy::new(retry_attempts, move |attempt, advised| defaults.delay_for(attempt, advised));
  build_api(token, retry)
}

fn take_limit<T>(mut rows: Vec<T>, limit: Option<usize>) -> Vec<T> {
  if let Some(n) = limit {
    rows.truncate(n);
  }
  rows
}

fn read_input(file: Option<&Path>) -> Result<String> {
  match file {
    Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())),
    None => {
      let mut buf = String::new();
      std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
      Ok(buf)
    }
  }
}

pub fn run(cfg: EffectiveConfig) -> Result<()> {
  match cfg {
    EffectiveConfig::Collect { repos, output, limit, workspace, retry_attempts } => {
      let candidates: Vec<RepoCandidate> = take_limit(store::read_csv(&repos)?, limit);
      let api = github(retry_attempts)?;
      let registry = build_registry()?;
      let collector = Collector {
        api: api.as_ref(),
        shell: &SystemShell,
        registry: registry.as_ref(),
        workspace_root: workspace,
        output,
      };
      print_json(&collector.collect(&candidates)?)
    }
    EffectiveConfig::Validate { input, output, limit, retry_attempts } => {
      let candidates: Vec<PullRequestCandidate> = take_limit(store::read_csv(&input)?, limit);
      let api = github(retry_attempts)?;
      print_json(&pulls::validate(api.as_ref(), &candidates, &output)?)
    }
    EffectiveConfig::Evaluate { tasks, predictions, log_dir, workspace, id } => {
      let tasks = store::load_tasks(&tasks)?;
      let predictions = store::load_predictions(&predictions)?;
      tracing::info!("[evaluate] {} task(s), {} prediction(s)", tasks.len(), predictions.len());
      let evaluator = Evaluator { shell: &SystemShell, workspace_root: workspace, log_dir };
      print_json(&evaluator.evaluate_all(&tasks, &predictions, id.as_deref())?)
    }
    EffectiveConfig::Upgrade { package, dir } => {
      let registry = build_registry()?;
      match upgrade_package(&SystemShell, &dir, registry.as_ref(), &package, LockfileWait::default())? {
        Some(name) => println!("{}", name),
        None => tracing::info!("[upgrade] nothing to upgrade for {}", package),
      }
      Ok(())
    }
    EffectiveConfig::Parse { file } => {
      let raw = read_input(file.as_deref())?;
      print_json(&diagnostics::parse(&raw)?)
    }
  }
}
