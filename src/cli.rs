use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util;

#[derive(Parser, Debug)]
#[command(
    name = "upgrade-bench",
    version,
    about = "Mine and grade dependency-upgrade type-check regression tasks",
    long_about = None
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Option<Command>,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Trial-upgrade dependencies in candidate repositories and record regressions as tasks
  Collect(CollectArgs),
  /// Screen dependency-bump pull requests into tasks using GitHub metadata
  Validate(ValidateArgs),
  /// Replay tasks with predicted patches and write <id>.<model>.eval.log results
  Evaluate(EvaluateArgs),
  /// Upgrade one package (and its @types companion) in a local project
  Upgrade(UpgradeArgs),
  /// Parse tsc output (file or stdin) into JSON diagnostics
  Parse(ParseArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
  /// Attempts per GitHub request when throttled (1 = no retry)
  #[arg(long, default_value_t = 2)]
  pub retry_attempts: u32,
}

#[derive(Args, Debug)]
pub struct CollectArgs {
  /// CSV of candidate repositories (columns: owner, name)
  #[arg(long, default_value = "repos.csv")]
  pub repos: PathBuf,

  /// JSON task store; each new task is appended as soon as it is found
  #[arg(long, short = 'o', default_value = "tasks.json")]
  pub output: PathBuf,

  /// Only process the first N repositories
  #[arg(long, short = 'l')]
  pub limit: Option<usize>,

  /// Root for per-repository checkouts (default: <tmp>/workspace)
  #[arg(long)]
  pub workspace: Option<PathBuf>,

  #[command(flatten)]
  pub remote: RemoteArgs,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
  /// CSV of candidate pull requests (owner, name, pr_url, pr_title, number, base_sha)
  #[arg(long, default_value = "repos.csv")]
  pub input: PathBuf,

  /// Task store (.csv for tabular, anything else for JSON)
  #[arg(long, short = 'o', default_value = "matches.csv")]
  pub output: PathBuf,

  /// Only process the first N pull requests
  #[arg(long, short = 'l')]
  pub limit: Option<usize>,

  #[command(flatten)]
  pub remote: RemoteArgs,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
  /// Task store (.csv or JSON array)
  #[arg(long)]
  pub tasks: PathBuf,

  /// JSON array of predictions, or a directory of *.prediction.json files
  #[arg(long)]
  pub predictions: PathBuf,

  /// Directory for <id>.<model>.eval.log artifacts
  #[arg(long, default_value = "logs")]
  pub log_dir: PathBuf,

  /// Root for per-task checkouts (default: <tmp>/workspace)
  #[arg(long)]
  pub workspace: Option<PathBuf>,

  /// Evaluate only the prediction with this task id
  #[arg(long)]
  pub id: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpgradeArgs {
  /// Package to upgrade to its latest published version
  #[arg(long, short = 'p')]
  pub package: String,

  /// Project directory containing package.json
  #[arg(long, default_value = ".")]
  pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
  /// File with raw tsc output (default: stdin)
  #[arg(long)]
  pub file: Option<PathBuf>,
}

/// Fully-resolved command with absolute paths and defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EffectiveConfig {
  Collect {
    repos: PathBuf,
    output: PathBuf,
    limit: Option<usize>,
    workspace: PathBuf,
    retry_attempts: u32,
  },
  Validate {
    input: PathBuf,
    output: PathBuf,
    limit: Option<usize>,
    retry_attempts: u32,
  },
  Evaluate {
    tasks: PathBuf,
    predictions: PathBuf,
    log_dir: PathBuf,
    workspace: PathBuf,
    id: Option<String>,
  },
  Upgrade {
    package: String,
    dir: PathBuf,
  },
  Parse {
    file: Option<PathBuf>,
  },
}

pub fn default_workspace_root() -> PathBuf {
  std::env::temp_dir().join("workspace")
}

fn workspace_or_default(p: Option<PathBuf>) -> PathBuf {
  util::canonicalize_lossy(p.unwrap_or_else(default_workspace_root))
}

fn check_remote(remote: &RemoteArgs) -> Result<u32> {
  if remote.retry_attempts == 0 {
    bail!("--retry-attempts must be at least 1");
  }
  Ok(remote.retry_attempts)
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let Some(command) = cli.command else {
    bail!("No command given. Run with --help to see the available commands");
  };

  Ok(match command {
    Command::Collect(a) => EffectiveConfig::Collect {
      retry_attempts: check_remote(&a.remote)?,
      repos: util::canonicalize_lossy(&a.repos),
      output: util::canonicalize_lossy(&a.output),
      limit: a.limit,
      workspace: workspace_or_default(a.workspace),
    },
    Command::Validate(a) => EffectiveConfig::Validate {
      retry_attempts: check_remote(&a.remote)?,
      input: util::canonicalize_lossy(&a.input),
      output: util::canonicalize_lossy(&a.output),
      limit: a.limit,
    },
    Command::Evaluate(a) => EffectiveConfig::Evaluate {
      tasks: util::canonicalize_lossy(&a.tasks),
      predictions: util::canonicalize_lossy(&a.predictions),
      log_dir: util::canonicalize_lossy(&a.log_dir),
      workspace: workspace_or_default(a.workspace),
      id: a.id,
    },
    Command::Upgrade(a) => {
      if a.package.trim().is_empty() {
        bail!("--package must not be empty");
      }
      EffectiveConfig::Upgrade { package: a.package.trim().to_string(), dir: util::canonicalize_lossy(&a.dir) }
    }
    Command::Parse(a) => EffectiveConfig::Parse { file: a.file.as_deref().map(util::canonicalize_lossy) },
  })
}
