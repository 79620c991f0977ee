// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed failure taxonomy shared by the fetcher, harness, parser and generators
// role: errors/taxonomy
// outputs: BenchError variants carried inside anyhow::Error chains; is_fatal classifier
// invariants:
// - NotFound is never an error (absent remote items are None); PatchRejected is an outcome, not an error
// - RateLimited, Remote and ParseInvalid abort a run; everything else is local to one item
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
  /// The remote quota is exhausted; callers must stop or wait externally.
  #[error("remote rate limit exhausted: {0}")]
  RateLimited(String),

  /// The remote rejected the query for a reason other than a missing item.
  #[error("remote query failed: {0}")]
  Remote(String),

  #[error("command `{command}` failed: {stderr}")]
  Command { command: String, stderr: String },

  /// A parsed diagnostic did not satisfy the diagnostic shape.
  #[error("diagnostic failed shape validation: {0}")]
  ParseInvalid(String),

  #[error("timed out after {waited:?} waiting for {} to change", path.display())]
  Timeout { waited: Duration, path: PathBuf },
}

/// True when the error chain carries a failure that should abort the whole run
/// rather than only the current repository or candidate.
pub fn is_fatal(err: &anyhow::Error) -> bool {
  err.chain().any(|cause| {
    matches!(
      cause.downcast_ref::<BenchError>(),
      Some(BenchError::RateLimited(_)) | Some(BenchError::Remote(_)) | Some(BenchError::ParseInvalid(_))
    )
  })
}
