//! Task mining. `repos` reproduces regressions by upgrading dependencies in
//! candidate repositories; `pulls` screens historical dependency-bump pull
//! requests using remote metadata only.

pub mod pulls;
pub mod repos;

use serde::Serialize;

/// Per-run tallies, printed as JSON by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
  pub candidates: usize,
  pub emitted: usize,
  pub skipped: usize,
  pub failed: usize,
}

impl RunSummary {
  pub(crate) fn record_skip(&mut self, subject: &str, reason: impl std::fmt::Display) {
    tracing::info!("[generator] skipping {}: {}", subject, reason);
    self.skipped += 1;
  }
}
