// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Small helpers for paths, text normalization and man page rendering
// role: utilities/helpers
// inputs: Paths; diff text; clap CommandFactory
// outputs: Absolute paths, newline-terminated text, man page text
// invariants:
// - ensure_trailing_newline never adds a second newline
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

/// Absolute form of `p`; falls back to joining with the cwd when the path does not exist yet.
pub fn canonicalize_lossy<P: AsRef<Path>>(p: P) -> PathBuf {
  let p = p.as_ref();
  match std::fs::canonicalize(p) {
    Ok(x) => x,
    Err(_) => match std::env::current_dir() {
      Ok(cwd) => cwd.join(p),
      Err(_) => PathBuf::from(p),
    },
  }
}

pub fn ensure_trailing_newline(text: &str) -> Cow<'_, str> {
  if text.ends_with('\n') {
    Cow::Borrowed(text)
  } else {
    Cow::Owned(format!("{}\n", text))
  }
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
