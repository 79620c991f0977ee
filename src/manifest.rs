// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Read, query and rewrite package.json without disturbing unrelated keys
// role: persistence/manifest
// inputs: Repository directory containing package.json
// outputs: Dependency listing; rewritten package.json (2-space indent, trailing newline)
// side_effects: Writes package.json on save()
// invariants:
// - Key order is preserved (serde_json preserve_order)
// - A rewrite touches the entry in dependencies and devDependencies alike, never adds one
// - Noise packages (@types/*, *prettier*, *eslint*) are never upgrade candidates
// errors: IO/JSON errors surfaced with full path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const MANIFEST_FILE: &str = "package.json";

const DEPENDENCY_SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

static RE_VERSION_CORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
  pub name: String,
  pub spec: String,
}

#[derive(Debug, Clone)]
pub struct PackageManifest {
  path: PathBuf,
  value: Value,
}

impl PackageManifest {
  pub fn load(dir: &Path) -> Result<Self> {
    let path = dir.join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Self { path, value })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn section(&self, name: &str) -> Option<&Map<String, Value>> {
    self.value.get(name).and_then(|v| v.as_object())
  }

  /// Every string-valued entry of dependencies then devDependencies; a name listed in both appears once.
  pub fn dependencies(&self) -> Vec<Dependency> {
    let mut out: Vec<Dependency> = Vec::new();

    for section in DEPENDENCY_SECTIONS {
      let Some(map) = self.section(section) else { continue };
      for (name, spec) in map {
        let Some(spec) = spec.as_str() else { continue };
        if out.iter().any(|d| &d.name == name) {
          continue;
        }
        out.push(Dependency { name: name.clone(), spec: spec.to_string() });
      }
    }

    out
  }

  pub fn version_of(&self, package: &str) -> Option<&str> {
    DEPENDENCY_SECTIONS
      .iter()
      .find_map(|s| self.section(s).and_then(|m| m.get(package)).and_then(|v| v.as_str()))
  }

  /// Point every existing entry for `package` at `spec`. Returns how many entries changed.
  pub fn set_version(&mut self, package: &str, spec: &str) -> usize {
    let mut changed = 0;

    for section in DEPENDENCY_SECTIONS {
      if let Some(entry) = self
        .value
        .get_mut(section)
        .and_then(|v| v.as_object_mut())
        .and_then(|m| m.get_mut(package))
      {
        *entry = Value::String(spec.to_string());
        changed += 1;
      }
    }

    changed
  }

  pub fn save(&self) -> Result<()> {
    let mut text = serde_json::to_string_pretty(&self.value)?;
    text.push('\n');
    std::fs::write(&self.path, text).with_context(|| format!("writing {}", self.path.display()))
  }
}

/// Type declarations and lint/format tooling; never benchmark material.
pub fn is_noise(package: &str) -> bool {
  package.starts_with("@types") || package.contains("prettier") || package.contains("eslint")
}

/// Major version of the first version-looking run in `spec` (`^4.17.1` → 4, `v18` → 18).
pub fn coerce_major(spec: &str) -> Option<u64> {
  RE_VERSION_CORE.captures(spec)?.get(1)?.as_str().parse().ok()
}

/// Leading range operator that should survive an upgrade (`^`, `~`, or nothing).
pub fn range_prefix(spec: &str) -> &'static str {
  match spec.trim_start().chars().next() {
    Some('^') => "^",
    Some('~') => "~",
    _ => "",
  }
}

/// The replacement spec for `current` when moving to `latest`.
pub fn upgraded_spec(current: &str, latest: &str) -> String {
  format!("{}{}", range_prefix(current), latest)
}

/// True when `latest` is on a different major line than `current`. Unparseable versions are never candidates.
pub fn is_major_change(current: &str, latest: &str) -> bool {
  match (coerce_major(current), coerce_major(latest)) {
    (Some(a), Some(b)) => a != b,
    _ => false,
  }
}
