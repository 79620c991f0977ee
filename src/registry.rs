//! Latest-version lookup for published packages.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const NPM_REGISTRY: &str = "https://registry.npmjs.org";

/// JSON object of `{ "<package>": "<latest>" }` served instead of the npm registry.
pub const FIXTURE_REGISTRY_ENV: &str = "UPGRADE_BENCH_FIXTURE_REGISTRY";

// --- Trait seam for the package registry ---
pub trait Registry {
  /// `dist-tags.latest` for `package`, or `None` when the registry does not know it.
  fn latest_version(&self, package: &str) -> Result<Option<String>>;
}

pub struct NpmRegistry {
  base_url: String,
  agent: ureq::Agent,
}

impl NpmRegistry {
  pub fn new() -> Self {
    Self::with_base_url(NPM_REGISTRY)
  }

  pub fn with_base_url(base_url: &str) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder().http_status_as_error(false).build().into();
    Self { base_url: base_url.trim_end_matches('/').to_string(), agent }
  }
}

impl Default for NpmRegistry {
  fn default() -> Self {
    Self::new()
  }
}

#[derive(Debug, Deserialize)]
struct DistTags {
  latest: Option<String>,
}

/// Scoped names keep their `@` but escape the slash (`@scope%2Fname`).
pub fn encode_package_name(package: &str) -> String {
  package.replace('/', "%2F")
}

impl Registry for NpmRegistry {
  fn latest_version(&self, package: &str) -> Result<Option<String>> {
    let url = format!("{}/-/package/{}/dist-tags", self.base_url, encode_package_name(package));

    let mut resp = self
      .agent
      .get(&url)
      .header("Accept", "application/json")
      .call()
      .with_context(|| format!("fetching {}", url))?;

    match resp.status().as_u16() {
      404 => Ok(None),
      s if (200..300).contains(&s) => {
        let tags: DistTags = resp.body_mut().read_json().with_context(|| format!("decoding {}", url))?;
        Ok(tags.latest)
      }
      s => bail!("registry lookup for {} failed: HTTP {}", package, s),
    }
  }
}

/// Fixed name → version table; backs the fixture env var and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
  versions: BTreeMap<String, String>,
}

impl StaticRegistry {
  pub fn new<I, K, V>(entries: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self { versions: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
  }

  pub fn from_env() -> Result<Option<Self>> {
    let Ok(raw) = std::env::var(FIXTURE_REGISTRY_ENV) else {
      return Ok(None);
    };
    let versions: BTreeMap<String, String> =
      serde_json::from_str(&raw).with_context(|| format!("parsing {}", FIXTURE_REGISTRY_ENV))?;
    Ok(Some(Self { versions }))
  }
}

impl Registry for StaticRegistry {
  fn latest_version(&self, package: &str) -> Result<Option<String>> {
    Ok(self.versions.get(package).cloned())
  }
}

pub fn build_registry() -> Result<Box<dyn Registry>> {
  match StaticRegistry::from_env()? {
    Some(fixture) => Ok(Box::new(fixture)),
    None => Ok(Box::new(NpmRegistry::new())),
  }
}
