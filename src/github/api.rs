// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Transport seam for GitHub (GraphQL queries, PR diff download) plus token discovery
// role: github/api
// inputs: Bearer token (GITHUB_TOKEN, GH_TOKEN, or `gh auth token`); raw GraphQL query text
// outputs: GraphqlReply (data + typed errors + remaining quota); diff text
// side_effects: Network calls to api.github.com and github.com; spawns `gh` when discovering a token
// invariants:
// - HTTP throttling (429, or 403 with zero quota / retry-after) goes through RetryPolicy, never silently dropped
// - GraphQL-level errors are returned to the caller for classification, not raised here
// - Fixture backend is selected whenever UPGRADE_BENCH_FIXTURE_GRAPHQL is set
// errors: anyhow with URL context; BenchError::RateLimited / BenchError::Remote for remote refusals
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::error::BenchError;
use crate::github::retry::{with_retry, Attempt, RetryPolicy};

const GRAPHQL_URL: &str = "https://api.github.com/graphql";
const USER_AGENT: &str = "upgrade-bench";

pub const FIXTURE_GRAPHQL_ENV: &str = "UPGRADE_BENCH_FIXTURE_GRAPHQL";
pub const FIXTURE_DIFF_ENV: &str = "UPGRADE_BENCH_FIXTURE_DIFF";

/// One entry of a GraphQL `errors` array. `type` is GitHub's classification
/// (`NOT_FOUND`, `RATE_LIMITED`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GraphqlError {
  #[serde(rename = "type", default)]
  pub kind: Option<String>,
  #[serde(default)]
  pub message: String,
}

impl GraphqlError {
  pub fn is_not_found(&self) -> bool {
    self.kind.as_deref() == Some("NOT_FOUND")
  }

  pub fn is_rate_limited(&self) -> bool {
    self.kind.as_deref() == Some("RATE_LIMITED")
  }
}

#[derive(Debug, Clone, Default)]
pub struct GraphqlReply {
  pub data: serde_json::Value,
  pub errors: Vec<GraphqlError>,
  /// Value of `x-ratelimit-remaining`, when the transport saw one.
  pub rate_limit_remaining: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawReply {
  #[serde(default)]
  data: Option<serde_json::Value>,
  #[serde(default)]
  errors: Option<Vec<GraphqlError>>,
}

impl From<RawReply> for GraphqlReply {
  fn from(raw: RawReply) -> Self {
    Self {
      data: raw.data.unwrap_or(serde_json::Value::Null),
      errors: raw.errors.unwrap_or_default(),
      rate_limit_remaining: None,
    }
  }
}

// --- Trait seam for GitHub API ---
pub trait GithubApi {
  fn graphql(&self, query: &str) -> Result<GraphqlReply>;
  /// Unified diff of a pull request, fetched from `<pr_url>.diff`.
  fn pull_request_diff(&self, pr_url: &str) -> Result<String>;
}

pub struct HttpGithubApi {
  token: String,
  agent: ureq::Agent,
  retry: RetryPolicy,
}

impl HttpGithubApi {
  pub fn new(token: String) -> Self {
    Self::with_retry_policy(token, RetryPolicy::default())
  }

  pub fn with_retry_policy(token: String, retry: RetryPolicy) -> Self {
    // statuses are inspected by hand so throttling headers stay readable
    let agent: ureq::Agent = ureq::Agent::config_builder().http_status_as_error(false).build().into();
    Self { token, agent, retry }
  }
}

fn header_str<'a>(resp: &'a ureq::http::Response<ureq::Body>, name: &str) -> Option<&'a str> {
  resp.headers().get(name).and_then(|v| v.to_str().ok())
}

fn header_u64(resp: &ureq::http::Response<ureq::Body>, name: &str) -> Option<u64> {
  header_str(resp, name).and_then(|s| s.trim().parse::<u64>().ok())
}

/// Server-advised wait: `retry-after` seconds, else time until `x-ratelimit-reset`.
fn advised_delay(resp: &ureq::http::Response<ureq::Body>) -> Option<Duration> {
  if let Some(secs) = header_u64(resp, "retry-after") {
    return Some(Duration::from_secs(secs));
  }

  let reset = header_u64(resp, "x-ratelimit-reset")? as i64;
  let now = chrono::Utc::now().timestamp();
  Some(Duration::from_secs(reset.saturating_sub(now).max(0) as u64))
}

pub fn is_throttled(status: u16, remaining: Option<u64>, has_retry_after: bool) -> bool {
  status == 429 || (status == 403 && (remaining == Some(0) || has_retry_after))
}

impl GithubApi for HttpGithubApi {
  fn graphql(&self, query: &str) -> Result<GraphqlReply> {
    let body = serde_json::json!({ "query": query });

    with_retry(&self.retry, &std::thread::sleep, || {
      let mut resp = self
        .agent
        .post(GRAPHQL_URL)
        .header("Authorization", &format!("Bearer {}", self.token))
        .header("User-Agent", USER_AGENT)
        .send_json(&body)
        .context("sending GraphQL request")?;

      let status = resp.status().as_u16();
      let remaining = header_u64(&resp, "x-ratelimit-remaining");

      if is_throttled(status, remaining, header_str(&resp, "retry-after").is_some()) {
        return Ok(Attempt::Throttled {
          advised: advised_delay(&resp),
          detail: format!("HTTP {} from {}", status, GRAPHQL_URL),
        });
      }

      if !(200..300).contains(&status) {
        let text = resp.body_mut().read_to_string().unwrap_or_default();
        return Err(BenchError::Remote(format!("HTTP {}: {}", status, text.trim())).into());
      }

      let raw: RawReply = resp.body_mut().read_json().context("decoding GraphQL reply")?;
      let mut reply = GraphqlReply::from(raw);
      reply.rate_limit_remaining = remaining;

      Ok(Attempt::Done(reply))
    })
  }

  fn pull_request_diff(&self, pr_url: &str) -> Result<String> {
    let url = format!("{}.diff", pr_url.trim_end_matches('/'));

    let mut resp = self
      .agent
      .get(&url)
      .header("User-Agent", USER_AGENT)
      .call()
      .with_context(|| format!("fetching {}", url))?;

    let status = resp.status().as_u16();
    if !(200..300).contains(&status) {
      bail!("Failed to fetch {}: HTTP {}", url, status);
    }

    resp.body_mut().read_to_string().with_context(|| format!("reading {}", url))
  }
}

/// Serves canned replies from the environment; used by CLI tests.
pub struct FixtureGithubApi;

impl GithubApi for FixtureGithubApi {
  fn graphql(&self, _query: &str) -> Result<GraphqlReply> {
    let s = std::env::var(FIXTURE_GRAPHQL_ENV).with_context(|| format!("{} is not set", FIXTURE_GRAPHQL_ENV))?;
    let raw: RawReply = serde_json::from_str(&s).with_context(|| format!("parsing {}", FIXTURE_GRAPHQL_ENV))?;
    Ok(GraphqlReply::from(raw))
  }

  fn pull_request_diff(&self, pr_url: &str) -> Result<String> {
    std::env::var(FIXTURE_DIFF_ENV).with_context(|| format!("no fixture diff for {}", pr_url))
  }
}

pub fn env_wants_fixture() -> bool {
  std::env::var(FIXTURE_GRAPHQL_ENV).is_ok()
}

/// Discover a GitHub token: env vars first, then `gh auth token` if available.
pub fn get_github_token() -> Option<String> {
  for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(var) {
      if !t.trim().is_empty() {
        return Some(t.trim().to_string());
      }
    }
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

/// Pick the backend: fixtures when requested, otherwise HTTP with a token.
pub fn build_api(token: Option<String>, retry: RetryPolicy) -> Result<Box<dyn GithubApi>> {
  if env_wants_fixture() {
    return Ok(Box::new(FixtureGithubApi));
  }

  match token {
    Some(t) => Ok(Box::new(HttpGithubApi::with_retry_policy(t, retry))),
    None => bail!("Missing GitHub token. Set GITHUB_TOKEN or run: gh auth login"),
  }
}
