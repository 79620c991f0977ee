// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fetch repository snapshots and pull-request summaries in aliased GraphQL batches
// role: github/batch
// inputs: GithubApi, SnapshotRequest / PullRequestRequest lists
// outputs: BTreeMap keyed by "owner/name/ref" or "owner/name/number"; None marks a missing item
// side_effects: One GraphQL request per batch of 25
// invariants:
// - Every input key appears exactly once in the output
// - Aliases are "k" + lowercase hex of the key (valid GraphQL names, reversible)
// - All-NOT_FOUND errors are tolerated; RATE_LIMITED, or zero quota on a failed reply, raises RateLimited; anything else raises Remote
// errors: BenchError::RateLimited, BenchError::Remote (both fatal to the run)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::error::BenchError;
use crate::github::api::{GithubApi, GraphqlReply};
use crate::github::queries::{pull_request_query, snapshot_query, PullRequestSelection, SnapshotSelection};
use crate::github::response::{PullRequestSummary, RepositoryPullNode, RepositorySnapshot, RepositoryTreeNode};

pub const BATCH_SIZE: usize = 25;
const DEFAULT_REF: &str = "HEAD";

pub fn encode_alias(key: &str) -> String {
  format!("k{}", hex::encode(key.as_bytes()))
}

pub fn decode_alias(alias: &str) -> Option<String> {
  let bytes = hex::decode(alias.strip_prefix('k')?).ok()?;
  String::from_utf8(bytes).ok()
}

pub fn chunked<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
  items.chunks(BATCH_SIZE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
  pub owner: String,
  pub name: String,
  /// Commit sha, branch or tag; `HEAD` when absent.
  pub reference: Option<String>,
}

impl SnapshotRequest {
  pub fn new(owner: impl Into<String>, name: impl Into<String>, reference: Option<String>) -> Self {
    Self { owner: owner.into(), name: name.into(), reference }
  }

  pub fn reference(&self) -> &str {
    self.reference.as_deref().unwrap_or(DEFAULT_REF)
  }

  pub fn key(&self) -> String {
    format!("{}/{}/{}", self.owner, self.name, self.reference())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRequest {
  pub owner: String,
  pub name: String,
  pub number: u64,
}

impl PullRequestRequest {
  pub fn key(&self) -> String {
    format!("{}/{}/{}", self.owner, self.name, self.number)
  }
}

/// Decide whether a reply is usable. Partial data is fine when every error is NOT_FOUND.
/// A zero remaining quota only matters when the reply also failed.
fn classify(reply: &GraphqlReply) -> Result<()> {
  if reply.errors.iter().all(|e| e.is_not_found()) {
    if !reply.errors.is_empty() {
      tracing::debug!("[github] {} item(s) not found in batch", reply.errors.len());
    }
    return Ok(());
  }

  if reply.errors.iter().any(|e| e.is_rate_limited()) || reply.rate_limit_remaining == Some(0) {
    let detail = reply
      .errors
      .iter()
      .find(|e| e.is_rate_limited())
      .map(|e| e.message.clone())
      .unwrap_or_else(|| "x-ratelimit-remaining is 0".to_string());
    return Err(BenchError::RateLimited(detail).into());
  }

  let messages: Vec<&str> = reply
    .errors
    .iter()
    .filter(|e| !e.is_not_found())
    .map(|e| e.message.as_str())
    .collect();
  Err(BenchError::Remote(messages.join("; ")).into())
}

/// Turn the aliased `data` object into key → node, for the aliases this batch asked for.
fn collect_nodes<N, T>(
  reply: GraphqlReply,
  keys: &[String],
  convert: impl Fn(N) -> Option<T>,
) -> Result<BTreeMap<String, Option<T>>>
where
  N: DeserializeOwned,
{
  let mut out: BTreeMap<String, Option<T>> = keys.iter().map(|k| (k.clone(), None)).collect();

  let data = match reply.data {
    serde_json::Value::Object(map) => map,
    serde_json::Value::Null => return Ok(out),
    other => return Err(BenchError::Remote(format!("unexpected data payload: {}", other)).into()),
  };

  for (alias, value) in data {
    let Some(key) = decode_alias(&alias) else {
      tracing::debug!("[github] ignoring unknown alias {}", alias);
      continue;
    };
    if !out.contains_key(&key) || value.is_null() {
      continue;
    }

    let node: N = serde_json::from_value(value)
      .map_err(|e| BenchError::Remote(format!("malformed node for {}: {}", key, e)))?;
    out.insert(key, convert(node));
  }

  Ok(out)
}

pub fn fetch_snapshots(
  api: &dyn GithubApi,
  requests: &[SnapshotRequest],
) -> Result<BTreeMap<String, Option<RepositorySnapshot>>> {
  let mut out = BTreeMap::new();

  for (i, batch) in chunked(requests).enumerate() {
    let keys: Vec<String> = batch.iter().map(|r| r.key()).collect();
    let aliases: Vec<String> = keys.iter().map(|k| encode_alias(k)).collect();
    let selections: Vec<SnapshotSelection<'_>> = batch
      .iter()
      .zip(&aliases)
      .map(|(r, alias)| SnapshotSelection {
        alias,
        owner: &r.owner,
        name: &r.name,
        reference: r.reference(),
      })
      .collect();

    tracing::info!("[github] fetching snapshots batch {} ({} repos)", i + 1, batch.len());
    let reply = api
      .graphql(&snapshot_query(&selections))
      .with_context(|| format!("snapshot batch {}", i + 1))?;
    classify(&reply)?;
    out.extend(collect_nodes(reply, &keys, RepositoryTreeNode::into_snapshot)?);
  }

  Ok(out)
}

pub fn fetch_pull_requests(
  api: &dyn GithubApi,
  requests: &[PullRequestRequest],
) -> Result<BTreeMap<String, Option<PullRequestSummary>>> {
  let mut out = BTreeMap::new();

  for (i, batch) in chunked(requests).enumerate() {
    let keys: Vec<String> = batch.iter().map(|r| r.key()).collect();
    let aliases: Vec<String> = keys.iter().map(|k| encode_alias(k)).collect();
    let selections: Vec<PullRequestSelection<'_>> = batch
      .iter()
      .zip(&aliases)
      .map(|(r, alias)| PullRequestSelection { alias, owner: &r.owner, name: &r.name, number: r.number })
      .collect();

    tracing::info!("[github] fetching pull requests batch {} ({} PRs)", i + 1, batch.len());
    let reply = api
      .graphql(&pull_request_query(&selections))
      .with_context(|| format!("pull request batch {}", i + 1))?;
    classify(&reply)?;
    out.extend(collect_nodes(reply, &keys, RepositoryPullNode::into_summary)?);
  }

  Ok(out)
}
