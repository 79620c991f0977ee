//! Aliased GraphQL query builders. Each item in a batch becomes one
//! `repository(...)` selection under its own alias.

/// First-N window on PR changed files.
pub const PR_FILES_LIMIT: usize = 10;
pub const CHECK_SUITES_LIMIT: usize = 10;

/// Render a GraphQL string literal; JSON string escaping is valid GraphQL.
fn literal(s: &str) -> String {
  serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

pub struct SnapshotSelection<'a> {
  pub alias: &'a str,
  pub owner: &'a str,
  pub name: &'a str,
  pub reference: &'a str,
}

pub struct PullRequestSelection<'a> {
  pub alias: &'a str,
  pub owner: &'a str,
  pub name: &'a str,
  pub number: u64,
}

/// Top-level tree entries (with blob text/size) at `<reference>:` for each repository.
pub fn snapshot_query(items: &[SnapshotSelection<'_>]) -> String {
  let selections: Vec<String> = items
    .iter()
    .map(|it| {
      format!(
        "{}: repository(owner: {}, name: {}) {{ object(expression: {}) {{ ... on Tree {{ entries {{ name object {{ ... on Blob {{ byteSize text }} }} }} }} }} }}",
        it.alias,
        literal(it.owner),
        literal(it.name),
        literal(&format!("{}:", it.reference)),
      )
    })
    .collect();

  format!("query {{\n{}\n}}", selections.join("\n"))
}

/// Creation time, first commit's check suites and changed-file stats for each pull request.
pub fn pull_request_query(items: &[PullRequestSelection<'_>]) -> String {
  let selections: Vec<String> = items
    .iter()
    .map(|it| {
      format!(
        "{}: repository(owner: {}, name: {}) {{ pullRequest(number: {}) {{ createdAt commits(first: 1) {{ nodes {{ commit {{ checkSuites(first: {}) {{ nodes {{ conclusion }} }} }} }} }} files(first: {}) {{ nodes {{ changeType additions deletions path }} }} }} }}",
        it.alias,
        literal(it.owner),
        literal(it.name),
        it.number,
        CHECK_SUITES_LIMIT,
        PR_FILES_LIMIT,
      )
    })
    .collect();

  format!("query {{\n{}\n}}", selections.join("\n"))
}
