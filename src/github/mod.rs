pub mod api;
pub mod batch;
pub mod queries;
pub mod response;
pub mod retry;

pub use api::{build_api, get_github_token, GithubApi, GraphqlError, GraphqlReply};
pub use batch::{fetch_pull_requests, fetch_snapshots, PullRequestRequest, SnapshotRequest};
pub use response::{ChangedFile, PullRequestSummary, RepositorySnapshot};
pub use retry::RetryPolicy;
