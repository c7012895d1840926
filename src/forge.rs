//! Forge REST API seam.
//!
//! The rollout logic only talks to [`ForgeApi`]; [`GithubClient`] is the
//! production implementation over blocking HTTP.
use crate::cli::RepoType;
use crate::error::ForgeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod github;
mod link;
#[cfg(test)]
pub(crate) mod testing;

pub use github::GithubClient;
pub use link::next_link;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: PullState,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Upsert of a single file through the contents endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FileCommit<'a> {
    #[serde(skip)]
    pub path: &'a str,
    pub message: &'a str,
    /// Base64-encoded file body.
    pub content: String,
    pub branch: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPull<'a> {
    pub title: &'a str,
    pub head: &'a str,
    pub base: &'a str,
    pub body: &'a str,
}

/// Raw outcome of a repository-dispatch request.
///
/// Non-2xx statuses are data here, not errors: the scheduler records them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: String,
}

impl DispatchResponse {
    pub fn is_accepted(&self) -> bool {
        self.status == 204
    }
}

pub trait ForgeApi {
    /// Full names (`owner/repo`) of every repository in `org`, across all pages.
    fn list_org_repos(&self, org: &str, repo_type: RepoType) -> Result<Vec<String>, ForgeError>;

    /// The repository's default branch, if its metadata names one.
    fn default_branch(&self, repo: &str) -> Result<Option<String>, ForgeError>;

    fn file_exists(&self, repo: &str, path: &str, branch: &str) -> Result<bool, ForgeError>;

    fn branch_exists(&self, repo: &str, branch: &str) -> Result<bool, ForgeError>;

    /// Commit SHA at the tip of `branch`.
    fn branch_sha(&self, repo: &str, branch: &str) -> Result<String, ForgeError>;

    fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), ForgeError>;

    fn put_file(&self, repo: &str, commit: &FileCommit<'_>) -> Result<(), ForgeError>;

    /// Pull requests in any state from `head` (`owner:branch`) into `base`.
    fn find_pulls(
        &self,
        repo: &str,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequest>, ForgeError>;

    fn create_pull(&self, repo: &str, pull: &NewPull<'_>) -> Result<PullRequest, ForgeError>;

    fn dispatch(
        &self,
        repo: &str,
        event_type: &str,
        client_payload: &Value,
    ) -> Result<DispatchResponse, ForgeError>;
}

/// Owner half of an `owner/repo` full name.
pub fn repo_owner(repo: &str) -> &str {
    repo.split_once('/').map(|(owner, _)| owner).unwrap_or(repo)
}
