//! Blocking GitHub REST client.
use super::{next_link, DispatchResponse, FileCommit, ForgeApi, NewPull, PullRequest};
use crate::cli::RepoType;
use crate::error::ForgeError;
use crate::util::{flatten_error_body, truncate_string};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use ureq::http::Response;
use ureq::{Agent, Body};

const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: &str = "100";
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Deserialize)]
struct RepoSummary {
    full_name: String,
}

#[derive(Deserialize)]
struct RepoMetadata {
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Clone, Copy)]
enum WriteMethod {
    Post,
    Put,
}

impl WriteMethod {
    fn as_str(self) -> &'static str {
        match self {
            WriteMethod::Post => "POST",
            WriteMethod::Put => "PUT",
        }
    }
}

pub struct GithubClient {
    agent: Agent,
    api_url: String,
    authorization: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        // Statuses are inspected per endpoint; 404 is an answer, not a failure.
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_string(),
            authorization: format!("Bearer {token}"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response<Body>, ForgeError> {
        let start = Instant::now();
        let mut request = self
            .agent
            .get(url)
            .header("Authorization", &self.authorization)
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let response = request.call().map_err(|source| ForgeError::Transport {
            method: "GET",
            url: url.to_string(),
            source: Box::new(source),
        })?;
        tracing::debug!(
            url,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis(),
            "forge GET complete"
        );
        Ok(response)
    }

    fn send_json<T: Serialize>(
        &self,
        method: WriteMethod,
        url: &str,
        body: &T,
    ) -> Result<Response<Body>, ForgeError> {
        let start = Instant::now();
        let request = match method {
            WriteMethod::Post => self.agent.post(url),
            WriteMethod::Put => self.agent.put(url),
        };
        let response = request
            .header("Authorization", &self.authorization)
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .send_json(body)
            .map_err(|source| ForgeError::Transport {
                method: method.as_str(),
                url: url.to_string(),
                source: Box::new(source),
            })?;
        tracing::debug!(
            method = method.as_str(),
            url,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis(),
            "forge write complete"
        );
        Ok(response)
    }

    /// `true` on 2xx, `false` on 404, error otherwise.
    fn check_exists(&self, url: &str, query: &[(&str, &str)]) -> Result<bool, ForgeError> {
        let response = self.get(url, query)?;
        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        expect_success("GET", url, response).map(|_| true)
    }
}

fn expect_success(
    method: &'static str,
    url: &str,
    mut response: Response<Body>,
) -> Result<Response<Body>, ForgeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(ForgeError::Status {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body: truncate_string(&flatten_error_body(&body), ERROR_BODY_LIMIT),
    })
}

fn read_json<T: DeserializeOwned>(url: &str, mut response: Response<Body>) -> Result<T, ForgeError> {
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|err| ForgeError::Decode {
            url: url.to_string(),
            reason: err.to_string(),
        })
}

impl ForgeApi for GithubClient {
    fn list_org_repos(&self, org: &str, repo_type: RepoType) -> Result<Vec<String>, ForgeError> {
        let mut url = self.url(&format!("/orgs/{org}/repos"));
        let mut query = vec![("type", repo_type.as_query()), ("per_page", PER_PAGE)];
        let mut repos = Vec::new();
        loop {
            let response = expect_success("GET", &url, self.get(&url, &query)?)?;
            let next = response
                .headers()
                .get("link")
                .and_then(|value| value.to_str().ok())
                .and_then(next_link);
            let page: Vec<RepoSummary> = read_json(&url, response)?;
            repos.extend(page.into_iter().map(|repo| repo.full_name));
            match next {
                Some(next) => {
                    // The next link already carries the query string.
                    url = next;
                    query.clear();
                }
                None => break,
            }
        }
        tracing::info!(org, count = repos.len(), "listed organization repositories");
        Ok(repos)
    }

    fn default_branch(&self, repo: &str) -> Result<Option<String>, ForgeError> {
        let url = self.url(&format!("/repos/{repo}"));
        let response = expect_success("GET", &url, self.get(&url, &[])?)?;
        let metadata: RepoMetadata = read_json(&url, response)?;
        Ok(metadata.default_branch.filter(|branch| !branch.is_empty()))
    }

    fn file_exists(&self, repo: &str, path: &str, branch: &str) -> Result<bool, ForgeError> {
        let url = self.url(&format!("/repos/{repo}/contents/{path}"));
        self.check_exists(&url, &[("ref", branch)])
    }

    fn branch_exists(&self, repo: &str, branch: &str) -> Result<bool, ForgeError> {
        let url = self.url(&format!("/repos/{repo}/git/ref/heads/{branch}"));
        self.check_exists(&url, &[])
    }

    fn branch_sha(&self, repo: &str, branch: &str) -> Result<String, ForgeError> {
        let url = self.url(&format!("/repos/{repo}/git/ref/heads/{branch}"));
        let response = expect_success("GET", &url, self.get(&url, &[])?)?;
        let git_ref: GitRef = read_json(&url, response)?;
        Ok(git_ref.object.sha)
    }

    fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), ForgeError> {
        let url = self.url(&format!("/repos/{repo}/git/refs"));
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });
        let response = self.send_json(WriteMethod::Post, &url, &body)?;
        expect_success("POST", &url, response).map(|_| ())
    }

    fn put_file(&self, repo: &str, commit: &FileCommit<'_>) -> Result<(), ForgeError> {
        let url = self.url(&format!("/repos/{repo}/contents/{}", commit.path));
        let response = self.send_json(WriteMethod::Put, &url, commit)?;
        expect_success("PUT", &url, response).map(|_| ())
    }

    fn find_pulls(
        &self,
        repo: &str,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequest>, ForgeError> {
        let url = self.url(&format!("/repos/{repo}/pulls"));
        let query = [("head", head), ("base", base), ("state", "all")];
        let response = expect_success("GET", &url, self.get(&url, &query)?)?;
        read_json(&url, response)
    }

    fn create_pull(&self, repo: &str, pull: &NewPull<'_>) -> Result<PullRequest, ForgeError> {
        let url = self.url(&format!("/repos/{repo}/pulls"));
        let response = self.send_json(WriteMethod::Post, &url, pull)?;
        let response = expect_success("POST", &url, response)?;
        read_json(&url, response)
    }

    fn dispatch(
        &self,
        repo: &str,
        event_type: &str,
        client_payload: &Value,
    ) -> Result<DispatchResponse, ForgeError> {
        let url = self.url(&format!("/repos/{repo}/dispatches"));
        let body = json!({ "event_type": event_type, "client_payload": client_payload });
        let mut response = self.send_json(WriteMethod::Post, &url, &body)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| ForgeError::Decode {
                url: url.clone(),
                reason: err.to_string(),
            })?;
        Ok(DispatchResponse { status, body })
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
