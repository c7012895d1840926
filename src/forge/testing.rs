//! In-memory forge used by the rollout and scheduler tests.
use super::{DispatchResponse, FileCommit, ForgeApi, NewPull, PullRequest, PullState};
use crate::cli::RepoType;
use crate::error::ForgeError;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ListOrgRepos(String),
    DefaultBranch(String),
    FileExists { repo: String, branch: String },
    BranchExists { repo: String, branch: String },
    BranchSha { repo: String, branch: String },
    CreateBranch { repo: String, branch: String, sha: String },
    PutFile { repo: String, branch: String, path: String, content: String },
    FindPulls { repo: String, head: String, base: String },
    CreatePull { repo: String, head: String, base: String, title: String, body: String },
    Dispatch { repo: String, event_type: String, payload: Value },
}

impl Call {
    pub(crate) fn is_write(&self) -> bool {
        matches!(
            self,
            Call::CreateBranch { .. }
                | Call::PutFile { .. }
                | Call::CreatePull { .. }
                | Call::Dispatch { .. }
        )
    }
}

#[derive(Default)]
pub(crate) struct FakeForge {
    pub(crate) org_repos: Vec<String>,
    pub(crate) default_branches: BTreeMap<String, String>,
    /// `(repo, branch)` pairs that already carry the workflow file.
    pub(crate) workflow_present: BTreeSet<(String, String)>,
    pub(crate) branches: RefCell<BTreeSet<(String, String)>>,
    pub(crate) pulls: BTreeMap<String, Vec<PullRequest>>,
    pub(crate) dispatch_status: BTreeMap<String, u16>,
    /// Operation name that fails for a given repository.
    pub(crate) fail_on: BTreeMap<String, &'static str>,
    pub(crate) calls: RefCell<Vec<Call>>,
}

impl FakeForge {
    pub(crate) fn with_branch(self, repo: &str, branch: &str) -> Self {
        self.branches
            .borrow_mut()
            .insert((repo.to_string(), branch.to_string()));
        self
    }

    pub(crate) fn with_pull(mut self, repo: &str, number: u64, state: PullState) -> Self {
        self.pulls
            .entry(repo.to_string())
            .or_default()
            .push(PullRequest {
                number,
                state,
                html_url: None,
            });
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, repo: &str, op: &'static str) -> Result<(), ForgeError> {
        if self.fail_on.get(repo).copied() == Some(op) {
            return Err(ForgeError::Status {
                method: "GET",
                url: format!("https://forge.test/repos/{repo}/{op}"),
                status: 500,
                body: "{\"message\": \"Server Error\"}".to_string(),
            });
        }
        Ok(())
    }
}

impl ForgeApi for FakeForge {
    fn list_org_repos(&self, org: &str, _repo_type: RepoType) -> Result<Vec<String>, ForgeError> {
        self.record(Call::ListOrgRepos(org.to_string()));
        self.check(org, "list_org_repos")?;
        Ok(self.org_repos.clone())
    }

    fn default_branch(&self, repo: &str) -> Result<Option<String>, ForgeError> {
        self.record(Call::DefaultBranch(repo.to_string()));
        self.check(repo, "default_branch")?;
        Ok(self.default_branches.get(repo).cloned())
    }

    fn file_exists(&self, repo: &str, _path: &str, branch: &str) -> Result<bool, ForgeError> {
        self.record(Call::FileExists {
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        self.check(repo, "file_exists")?;
        Ok(self
            .workflow_present
            .contains(&(repo.to_string(), branch.to_string())))
    }

    fn branch_exists(&self, repo: &str, branch: &str) -> Result<bool, ForgeError> {
        self.record(Call::BranchExists {
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        self.check(repo, "branch_exists")?;
        Ok(self
            .branches
            .borrow()
            .contains(&(repo.to_string(), branch.to_string())))
    }

    fn branch_sha(&self, repo: &str, branch: &str) -> Result<String, ForgeError> {
        self.record(Call::BranchSha {
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        self.check(repo, "branch_sha")?;
        Ok(format!("sha-{branch}"))
    }

    fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), ForgeError> {
        self.record(Call::CreateBranch {
            repo: repo.to_string(),
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        self.check(repo, "create_branch")?;
        self.branches
            .borrow_mut()
            .insert((repo.to_string(), branch.to_string()));
        Ok(())
    }

    fn put_file(&self, repo: &str, commit: &FileCommit<'_>) -> Result<(), ForgeError> {
        self.record(Call::PutFile {
            repo: repo.to_string(),
            branch: commit.branch.to_string(),
            path: commit.path.to_string(),
            content: commit.content.clone(),
        });
        self.check(repo, "put_file")
    }

    fn find_pulls(
        &self,
        repo: &str,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequest>, ForgeError> {
        self.record(Call::FindPulls {
            repo: repo.to_string(),
            head: head.to_string(),
            base: base.to_string(),
        });
        self.check(repo, "find_pulls")?;
        Ok(self.pulls.get(repo).cloned().unwrap_or_default())
    }

    fn create_pull(&self, repo: &str, pull: &NewPull<'_>) -> Result<PullRequest, ForgeError> {
        self.record(Call::CreatePull {
            repo: repo.to_string(),
            head: pull.head.to_string(),
            base: pull.base.to_string(),
            title: pull.title.to_string(),
            body: pull.body.to_string(),
        });
        self.check(repo, "create_pull")?;
        Ok(PullRequest {
            number: 42,
            state: PullState::Open,
            html_url: Some(format!("https://forge.test/{repo}/pull/42")),
        })
    }

    fn dispatch(
        &self,
        repo: &str,
        event_type: &str,
        client_payload: &Value,
    ) -> Result<DispatchResponse, ForgeError> {
        self.record(Call::Dispatch {
            repo: repo.to_string(),
            event_type: event_type.to_string(),
            payload: client_payload.clone(),
        });
        self.check(repo, "dispatch")?;
        let status = self.dispatch_status.get(repo).copied().unwrap_or(204);
        let body = if status == 204 {
            String::new()
        } else {
            "{\"message\":\"Not Found\",\n\"documentation_url\":\"https://docs.github.com/rest\"}\n"
                .to_string()
        };
        Ok(DispatchResponse { status, body })
    }
}
