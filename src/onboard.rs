//! Workflow onboarding driver.
//!
//! Each repository walks a short decision chain and stops at the first match:
//! workflow already present, head branch free, head branch reusable, or a pull
//! request already covering it. Errors abort only the current repository and
//! leave any branch created so far in place.
use crate::cli::RepoType;
use crate::error::ConfigError;
use crate::forge::{repo_owner, FileCommit, ForgeApi, NewPull, PullRequest, PullState};
use crate::summary::{RowKind, SummaryRow, ToSummaryRow};
use crate::util::read_text;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

pub const WORKFLOW_PATH: &str = ".github/workflows/appsec.yaml";
pub const HEAD_BRANCH: &str = "add-appsec-workflow";
pub const FALLBACK_BRANCH: &str = "main";
pub const COMMIT_MESSAGE: &str = "Add AppSec workflow";
pub const PR_TITLE: &str = "Add AppSec GitHub Workflow";

/// Whether the run targets one named repository or many.
///
/// A single target may force a fresh branch past an existing pull request;
/// batch runs never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Single,
    Batch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSelection {
    All,
    Named(Vec<String>),
}

impl RepoSelection {
    /// Parse `all` (any case) or a comma-separated repository list.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Ok(RepoSelection::All);
        }
        let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
        let repos: Vec<String> = compact
            .split(',')
            .filter(|repo| !repo.is_empty())
            .map(str::to_string)
            .collect();
        if repos.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "no repositories selected in {raw:?}"
            )));
        }
        Ok(RepoSelection::Named(repos))
    }

    pub fn mode(&self) -> RunMode {
        match self {
            RepoSelection::Named(repos) if repos.len() == 1 => RunMode::Single,
            _ => RunMode::Batch,
        }
    }

    /// Expand the selection into repository full names.
    ///
    /// `All` lists the organization through the forge and fails before any
    /// call when no organization is configured.
    pub fn resolve<F: ForgeApi>(
        self,
        forge: &F,
        org: Option<&str>,
        repo_type: RepoType,
    ) -> Result<Vec<String>> {
        match self {
            RepoSelection::Named(repos) => Ok(repos),
            RepoSelection::All => {
                let org = org
                    .filter(|org| !org.trim().is_empty())
                    .ok_or(ConfigError::MissingValue("--org (or APPSEC_ORG) with --repos all"))?;
                forge
                    .list_org_repos(org, repo_type)
                    .with_context(|| format!("list repositories of {org}"))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OnboardSettings {
    pub workflow_path: String,
    pub head_branch: String,
    pub fallback_branch: String,
}

#[cfg(test)]
impl Default for OnboardSettings {
    fn default() -> Self {
        Self {
            workflow_path: WORKFLOW_PATH.to_string(),
            head_branch: HEAD_BRANCH.to_string(),
            fallback_branch: FALLBACK_BRANCH.to_string(),
        }
    }
}

/// Local files pushed to every onboarded repository.
#[derive(Debug, Clone)]
pub struct RolloutAssets {
    pub workflow: Vec<u8>,
    pub pr_body: String,
}

impl RolloutAssets {
    pub fn load(workflow_file: &Path, pr_template: &Path) -> Result<Self> {
        let workflow = fs::read(workflow_file)
            .with_context(|| format!("read workflow file {}", workflow_file.display()))?;
        let pr_body = read_text(pr_template)?;
        Ok(Self { workflow, pr_body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardOutcome {
    WorkflowPresent,
    PullExists { state: PullState, number: u64 },
    Created {
        head: String,
        pull_number: u64,
        forced: bool,
    },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardRecord {
    pub repo: String,
    /// Default branch the pull request targets; unknown when resolution failed.
    pub base: Option<String>,
    pub outcome: OnboardOutcome,
}

impl ToSummaryRow for OnboardRecord {
    fn summary_row(&self) -> SummaryRow {
        let (kind, status, details) = match &self.outcome {
            OnboardOutcome::WorkflowPresent => (
                RowKind::Skipped,
                "✅ Skipped".to_string(),
                "💥 appsec.yaml found".to_string(),
            ),
            OnboardOutcome::PullExists { state, number } => {
                let details = match state {
                    PullState::Open => format!("💥 Open PR found: #{number}"),
                    PullState::Closed => format!("💥 PR already closed: #{number}"),
                };
                (RowKind::Skipped, "✅ Skipped".to_string(), details)
            }
            OnboardOutcome::Created {
                head,
                pull_number,
                forced,
            } => {
                let verb = if *forced { "forcefully created" } else { "created" };
                (
                    RowKind::Attempted,
                    "✅ Created".to_string(),
                    format!("PR #{pull_number} {verb} from `{head}`"),
                )
            }
            OnboardOutcome::Failed { error } => (
                RowKind::Attempted,
                "❌ Exception".to_string(),
                error.clone(),
            ),
        };
        SummaryRow {
            kind,
            repo: self.repo.clone(),
            branch: self.base.clone(),
            status,
            details,
        }
    }
}

/// `base-YYYYmmddHHMMSS` in UTC.
pub fn unique_branch_name(base: &str, now: DateTime<Utc>) -> String {
    format!("{base}-{}", now.format("%Y%m%d%H%M%S"))
}

/// Prefer the most recently listed open pull request; otherwise the first closed one.
fn blocking_pull(pulls: &[PullRequest]) -> Option<&PullRequest> {
    pulls
        .iter()
        .rev()
        .find(|pull| pull.state == PullState::Open)
        .or_else(|| pulls.iter().find(|pull| pull.state == PullState::Closed))
}

pub struct Onboarder<'a, F: ForgeApi> {
    forge: &'a F,
    settings: OnboardSettings,
    assets: RolloutAssets,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, F: ForgeApi> Onboarder<'a, F> {
    pub fn new(forge: &'a F, settings: OnboardSettings, assets: RolloutAssets) -> Self {
        Self {
            forge,
            settings,
            assets,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Onboard every repository, converting per-repository errors into records.
    pub fn run(&self, repos: &[String], mode: RunMode) -> Vec<OnboardRecord> {
        repos
            .iter()
            .map(|repo| match self.onboard_repo(repo, mode) {
                Ok(record) => record,
                Err(err) => {
                    let error = format!("{err:#}");
                    tracing::warn!(repo = %repo, error = %error, "onboarding failed");
                    OnboardRecord {
                        repo: repo.clone(),
                        base: None,
                        outcome: OnboardOutcome::Failed { error },
                    }
                }
            })
            .collect()
    }

    pub fn onboard_repo(&self, repo: &str, mode: RunMode) -> Result<OnboardRecord> {
        let base = self
            .forge
            .default_branch(repo)
            .with_context(|| format!("resolve default branch of {repo}"))?
            .unwrap_or_else(|| self.settings.fallback_branch.clone());
        let record = |outcome| OnboardRecord {
            repo: repo.to_string(),
            base: Some(base.clone()),
            outcome,
        };

        if self
            .forge
            .file_exists(repo, &self.settings.workflow_path, &base)
            .context("check workflow file")?
        {
            tracing::info!(repo, branch = %base, "workflow already present, skipping");
            return Ok(record(OnboardOutcome::WorkflowPresent));
        }

        let head_branch = self.settings.head_branch.as_str();
        let mut forced = false;
        let head = if !self
            .forge
            .branch_exists(repo, head_branch)
            .context("check head branch")?
        {
            self.create_branch_from(repo, &base, head_branch)?;
            head_branch.to_string()
        } else {
            let head_ref = format!("{}:{head_branch}", repo_owner(repo));
            let pulls = self
                .forge
                .find_pulls(repo, &head_ref, &base)
                .context("look up existing pull requests")?;
            match (blocking_pull(&pulls), mode) {
                (None, _) => head_branch.to_string(),
                (Some(_), RunMode::Single) => {
                    let unique = unique_branch_name(head_branch, (self.clock)());
                    self.create_branch_from(repo, &base, &unique)?;
                    forced = true;
                    unique
                }
                (Some(pull), RunMode::Batch) => {
                    tracing::info!(repo, pull = pull.number, "pull request already exists, skipping");
                    return Ok(record(OnboardOutcome::PullExists {
                        state: pull.state,
                        number: pull.number,
                    }));
                }
            }
        };

        let commit = FileCommit {
            path: &self.settings.workflow_path,
            message: COMMIT_MESSAGE,
            content: BASE64_STANDARD.encode(&self.assets.workflow),
            branch: &head,
        };
        self.forge
            .put_file(repo, &commit)
            .with_context(|| format!("commit workflow to {head}"))?;

        let pull = self
            .forge
            .create_pull(
                repo,
                &NewPull {
                    title: PR_TITLE,
                    head: &head,
                    base: &base,
                    body: &self.assets.pr_body,
                },
            )
            .with_context(|| format!("open pull request from {head}"))?;
        tracing::info!(
            repo,
            head = %head,
            pull = pull.number,
            url = pull.html_url.as_deref().unwrap_or_default(),
            "pull request created"
        );

        Ok(record(OnboardOutcome::Created {
            head,
            pull_number: pull.number,
            forced,
        }))
    }

    fn create_branch_from(&self, repo: &str, base: &str, branch: &str) -> Result<()> {
        let sha = self
            .forge
            .branch_sha(repo, base)
            .with_context(|| format!("resolve tip of {base}"))?;
        self.forge
            .create_branch(repo, branch, &sha)
            .with_context(|| format!("create branch {branch}"))?;
        tracing::info!(repo, branch, base, "created branch");
        Ok(())
    }
}

#[cfg(test)]
#[path = "onboard_tests.rs"]
mod tests;
