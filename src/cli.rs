//! CLI argument parsing for the rollout commands.
//!
//! Environment-backed flags mirror the variables a CI job exports, so the same
//! binary runs unchanged from a workflow step or a terminal.
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default REST API root for github.com.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "appsec-rollout",
    version,
    about = "Roll out the AppSec workflow and trigger scheduled scans",
    after_help = "Commands:\n  onboard --org <org>    Open PRs adding the AppSec workflow where it is missing\n  dispatch               Send repository-dispatch events for the schedule list\n\nExamples:\n  REPO_NAMES=all appsec-rollout onboard --org appsec-gis\n  REPO_NAMES=appsec-gis/api appsec-rollout onboard\n  GITHUB_EVENT_NAME=workflow_dispatch appsec-rollout dispatch",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(flatten)]
    pub forge: ForgeArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Onboard(OnboardArgs),
    Dispatch(DispatchArgs),
}

/// Connection settings shared by every command.
#[derive(Parser, Debug)]
pub struct ForgeArgs {
    /// REST API base URL
    #[arg(long, global = true, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Markdown summary destination (printed to stdout when unset)
    #[arg(long, global = true, value_name = "PATH", env = "GITHUB_STEP_SUMMARY")]
    pub step_summary: Option<PathBuf>,
}

/// Repository visibility filter for organization listings.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepoType {
    #[default]
    All,
    Public,
    Private,
    Forks,
    Sources,
    Member,
}

impl RepoType {
    pub fn as_query(self) -> &'static str {
        match self {
            RepoType::All => "all",
            RepoType::Public => "public",
            RepoType::Private => "private",
            RepoType::Forks => "forks",
            RepoType::Sources => "sources",
            RepoType::Member => "member",
        }
    }
}

/// Onboard command inputs.
#[derive(Parser, Debug)]
#[command(about = "Add the AppSec workflow to repositories that lack it")]
pub struct OnboardArgs {
    /// Repositories to onboard: `all`, or a comma-separated list of owner/repo
    #[arg(long, value_name = "REPOS", env = "REPO_NAMES")]
    pub repos: Option<String>,

    /// Organization listed when `--repos all` is given
    #[arg(long, env = "APPSEC_ORG")]
    pub org: Option<String>,

    /// Repository type filter for organization listing
    #[arg(long, value_enum, default_value_t = RepoType::All)]
    pub repo_type: RepoType,

    /// Local workflow file uploaded verbatim
    #[arg(long, value_name = "PATH", default_value = "appsec.yaml")]
    pub workflow_file: PathBuf,

    /// Destination path of the workflow inside each repository
    #[arg(long, value_name = "PATH", default_value = crate::onboard::WORKFLOW_PATH)]
    pub workflow_path: String,

    /// Pull request body template
    #[arg(long, value_name = "PATH", default_value = "pr_description.md")]
    pub pr_template: PathBuf,

    /// Head branch carrying the workflow commit
    #[arg(long, value_name = "BRANCH", default_value = crate::onboard::HEAD_BRANCH)]
    pub head_branch: String,

    /// Branch assumed when repository metadata omits a default branch
    #[arg(long, value_name = "BRANCH", default_value = crate::onboard::FALLBACK_BRANCH)]
    pub fallback_branch: String,
}

/// Dispatch command inputs.
#[derive(Parser, Debug)]
#[command(about = "Trigger scans through repository-dispatch events")]
pub struct DispatchArgs {
    /// JSON list of {repo_name, branch} targets
    #[arg(long, value_name = "PATH", default_value = "schedule_list.json")]
    pub schedule: PathBuf,

    /// Persisted per-target results, read before and rewritten after the run
    #[arg(long, value_name = "PATH", default_value = "scan_results.json")]
    pub results: PathBuf,

    /// Name of the triggering event; `workflow_dispatch` enables manual mode
    #[arg(long, value_name = "NAME", env = "GITHUB_EVENT_NAME")]
    pub event_name: Option<String>,

    /// `event_type` sent with each dispatch
    #[arg(long, value_name = "TYPE", default_value = crate::dispatch::EVENT_TYPE)]
    pub event_type: String,
}
