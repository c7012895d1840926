//! Command runners: resolve configuration, drive the forge, publish summaries.
use crate::cli::{DispatchArgs, ForgeArgs, OnboardArgs};
use crate::config::token_from_env;
use crate::dispatch::{load_targets, DispatchResults, EventKind, Scheduler};
use crate::error::ConfigError;
use crate::forge::GithubClient;
use crate::onboard::{OnboardSettings, Onboarder, RepoSelection, RolloutAssets};
use crate::summary::Summary;
use anyhow::Result;

const ONBOARD_TITLE: &str = "🚀 Onboarding Summary";
const SCHEDULER_TITLE: &str = "🚀 Scheduler Summary";

pub fn run_onboard(forge_args: &ForgeArgs, args: OnboardArgs) -> Result<()> {
    let token = token_from_env()?;
    let raw_repos = args
        .repos
        .as_deref()
        .ok_or(ConfigError::MissingValue("--repos (or REPO_NAMES)"))?;
    let selection = RepoSelection::parse(raw_repos)?;
    let assets = RolloutAssets::load(&args.workflow_file, &args.pr_template)?;
    let client = GithubClient::new(&forge_args.api_url, &token);

    let mode = selection.mode();
    let repos = selection.resolve(&client, args.org.as_deref(), args.repo_type)?;
    tracing::info!(count = repos.len(), ?mode, "onboarding repositories");

    let settings = OnboardSettings {
        workflow_path: args.workflow_path,
        head_branch: args.head_branch,
        fallback_branch: args.fallback_branch,
    };
    let records = Onboarder::new(&client, settings, assets).run(&repos, mode);

    Summary::from_records(ONBOARD_TITLE, &records).publish(forge_args.step_summary.as_deref())
}

pub fn run_dispatch(forge_args: &ForgeArgs, args: DispatchArgs) -> Result<()> {
    let token = token_from_env()?;
    let event = EventKind::from_event_name(args.event_name.as_deref().unwrap_or_default());
    let mut results = DispatchResults::load(&args.results)?;
    let targets = load_targets(&args.schedule)?;
    let client = GithubClient::new(&forge_args.api_url, &token);
    tracing::info!(
        targets = targets.len(),
        previous = results.len(),
        ?event,
        "dispatching scans"
    );

    let records = Scheduler::new(&client, &args.event_type).run(&targets, event, &mut results);

    results.save(&args.results)?;
    if results.is_empty() {
        tracing::warn!(path = %args.results.display(), "no dispatch results recorded");
    }
    Summary::from_records(SCHEDULER_TITLE, &records).publish(forge_args.step_summary.as_deref())
}
