use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod dispatch;
mod error;
mod forge;
mod onboard;
mod summary;
mod util;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for the summary table.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    match args.command {
        Command::Onboard(onboard) => workflow::run_onboard(&args.forge, onboard),
        Command::Dispatch(dispatch) => workflow::run_dispatch(&args.forge, dispatch),
    }
}
