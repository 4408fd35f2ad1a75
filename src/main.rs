use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

mod cli;
mod commands;
mod config;
mod dates;
mod entries;
mod error;
mod format;
mod logging;
mod models;
mod toggl;
mod tracker;

use cli::{Cli, Command};
use commands::Context;
use config::Config;
use dates::Clock;
use error::Result;
use logging::{Output, Verbosity};
use toggl::{HttpTransport, TogglClient};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose, cli.debug);
    logging::init_logging(verbosity);

    match run(cli, verbosity) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            if err.is_usage() {
                eprintln!("Run 'toggl --help' for usage.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, verbosity: Verbosity) -> Result<()> {
    let config = Config::load()?;
    let clock = Clock::new(config.timezone()?);
    let transport = HttpTransport::new(&config.options.api_url, &config.credentials())?;
    debug!(api_url = %config.options.api_url, timezone = %config.options.timezone, "configured");

    let ctx = Context {
        client: TogglClient::new(transport),
        clock,
        config,
        output: Output::stdout(verbosity == Verbosity::Quiet),
        verbose: cli.verbose,
    };

    commands::run(cli.command.unwrap_or(Command::Ls), &ctx)
}
