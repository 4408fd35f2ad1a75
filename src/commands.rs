use std::io;
use std::process;

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::debug;

use crate::cli::{AddArgs, Command, StartArgs};
use crate::config::Config;
use crate::dates::{Clock, format_time};
use crate::error::{Error, Result};
use crate::format::{format_clients, format_entry, format_entry_list, format_projects};
use crate::logging::Output;
use crate::models::{Project, TimeEntry, find_project_by_name};
use crate::toggl::{TogglClient, Transport};
use crate::tracker::Tracker;

const NOTHING_RUNNING: &str = "You're not working on anything right now.";

/// Everything a command needs for one invocation.
pub struct Context<T> {
    pub client: TogglClient<T>,
    pub clock: Clock,
    pub config: Config,
    pub output: Output,
    pub verbose: bool,
}

impl<T: Transport> Context<T> {
    fn tracker(&self) -> Tracker<'_, T> {
        Tracker::new(&self.client, &self.clock)
    }

    fn friendly_time(&self, when: &DateTime<Tz>) -> String {
        format_time(when, &self.config.options.time_format)
    }

    fn workspace_projects(&self) -> Result<Vec<Project>> {
        let user = self.client.me()?;
        debug!(workspace = user.default_wid, "loading projects");
        Ok(self.client.projects(user.default_wid)?)
    }

    fn resolve_project(&self, name: Option<&str>) -> Result<Option<u64>> {
        let Some(name) = name else {
            return Ok(None);
        };
        let projects = self.workspace_projects()?;
        find_project_by_name(&projects, name)
            .map(|project| Some(project.id))
            .ok_or_else(|| Error::ProjectNotFound(name.to_string()))
    }
}

pub fn run<T: Transport>(command: Command, ctx: &Context<T>) -> Result<()> {
    match command {
        Command::Ls => list_entries(ctx),
        Command::Add { args } => add_entry(ctx, &args),
        Command::Clients => list_clients(ctx),
        Command::Continue { description } => continue_entry(ctx, &description),
        Command::Now => current_entry(ctx),
        Command::Projects => list_projects(ctx),
        Command::Rm { id } => delete_entry(ctx, id),
        Command::Start { args } => start_entry(ctx, &args),
        Command::Stop { datetime } => stop_entry(ctx, datetime.as_deref()),
        Command::Www => open_www(ctx),
    }
}

fn list_entries<T: Transport>(ctx: &Context<T>) -> Result<()> {
    let entries = ctx.tracker().recent_entries()?;
    let projects = if entries.project_ids().next().is_some() {
        ctx.workspace_projects()?
    } else {
        Vec::new()
    };
    if !entries.is_empty() {
        ctx.output
            .info(format_entry_list(&entries, &projects, &ctx.clock, ctx.verbose));
    }
    Ok(())
}

fn add_entry<T: Transport>(ctx: &Context<T>, args: &[String]) -> Result<()> {
    let args = AddArgs::parse(args, &ctx.clock)?;
    let pid = ctx.resolve_project(args.project.as_deref())?;
    let (stop, duration) = args.resolve_end()?;

    let mut entry = TimeEntry::new(args.description.clone());
    entry.pid = pid;
    entry.start = Some(args.start.fixed_offset());
    entry.stop = stop.map(|value| value.fixed_offset());
    entry.duration = Some(duration);

    ctx.tracker().add(&entry)?;
    ctx.output.info(format!("{} added", args.description));
    Ok(())
}

fn list_clients<T: Transport>(ctx: &Context<T>) -> Result<()> {
    let clients = ctx.client.clients()?;
    if !clients.is_empty() {
        ctx.output.print(format_clients(&clients));
    }
    Ok(())
}

fn continue_entry<T: Transport>(ctx: &Context<T>, description: &str) -> Result<()> {
    let entries = ctx.tracker().recent_entries()?;
    let Some(entry) = entries.find_by_description(description) else {
        ctx.output
            .info(format!("Did not find '{description}' in list of entries."));
        return Ok(());
    };

    ctx.tracker().continue_entry(entry)?;
    ctx.output.info(format!(
        "{} continued at {}",
        entry.description_or_default(),
        ctx.friendly_time(&ctx.clock.now())
    ));
    Ok(())
}

fn current_entry<T: Transport>(ctx: &Context<T>) -> Result<()> {
    let entries = ctx.tracker().recent_entries()?;
    match entries.running() {
        Some(entry) => {
            let projects = if entry.pid.is_some() {
                ctx.workspace_projects()?
            } else {
                Vec::new()
            };
            ctx.output
                .info(format_entry(entry, &projects, &ctx.clock, ctx.verbose));
        }
        None => ctx.output.info(NOTHING_RUNNING),
    }
    Ok(())
}

fn list_projects<T: Transport>(ctx: &Context<T>) -> Result<()> {
    let projects = ctx.workspace_projects()?;
    let clients = if projects.iter().any(|project| project.cid.is_some()) {
        ctx.client.clients()?
    } else {
        Vec::new()
    };
    if !projects.is_empty() {
        ctx.output.print(format_projects(&projects, &clients));
    }
    Ok(())
}

fn delete_entry<T: Transport>(ctx: &Context<T>, id: u64) -> Result<()> {
    let entries = ctx.tracker().recent_entries()?;
    let entry = entries.find_by_id(id).ok_or(Error::EntryNotFound(id))?;
    ctx.tracker().delete(entry)?;
    ctx.output.info(format!("Deleting entry {id}"));
    Ok(())
}

fn start_entry<T: Transport>(ctx: &Context<T>, args: &[String]) -> Result<()> {
    let args = StartArgs::parse(args, &ctx.clock)?;
    let pid = ctx.resolve_project(args.project.as_deref())?;

    let mut entry = TimeEntry::new(args.description.clone());
    entry.pid = pid;
    entry.start = args.start.map(|value| value.fixed_offset());

    let started = ctx.tracker().start(entry)?;
    let when = started
        .start
        .map(|value| ctx.clock.to_local(&value))
        .or(args.start)
        .unwrap_or_else(|| ctx.clock.now());
    ctx.output.info(format!(
        "{} started at {}",
        args.description,
        ctx.friendly_time(&when)
    ));
    Ok(())
}

fn stop_entry<T: Transport>(ctx: &Context<T>, at: Option<&str>) -> Result<()> {
    let entries = ctx.tracker().recent_entries()?;
    let Some(entry) = entries.running() else {
        ctx.output.info(NOTHING_RUNNING);
        return Ok(());
    };

    let at = at.map(|value| ctx.clock.parse_local(value)).transpose()?;
    let stopped = ctx.tracker().stop(entry, at)?;
    let when = stopped
        .stop
        .map(|value| ctx.clock.to_local(&value))
        .or(at)
        .unwrap_or_else(|| ctx.clock.now());
    ctx.output.info(format!(
        "{} stopped at {}",
        entry.description_or_default(),
        ctx.friendly_time(&when)
    ));
    Ok(())
}

fn open_www<T: Transport>(ctx: &Context<T>) -> Result<()> {
    let url = &ctx.config.options.www_url;
    debug!(%url, "opening browser");
    let status = browser_command(url).status()?;
    if !status.success() {
        return Err(Error::Io(io::Error::other(format!(
            "could not open {url} ({status})"
        ))));
    }
    Ok(())
}

fn browser_command(url: &str) -> process::Command {
    if cfg!(target_os = "macos") {
        let mut command = process::Command::new("open");
        command.arg(url);
        command
    } else if cfg!(windows) {
        let mut command = process::Command::new("cmd");
        command.args(["/C", "start", "", url]);
        command
    } else {
        let mut command = process::Command::new("xdg-open");
        command.arg(url);
        command
    }
}
