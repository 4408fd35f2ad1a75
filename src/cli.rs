use std::collections::VecDeque;

use chrono::DateTime;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};

use crate::dates::{Clock, parse_duration};
use crate::error::{Error, Result};

const ACTIONS_HELP: &str = "\
Positional forms:
  add DESCR [@PROJECT] START_DATETIME ('d'DURATION | END_DATETIME)
  start DESCR [@PROJECT] [DATETIME]
  stop [DATETIME]

  DURATION = [[Hours:]Minutes:]Seconds
  DATETIME = 2014-01-01T10:00, 2014-01-01, 14:30 or 2:30pm";

#[derive(Debug, Parser)]
#[command(name = "toggl")]
#[command(version, about = "Command-line client for the Toggl time tracker", long_about = None)]
#[command(after_help = ACTIONS_HELP)]
pub struct Cli {
    /// Don't print anything
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print additional info, such as entry ids
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print debugging output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List recent time entries
    Ls,

    /// Create a completed time entry
    Add {
        #[arg(
            value_name = "DESCR [@PROJECT] START ('d'DURATION | END)",
            required = true,
            num_args = 1..
        )]
        args: Vec<String>,
    },

    /// List all clients
    Clients,

    /// Restart the newest entry with the given description
    Continue {
        #[arg(value_name = "DESCR")]
        description: String,
    },

    /// Print what you're working on now
    Now,

    /// List all projects
    Projects,

    /// Delete a time entry by id
    Rm {
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// Start a new entry
    Start {
        #[arg(
            value_name = "DESCR [@PROJECT] [DATETIME]",
            required = true,
            num_args = 1..
        )]
        args: Vec<String>,
    },

    /// Stop the current entry
    Stop {
        #[arg(value_name = "DATETIME")]
        datetime: Option<String>,
    },

    /// Open the Toggl timer in a browser
    Www,
}

/// How a completed entry ends.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryEnd {
    Duration(i64),
    At(DateTime<Tz>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddArgs {
    pub description: String,
    pub project: Option<String>,
    pub start: DateTime<Tz>,
    pub end: EntryEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartArgs {
    pub description: String,
    pub project: Option<String>,
    pub start: Option<DateTime<Tz>>,
}

impl AddArgs {
    pub fn parse(args: &[String], clock: &Clock) -> Result<Self> {
        let mut cursor = ArgCursor::new(args);
        let description = cursor.required("DESCR")?;
        let project = cursor.project();
        let start = clock.parse_local(&cursor.required("START_DATETIME")?)?;
        let end = match cursor.duration()? {
            Some(seconds) => EntryEnd::Duration(seconds),
            None => {
                let value = cursor.required("'d'DURATION or END_DATETIME")?;
                EntryEnd::At(clock.parse_local(&value)?)
            }
        };
        cursor.finish()?;
        Ok(Self {
            description,
            project,
            start,
            end,
        })
    }

    /// Stop time and duration in seconds.
    pub fn resolve_end(&self) -> Result<(Option<DateTime<Tz>>, i64)> {
        match &self.end {
            EntryEnd::Duration(seconds) => Ok((None, *seconds)),
            EntryEnd::At(stop) => {
                let seconds = stop.timestamp() - self.start.timestamp();
                if seconds < 0 {
                    return Err(Error::Usage(
                        "END_DATETIME is before START_DATETIME".to_string(),
                    ));
                }
                Ok((Some(*stop), seconds))
            }
        }
    }
}

impl StartArgs {
    pub fn parse(args: &[String], clock: &Clock) -> Result<Self> {
        let mut cursor = ArgCursor::new(args);
        let description = cursor.required("DESCR")?;
        let project = cursor.project();
        let start = cursor
            .optional()
            .map(|value| clock.parse_local(&value))
            .transpose()?;
        cursor.finish()?;
        Ok(Self {
            description,
            project,
            start,
        })
    }
}

/// Consumes positional words left to right; `@` and `d` prefixes mark the
/// optional project and duration slots.
struct ArgCursor {
    args: VecDeque<String>,
}

impl ArgCursor {
    fn new(args: &[String]) -> Self {
        Self {
            args: args.iter().cloned().collect(),
        }
    }

    fn optional(&mut self) -> Option<String> {
        self.args.pop_front()
    }

    fn required(&mut self, name: &str) -> Result<String> {
        self.args
            .pop_front()
            .ok_or_else(|| Error::Usage(format!("missing {name}")))
    }

    fn project(&mut self) -> Option<String> {
        self.take_prefixed('@')
    }

    fn duration(&mut self) -> Result<Option<i64>> {
        self.take_prefixed('d')
            .map(|value| parse_duration(&value))
            .transpose()
    }

    fn take_prefixed(&mut self, prefix: char) -> Option<String> {
        let value = self.args.front()?.strip_prefix(prefix)?.to_string();
        self.args.pop_front();
        Some(value)
    }

    fn finish(self) -> Result<()> {
        if self.args.is_empty() {
            Ok(())
        } else {
            let rest: Vec<String> = self.args.into_iter().collect();
            Err(Error::Usage(format!("unexpected arguments: {}", rest.join(" "))))
        }
    }
}
