#[cfg(test)]
use std::cell::RefCell;
use std::fmt::Display;
use std::io;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// How chatty the run should be, from the global flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn level(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::OFF,
            Verbosity::Normal => LevelFilter::WARN,
            Verbosity::Verbose => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` takes precedence over the flags.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("toggl={}", verbosity.level())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

enum Sink {
    Stdout,
    #[cfg(test)]
    Captured(RefCell<Vec<String>>),
}

/// User-facing output. Silent under `--quiet`, except for listings the user
/// explicitly asked for.
pub struct Output {
    quiet: bool,
    sink: Sink,
}

impl Output {
    pub fn stdout(quiet: bool) -> Self {
        Self {
            quiet,
            sink: Sink::Stdout,
        }
    }

    #[cfg(test)]
    pub fn captured() -> Self {
        Self {
            quiet: false,
            sink: Sink::Captured(RefCell::new(Vec::new())),
        }
    }

    /// A status message; suppressed by `--quiet`.
    pub fn info(&self, message: impl Display) {
        if !self.quiet {
            self.print(message);
        }
    }

    /// Printed regardless of `--quiet`.
    pub fn print(&self, message: impl Display) {
        match &self.sink {
            Sink::Stdout => println!("{message}"),
            #[cfg(test)]
            Sink::Captured(lines) => lines.borrow_mut().push(message.to_string()),
        }
    }

    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Stdout => Vec::new(),
            Sink::Captured(lines) => lines
                .borrow()
                .iter()
                .flat_map(|chunk| chunk.lines().map(str::to_string).collect::<Vec<_>>())
                .collect(),
        }
    }
}
