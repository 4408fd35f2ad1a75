use thiserror::Error;

use crate::toggl::TogglError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Usage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Toggl(#[from] TogglError),
    #[error("Project '{0}' not found.")]
    ProjectNotFound(String),
    #[error("No time entry with id {0} in the recent entries.")]
    EntryNotFound(u64),
    #[error("time entries must have a '{0}' property")]
    MissingField(&'static str),
    #[error("time entry is not currently running")]
    NotRunning,
    #[error("'{0}' is already running")]
    AlreadyRunning(String),
    #[error("time entry must have an id")]
    MissingId,
    #[error("invalid date/time '{0}'")]
    InvalidDateTime(String),
    #[error("invalid duration '{0}', expected [[hours:]minutes:]seconds")]
    InvalidDuration(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
