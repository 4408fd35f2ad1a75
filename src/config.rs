use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.track.toggl.com/api/v8";
pub const DEFAULT_WWW_URL: &str = "https://track.toggl.com/timer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Password { username: String, password: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub options: Options,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub api_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "user@example.com".to_string(),
            password: "toggl_password".to_string(),
            api_token: "your_api_token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Options {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default = "default_prefer_token")]
    pub prefer_token: bool,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_www_url")]
    pub www_url: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            time_format: default_time_format(),
            prefer_token: default_prefer_token(),
            api_url: default_api_url(),
            www_url: default_www_url(),
        }
    }
}

impl Config {
    /// Loads the config file, applying environment overrides. A missing
    /// file is replaced by an editable default and reported as an error.
    pub fn load() -> Result<Self> {
        let path = config_path()
            .ok_or_else(|| Error::Config("Home directory not found".to_string()))?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            write_default(path)?;
            return Err(Error::Config(format!(
                "Missing {}. A default has been created for editing.",
                path.display()
            )));
        }

        debug!(path = %path.display(), "reading config");
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|err| Error::Config(format!("{}: {err}", path.display())))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("TOGGL_API_TOKEN") {
            if !value.trim().is_empty() {
                self.auth.api_token = value.trim().to_string();
                self.options.prefer_token = true;
            }
        }

        if let Ok(value) = env::var("TOGGL_API_URL") {
            if !value.trim().is_empty() {
                self.options.api_url = value.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;

        if StrftimeItems::new(&self.options.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::Config(format!(
                "invalid time_format '{}'",
                self.options.time_format
            )));
        }

        match self.credentials() {
            Credentials::Token(token) if token.is_empty() => {
                Err(Error::Config("auth.api_token is empty".to_string()))
            }
            Credentials::Password { username, .. } if username.is_empty() => {
                Err(Error::Config("auth.username is empty".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.options
            .timezone
            .parse::<Tz>()
            .map_err(|_| Error::Config(format!("unknown timezone '{}'", self.options.timezone)))
    }

    pub fn credentials(&self) -> Credentials {
        if self.options.prefer_token {
            Credentials::Token(self.auth.api_token.trim().to_string())
        } else {
            Credentials::Password {
                username: self.auth.username.trim().to_string(),
                password: self.auth.password.clone(),
            }
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(value) = env::var("TOGGL_CONFIG") {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value.trim()));
        }
    }

    let mut path = dirs::home_dir()?;
    path.push(".togglrc.json");
    Some(path)
}

fn write_default(path: &Path) -> Result<()> {
    warn!(path = %path.display(), "config file missing, writing a default");
    let json = serde_json::to_string_pretty(&Config::default())?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    restrict_permissions(path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_time_format() -> String {
    "%I:%M%p".to_string()
}

const fn default_prefer_token() -> bool {
    true
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_www_url() -> String {
    DEFAULT_WWW_URL.to_string()
}
