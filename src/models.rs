use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Tag stamped into `created_with` on every entry this client builds.
pub const CREATED_WITH: &str = "toggl-cli";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Project {
    pub id: u64,
    #[serde(default)]
    pub wid: Option<u64>,
    #[serde(default)]
    pub cid: Option<u64>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Client {
    pub id: u64,
    #[serde(default)]
    pub wid: Option<u64>,
    pub name: String,
}

/// The `/me` payload. Settings this client has no use for stay in `extra`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub default_wid: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserEnvelope {
    #[serde(default)]
    pub since: Option<i64>,
    pub data: User,
}

/// Single-resource responses arrive as `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Write requests are sent as `{"time_entry": ...}`.
#[derive(Debug, Serialize)]
pub struct TimeEntryPayload<'a> {
    pub time_entry: &'a TimeEntry,
}

/// A time entry as the service represents it.
///
/// A negative `duration` marks a running entry: it holds `-start` in epoch
/// seconds, so adding the current epoch time yields the elapsed seconds.
/// Fields not modelled here are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TimeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duronly: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_with: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TimeEntry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            created_with: Some(CREATED_WITH.to_string()),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.duration.is_some_and(|duration| duration < 0)
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("(no description)")
    }

    /// Elapsed seconds: the stored duration for a finished entry, the time
    /// since start for a running one.
    pub fn normalized_duration(&self, now_epoch: i64) -> Result<i64> {
        let duration = self.duration.ok_or(Error::MissingField("duration"))?;
        if duration >= 0 {
            Ok(duration)
        } else {
            Ok(now_epoch + duration)
        }
    }

    /// Checks the properties the service requires before a write. The
    /// service itself accepts entries without a description; we don't.
    pub fn validate(&self) -> Result<()> {
        if self.start.is_none() {
            return Err(Error::MissingField("start"));
        }
        if self.duration.is_none() {
            return Err(Error::MissingField("duration"));
        }
        self.require_description()?;
        if self.created_with.is_none() {
            return Err(Error::MissingField("created_with"));
        }
        Ok(())
    }

    pub fn require_description(&self) -> Result<()> {
        if self
            .description
            .as_deref()
            .is_none_or(|value| value.trim().is_empty())
        {
            return Err(Error::MissingField("description"));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(&TimeEntryPayload { time_entry: self })?)
    }
}

/// First project whose name starts with `prefix`, in service order.
pub fn find_project_by_name<'a>(projects: &'a [Project], prefix: &str) -> Option<&'a Project> {
    projects
        .iter()
        .find(|project| project.name.starts_with(prefix))
}

pub fn find_project_by_id(projects: &[Project], id: u64) -> Option<&Project> {
    projects.iter().find(|project| project.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(id: u64, name: &str) -> Project {
        Project {
            id,
            wid: Some(1),
            cid: None,
            name: name.to_string(),
        }
    }

    #[test]
    fn time_entry_json_round_trip_keeps_every_field() {
        let raw = json!({
            "id": 436694100,
            "guid": "b8f8a0e1-1d7f-4f2c-9d5a-7c9f0a1b2c3d",
            "wid": 777,
            "pid": 193791,
            "uid": 42,
            "description": "Writing docs",
            "start": "2014-01-01T10:00:00+00:00",
            "stop": "2014-01-01T11:30:00+00:00",
            "duration": 5400,
            "duronly": false,
            "billable": false,
            "tags": ["docs"],
            "at": "2014-01-01T11:30:05+00:00",
            "created_with": "toggl-cli",
            "tid": 9001,
            "custom": {"nested": true}
        });

        let entry: TimeEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entry.pid, Some(193791));
        assert_eq!(entry.extra.get("tid"), Some(&json!(9001)));

        let encoded = serde_json::to_value(&entry).unwrap();
        assert_eq!(encoded, raw);
    }

    #[test]
    fn payload_wraps_entry() {
        let entry = TimeEntry::new("Review");
        let payload: Value = serde_json::from_str(&entry.to_payload().unwrap()).unwrap();
        assert_eq!(payload["time_entry"]["description"], "Review");
        assert_eq!(payload["time_entry"]["created_with"], CREATED_WITH);
        assert!(payload["time_entry"].get("id").is_none());
    }

    #[test]
    fn normalized_duration_positive_is_stored_value() {
        let entry = TimeEntry {
            duration: Some(5400),
            ..TimeEntry::default()
        };
        assert_eq!(entry.normalized_duration(1_700_000_000).unwrap(), 5400);
        assert!(!entry.is_running());
    }

    #[test]
    fn normalized_duration_running_is_elapsed_time() {
        let started = 1_700_000_000;
        let entry = TimeEntry {
            duration: Some(-started),
            ..TimeEntry::default()
        };
        assert!(entry.is_running());
        assert_eq!(entry.normalized_duration(started + 90).unwrap(), 90);
    }

    #[test]
    fn normalized_duration_requires_duration() {
        let entry = TimeEntry::new("No duration");
        assert!(matches!(
            entry.normalized_duration(0),
            Err(Error::MissingField("duration"))
        ));
    }

    #[test]
    fn validate_reports_first_missing_field() {
        let mut entry = TimeEntry::new("Docs");
        assert!(matches!(entry.validate(), Err(Error::MissingField("start"))));

        entry.start = Some(DateTime::parse_from_rfc3339("2014-01-01T10:00:00+00:00").unwrap());
        assert!(matches!(
            entry.validate(),
            Err(Error::MissingField("duration"))
        ));

        entry.duration = Some(60);
        assert!(entry.validate().is_ok());

        entry.description = Some("  ".to_string());
        assert!(matches!(
            entry.validate(),
            Err(Error::MissingField("description"))
        ));
    }

    #[test]
    fn project_lookup_matches_first_prefix() {
        let projects = vec![
            project(1, "Internal"),
            project(2, "Client Work"),
            project(3, "Client Support"),
        ];
        assert_eq!(find_project_by_name(&projects, "Client").unwrap().id, 2);
        assert_eq!(find_project_by_name(&projects, "Client S").unwrap().id, 3);
        assert!(find_project_by_name(&projects, "client").is_none());
        assert_eq!(find_project_by_id(&projects, 1).unwrap().name, "Internal");
    }

    #[test]
    fn user_envelope_keeps_unknown_settings() {
        let raw = json!({
            "since": 1362579886,
            "data": {
                "id": 42,
                "default_wid": 777,
                "email": "user@example.com",
                "fullname": "Example User",
                "beginning_of_week": 1
            }
        });
        let envelope: UserEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(envelope.data.default_wid, 777);
        assert_eq!(envelope.since, Some(1362579886));
        assert_eq!(envelope.data.extra.get("beginning_of_week"), Some(&json!(1)));
    }
}
