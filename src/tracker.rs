use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::dates::Clock;
use crate::entries::EntryList;
use crate::error::{Error, Result};
use crate::models::{CREATED_WITH, TimeEntry};
use crate::toggl::{TogglClient, Transport};

/// Drives the lifecycle of time entries against the service. Every write
/// validates the entry first, so an incomplete entry never reaches the wire.
pub struct Tracker<'a, T> {
    client: &'a TogglClient<T>,
    clock: &'a Clock,
}

impl<'a, T: Transport> Tracker<'a, T> {
    pub fn new(client: &'a TogglClient<T>, clock: &'a Clock) -> Self {
        Self { client, clock }
    }

    /// Entries from 00:00 yesterday through 23:59:59 today.
    pub fn recent_entries(&self) -> Result<EntryList> {
        let start = self.clock.start_of_yesterday().to_rfc3339();
        let end = self.clock.last_minute_today().to_rfc3339();
        debug!(%start, %end, "fetching recent entries");
        let entries = self.client.time_entries(&start, &end)?;
        Ok(EntryList::new(entries))
    }

    /// Records a completed entry.
    pub fn add(&self, entry: &TimeEntry) -> Result<TimeEntry> {
        entry.validate()?;
        let payload = entry.to_payload()?;
        debug!(%payload, "adding entry");
        Ok(self.client.create_time_entry(payload)?)
    }

    /// Starts timing `entry`. With an explicit start the running duration is
    /// derived from it; otherwise the service's start endpoint stamps it now.
    pub fn start(&self, mut entry: TimeEntry) -> Result<TimeEntry> {
        let started = match entry.start {
            Some(start) => {
                entry.duration = Some(-start.timestamp());
                entry.validate()?;
                let payload = entry.to_payload()?;
                debug!(%payload, "starting entry at explicit time");
                self.client.create_time_entry(payload)?
            }
            None => {
                entry.require_description()?;
                entry.start = Some(self.clock.now().fixed_offset());
                let payload = entry.to_payload()?;
                debug!(%payload, "starting entry now");
                self.client.start_time_entry(payload)?
            }
        };
        info!(id = ?started.id, "entry started");
        Ok(started)
    }

    pub fn stop(&self, entry: &TimeEntry, at: Option<DateTime<Tz>>) -> Result<TimeEntry> {
        let mut stopped = entry.clone();
        stopped
            .created_with
            .get_or_insert_with(|| CREATED_WITH.to_string());
        stopped.validate()?;
        let duration = stopped.duration.ok_or(Error::MissingField("duration"))?;
        if duration >= 0 {
            return Err(Error::NotRunning);
        }
        let id = stopped.id.ok_or(Error::MissingId)?;

        let stop = at.unwrap_or_else(|| self.clock.now());
        if stop.timestamp() + duration < 0 {
            return Err(Error::Usage(
                "stop time is before the entry's start".to_string(),
            ));
        }
        stopped.stop = Some(stop.fixed_offset());
        stopped.duration = Some(stop.timestamp() + duration);

        let payload = stopped.to_payload()?;
        debug!(%payload, "stopping entry");
        Ok(self.client.update_time_entry(id, payload)?)
    }

    /// Resumes `entry`. Entries from before today are cloned into a fresh
    /// running entry; today's entry is reopened in place so its accumulated
    /// time carries on.
    pub fn continue_entry(&self, entry: &TimeEntry) -> Result<TimeEntry> {
        if entry.is_running() {
            return Err(Error::AlreadyRunning(
                entry.description_or_default().to_string(),
            ));
        }
        let start = entry.start.ok_or(Error::MissingField("start"))?;

        if self.clock.to_local(&start) <= self.clock.start_of_today() {
            let fresh = TimeEntry {
                at: None,
                created_with: Some(CREATED_WITH.to_string()),
                duration: None,
                duronly: Some(false),
                guid: None,
                id: None,
                start: None,
                stop: None,
                uid: None,
                ..entry.clone()
            };
            return self.start(fresh);
        }

        let id = entry.id.ok_or(Error::MissingId)?;
        let duration = entry.duration.ok_or(Error::MissingField("duration"))?;
        let mut resumed = entry.clone();
        resumed.duration = Some(-(self.clock.now_epoch() - duration));
        resumed.duronly = Some(true);

        let payload = resumed.to_payload()?;
        debug!(%payload, "continuing entry");
        Ok(self.client.update_time_entry(id, payload)?)
    }

    pub fn delete(&self, entry: &TimeEntry) -> Result<()> {
        let id = entry.id.ok_or(Error::MissingId)?;
        self.client.delete_time_entry(id)?;
        info!(id, "entry deleted");
        Ok(())
    }
}
