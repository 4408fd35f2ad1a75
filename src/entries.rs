use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::dates::Clock;
use crate::models::TimeEntry;

/// Entries started on one local calendar day.
#[derive(Debug, Clone)]
pub struct DayGroup<'a> {
    pub date: NaiveDate,
    pub entries: Vec<&'a TimeEntry>,
    pub total_seconds: i64,
}

/// Recent time entries, oldest first.
#[derive(Debug, Clone, Default)]
pub struct EntryList {
    entries: Vec<TimeEntry>,
}

impl EntryList {
    pub fn new(mut entries: Vec<TimeEntry>) -> Self {
        entries.sort_by_key(|entry| entry.start);
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeEntry> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry currently being timed, if any.
    pub fn running(&self) -> Option<&TimeEntry> {
        self.entries.iter().find(|entry| entry.is_running())
    }

    /// Newest entry with exactly this description.
    pub fn find_by_description(&self, description: &str) -> Option<&TimeEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.description.as_deref() == Some(description))
    }

    pub fn find_by_id(&self, id: u64) -> Option<&TimeEntry> {
        self.entries.iter().find(|entry| entry.id == Some(id))
    }

    pub fn project_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().filter_map(|entry| entry.pid)
    }

    /// Buckets entries by the local date they started on, summing elapsed
    /// time per day. Entries without a start are skipped.
    pub fn by_day(&self, clock: &Clock) -> Vec<DayGroup<'_>> {
        let now = clock.now_epoch();
        let mut days: BTreeMap<NaiveDate, DayGroup<'_>> = BTreeMap::new();

        for entry in self.iter() {
            let Some(start) = entry.start.as_ref() else {
                continue;
            };
            let date = clock.to_local(start).date_naive();
            let group = days.entry(date).or_insert_with(|| DayGroup {
                date,
                entries: Vec::new(),
                total_seconds: 0,
            });
            group.total_seconds += entry.normalized_duration(now).unwrap_or(0);
            group.entries.push(entry);
        }

        days.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn entry(id: u64, description: &str, start: &str, duration: i64) -> TimeEntry {
        TimeEntry {
            id: Some(id),
            description: Some(description.to_string()),
            start: Some(DateTime::parse_from_rfc3339(start).unwrap()),
            duration: Some(duration),
            ..TimeEntry::default()
        }
    }

    fn clock() -> Clock {
        Clock::frozen(
            chrono_tz::UTC,
            Utc.with_ymd_and_hms(2026, 2, 3, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn entries_are_sorted_by_start() {
        let list = EntryList::new(vec![
            entry(2, "Later", "2026-02-03T10:00:00+00:00", 60),
            entry(1, "Earlier", "2026-02-02T10:00:00+00:00", 60),
        ]);
        let ids: Vec<_> = list.iter().filter_map(|entry| entry.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn find_by_description_returns_newest() {
        let list = EntryList::new(vec![
            entry(1, "Standup", "2026-02-02T09:00:00+00:00", 900),
            entry(2, "Review", "2026-02-02T10:00:00+00:00", 900),
            entry(3, "Standup", "2026-02-03T09:00:00+00:00", 900),
        ]);
        assert_eq!(list.find_by_description("Standup").unwrap().id, Some(3));
        assert!(list.find_by_description("standup").is_none());
    }

    #[test]
    fn running_entry_has_negative_duration() {
        let start = Utc.with_ymd_and_hms(2026, 2, 3, 11, 0, 0).unwrap().timestamp();
        let list = EntryList::new(vec![
            entry(1, "Done", "2026-02-03T09:00:00+00:00", 600),
            entry(2, "Ongoing", "2026-02-03T11:00:00+00:00", -start),
        ]);
        assert_eq!(list.running().unwrap().id, Some(2));
        assert_eq!(list.find_by_id(1).unwrap().description.as_deref(), Some("Done"));
        assert!(list.find_by_id(99).is_none());
    }

    #[test]
    fn by_day_groups_and_sums_including_running_time() {
        let start = Utc.with_ymd_and_hms(2026, 2, 3, 11, 0, 0).unwrap().timestamp();
        let list = EntryList::new(vec![
            entry(1, "A", "2026-02-02T09:00:00+00:00", 1800),
            entry(2, "B", "2026-02-02T13:00:00+00:00", 3600),
            entry(3, "C", "2026-02-03T11:00:00+00:00", -start),
        ]);

        let days = list.by_day(&clock());
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
        assert_eq!(days[0].entries.len(), 2);
        assert_eq!(days[0].total_seconds, 5400);
        assert_eq!(days[1].total_seconds, 3600);
    }
}
