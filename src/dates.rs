use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const MAX_GAP_MINUTES: i64 = 24 * 60;

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S%p", "%I:%M%p"];

/// Wall clock in the configured timezone. Tests freeze it at a fixed instant.
#[derive(Debug, Clone)]
pub struct Clock {
    tz: Tz,
    frozen: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new(tz: Tz) -> Self {
        Self { tz, frozen: None }
    }

    #[cfg(test)]
    pub fn frozen(tz: Tz, at: DateTime<Utc>) -> Self {
        Self {
            tz,
            frozen: Some(at),
        }
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.frozen
            .unwrap_or_else(Utc::now)
            .with_timezone(&self.tz)
    }

    pub fn now_epoch(&self) -> i64 {
        self.now().timestamp()
    }

    pub fn start_of_today(&self) -> DateTime<Tz> {
        self.at(self.today(), NaiveTime::MIN)
    }

    pub fn start_of_yesterday(&self) -> DateTime<Tz> {
        self.at(self.today() - Duration::days(1), NaiveTime::MIN)
    }

    pub fn last_minute_today(&self) -> DateTime<Tz> {
        let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        self.at(self.today(), end)
    }

    pub fn to_local(&self, value: &DateTime<FixedOffset>) -> DateTime<Tz> {
        value.with_timezone(&self.tz)
    }

    /// Parses a user-entered date/time in the configured timezone.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD[T ]HH:MM[:SS]`, a bare `YYYY-MM-DD`
    /// (midnight), or a time of day (`14:30`, `2:30pm`, `2pm`) for today.
    pub fn parse_local(&self, input: &str) -> Result<DateTime<Tz>> {
        let value = input.trim();
        let invalid = || Error::InvalidDateTime(input.to_string());

        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Ok(parsed.with_timezone(&self.tz));
        }

        for format in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return self.localize(naive).ok_or_else(invalid);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return self.localize(date.and_time(NaiveTime::MIN)).ok_or_else(invalid);
        }

        let time_of_day = expand_bare_meridiem(value);
        for format in TIME_FORMATS {
            if let Ok(time) = NaiveTime::parse_from_str(&time_of_day, format) {
                return self.localize(self.today().and_time(time)).ok_or_else(invalid);
            }
        }

        Err(invalid())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
        self.localize(date.and_time(time))
            .unwrap_or_else(|| self.now())
    }

    /// Ambiguous times take the earlier offset. Times skipped by a DST jump
    /// resolve to the first minute after the gap.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        (0..=MAX_GAP_MINUTES).find_map(|minute| {
            self.tz
                .from_local_datetime(&(naive + Duration::minutes(minute)))
                .earliest()
        })
    }
}

/// `2pm` -> `2:00pm`, so the minute-bearing formats can take it.
fn expand_bare_meridiem(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    let Some(hour) = lower
        .strip_suffix("am")
        .or_else(|| lower.strip_suffix("pm"))
    else {
        return value.to_string();
    };
    let hour = hour.trim();
    if hour.is_empty() || !hour.chars().all(|ch| ch.is_ascii_digit()) {
        return value.to_string();
    }
    format!("{hour}:00{}", &lower[lower.len() - 2..])
}

/// Parses `[[hours:]minutes:]seconds` into seconds.
pub fn parse_duration(value: &str) -> Result<i64> {
    let invalid = || Error::InvalidDuration(value.to_string());
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }

    let mut total: i64 = 0;
    for part in &parts {
        if part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(invalid());
        }
        let number: i64 = part.parse().map_err(|_| invalid())?;
        total = total.checked_mul(60).ok_or_else(invalid)?;
        total = total.checked_add(number).ok_or_else(invalid)?;
    }
    Ok(total)
}

/// Compact elapsed-time label such as `1h30m` or `2w3d`. A year is 52 weeks.
pub fn format_elapsed(seconds: i64) -> String {
    const UNITS: [(&str, i64); 6] = [
        ("y", 60 * 60 * 24 * 7 * 52),
        ("w", 60 * 60 * 24 * 7),
        ("d", 60 * 60 * 24),
        ("h", 60 * 60),
        ("m", 60),
        ("s", 1),
    ];

    if seconds <= 0 {
        return "0s".to_string();
    }

    let mut remaining = seconds;
    let mut label = String::new();
    for (suffix, length) in UNITS {
        let value = remaining / length;
        if value > 0 {
            remaining %= length;
            label.push_str(&format!("{value}{suffix}"));
        }
        if remaining < 1 {
            break;
        }
    }
    label
}

pub fn format_time(value: &DateTime<Tz>, format: &str) -> String {
    value.format(format).to_string()
}
