//! Game-week boundaries.
//!
//! A league week runs Tuesday 00:00 through Monday 23:59:59 local time;
//! Tuesday is the rest day between Monday night games and the next slate.
//! All results are returned in UTC.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc, Weekday,
};

/// `[start, end]` bounds of one game week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// The week containing `t`, using the host's local time zone.
    pub fn containing(t: DateTime<Utc>) -> Self {
        Self::containing_in(t, &chrono::Local)
    }

    pub fn containing_in<Tz: TimeZone>(t: DateTime<Utc>, tz: &Tz) -> Self {
        Self {
            start: start_time_in(t, tz),
            end: end_time_in(t, tz),
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Most recent Tuesday at local midnight at or before `t`.
pub fn start_time(t: DateTime<Utc>) -> DateTime<Utc> {
    start_time_in(t, &chrono::Local)
}

/// Next Monday at local 23:59:59 at or after `t`.
pub fn end_time(t: DateTime<Utc>) -> DateTime<Utc> {
    end_time_in(t, &chrono::Local)
}

pub fn start_time_in<Tz: TimeZone>(t: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = t.with_timezone(tz);
    let days_back = days_between(Weekday::Tue, local.weekday());
    let tuesday = local.date_naive() - Duration::days(days_back);
    local_to_utc(tz, tuesday.and_time(NaiveTime::MIN))
}

pub fn end_time_in<Tz: TimeZone>(t: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = t.with_timezone(tz);
    let days_ahead = days_between(local.weekday(), Weekday::Mon);
    let monday = local.date_naive() + Duration::days(days_ahead);
    local_to_utc(tz, last_instant_of(monday))
}

/// The next UTC midnight strictly after `now`.
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() + Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Days to walk forward from `from` to reach `to` (0..=6).
fn days_between(from: Weekday, to: Weekday) -> i64 {
    let from = from.num_days_from_monday() as i64;
    let to = to.num_days_from_monday() as i64;
    (to - from).rem_euclid(7)
}

// 23:59:59 with the sub-second part saturated so `t <= end` holds for any t that day.
fn last_instant_of(day: NaiveDate) -> NaiveDateTime {
    let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    day.and_time(end_of_day)
}

fn local_to_utc<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Wall time skipped by a DST jump: apply the zone's offset at that instant.
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&naive).fix().local_minus_utc();
            (naive - Duration::seconds(offset as i64)).and_utc()
        }
    }
}
