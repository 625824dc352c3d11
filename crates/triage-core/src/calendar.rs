//! Business calendars: how target minutes turn into a due timestamp.
//!
//! [`WallClock`] counts every minute. [`BusinessHours`] only counts minutes
//! that fall inside working hours on working days.

use chrono::{DateTime, Datelike as _, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Strategy for adding SLA target minutes to a reference time.
pub trait BusinessCalendar: Send + Sync {
  fn add_minutes(&self, start: DateTime<Utc>, minutes: u32) -> DateTime<Utc>;
}

impl<C: BusinessCalendar + ?Sized> BusinessCalendar for &C {
  fn add_minutes(&self, start: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    (**self).add_minutes(start, minutes)
  }
}

// ─── WallClock ───────────────────────────────────────────────────────────────

/// Round-the-clock support: every minute counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl BusinessCalendar for WallClock {
  fn add_minutes(&self, start: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    start + Duration::minutes(i64::from(minutes))
  }
}

// ─── BusinessHours ───────────────────────────────────────────────────────────

/// Fixed daily opening hours (UTC) on a set of weekdays, minus holidays.
///
/// Deserialisation goes through [`BusinessHours::new`], so every value holds
/// at least one working day and an opening time before the closing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawBusinessHours")]
pub struct BusinessHours {
  workdays: Vec<Weekday>,
  opens:    NaiveTime,
  closes:   NaiveTime,
  holidays: Vec<NaiveDate>,
}

#[derive(Deserialize)]
struct RawBusinessHours {
  workdays: Vec<Weekday>,
  opens:    NaiveTime,
  closes:   NaiveTime,
  #[serde(default)]
  holidays: Vec<NaiveDate>,
}

impl TryFrom<RawBusinessHours> for BusinessHours {
  type Error = Error;

  fn try_from(raw: RawBusinessHours) -> Result<Self> {
    Self::new(raw.workdays, raw.opens, raw.closes, raw.holidays)
  }
}

impl BusinessHours {
  pub fn new(
    workdays: Vec<Weekday>,
    opens: NaiveTime,
    closes: NaiveTime,
    holidays: Vec<NaiveDate>,
  ) -> Result<Self> {
    if workdays.is_empty() {
      return Err(Error::InvalidInput(
        "business hours need at least one working day".into(),
      ));
    }
    if opens >= closes {
      return Err(Error::InvalidInput(format!(
        "opening time {opens} must be before closing time {closes}"
      )));
    }
    Ok(Self { workdays, opens, closes, holidays })
  }

  /// Monday to Friday, 09:00 to 17:00 UTC, no holidays.
  pub fn weekdays_nine_to_five() -> Self {
    Self {
      workdays: vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
      ],
      opens:    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
      closes:   NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
      holidays: Vec::new(),
    }
  }

  fn is_working_day(&self, date: NaiveDate) -> bool {
    self.workdays.contains(&date.weekday()) && !self.holidays.contains(&date)
  }

  /// Opening time of the first working day after `date`. Any run of
  /// `7 + holidays` consecutive days holds a working day, so the search is
  /// bounded; `None` only past the end of the calendar.
  fn next_opening(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
    let mut day = date;
    for _ in 0..=7 + self.holidays.len() {
      day = day.succ_opt()?;
      if self.is_working_day(day) {
        return Some(day.and_time(self.opens).and_utc());
      }
    }
    None
  }
}

impl BusinessCalendar for BusinessHours {
  fn add_minutes(&self, start: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    if minutes == 0 {
      return start;
    }

    let mut remaining = Duration::minutes(i64::from(minutes));
    let mut cursor = start;

    loop {
      let date = cursor.date_naive();
      if self.is_working_day(date) {
        let open = date.and_time(self.opens).and_utc();
        let close = date.and_time(self.closes).and_utc();
        let from = cursor.max(open);
        if from < close {
          let available = close - from;
          if remaining <= available {
            return from + remaining;
          }
          remaining = remaining - available;
        }
      }

      let Some(next_opening) = self.next_opening(date) else {
        return DateTime::<Utc>::MAX_UTC;
      };
      cursor = next_opening;
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
  }

  #[test]
  fn wall_clock_adds_plain_minutes() {
    let start = at(2024, 3, 1, 23, 50);
    assert_eq!(WallClock.add_minutes(start, 15), at(2024, 3, 2, 0, 5));
    assert_eq!(WallClock.add_minutes(start, 0), start);
  }

  #[test]
  fn business_hours_within_one_day() {
    // 2024-03-04 is a Monday.
    let cal = BusinessHours::weekdays_nine_to_five();
    assert_eq!(
      cal.add_minutes(at(2024, 3, 4, 10, 0), 90),
      at(2024, 3, 4, 11, 30)
    );
  }

  #[test]
  fn business_hours_before_opening_starts_at_opening() {
    let cal = BusinessHours::weekdays_nine_to_five();
    assert_eq!(
      cal.add_minutes(at(2024, 3, 4, 6, 0), 30),
      at(2024, 3, 4, 9, 30)
    );
  }

  #[test]
  fn business_hours_roll_over_the_weekend() {
    // Friday 16:00 + 120 business minutes = Monday 10:00.
    let cal = BusinessHours::weekdays_nine_to_five();
    assert_eq!(
      cal.add_minutes(at(2024, 3, 8, 16, 0), 120),
      at(2024, 3, 11, 10, 0)
    );
  }

  #[test]
  fn business_hours_skip_holidays() {
    let holiday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let base = BusinessHours::weekdays_nine_to_five();
    let cal = BusinessHours::new(
      base.workdays.clone(),
      base.opens,
      base.closes,
      vec![holiday],
    )
    .unwrap();
    // Monday 16:30 + 60 minutes: 30 on Monday, Tuesday is a holiday,
    // 30 more on Wednesday.
    assert_eq!(
      cal.add_minutes(at(2024, 3, 4, 16, 30), 60),
      at(2024, 3, 6, 9, 30)
    );
  }

  #[test]
  fn business_hours_rejects_inverted_window() {
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
    assert!(BusinessHours::new(vec![Weekday::Mon], five, nine, vec![]).is_err());
    assert!(BusinessHours::new(vec![], nine, five, vec![]).is_err());
  }

  #[test]
  fn deserialising_applies_the_same_checks() {
    let inverted = r#"{"workdays": ["Mon"], "opens": "17:00:00", "closes": "09:00:00"}"#;
    assert!(serde_json::from_str::<BusinessHours>(inverted).is_err());

    let no_days = r#"{"workdays": [], "opens": "09:00:00", "closes": "17:00:00"}"#;
    assert!(serde_json::from_str::<BusinessHours>(no_days).is_err());

    let valid = r#"{"workdays": ["Mon", "Tue"], "opens": "09:00:00", "closes": "17:00:00"}"#;
    let cal: BusinessHours = serde_json::from_str(valid).unwrap();
    assert!(cal.holidays.is_empty());
    assert_eq!(
      cal.add_minutes(at(2024, 3, 4, 10, 0), 30),
      at(2024, 3, 4, 10, 30)
    );
  }

  #[test]
  fn business_hours_saturate_at_end_of_calendar() {
    let cal = BusinessHours::weekdays_nine_to_five();
    let last_day = NaiveDate::MAX.and_time(NaiveTime::MIN).and_utc();
    assert_eq!(cal.add_minutes(last_day, 10_000), DateTime::<Utc>::MAX_UTC);
  }
}
