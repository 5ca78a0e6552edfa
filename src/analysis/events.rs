//! Event-Proximity Tagger
//!
//! Distance from a quote date to the nearest scheduled event, in whole days.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EventConfig;

/// Proximity of one quote to the event calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventProximity {
    /// min |quote_date - event_date| in days
    pub days_to_event: i64,
    /// days_to_event <= window
    pub near_event: bool,
}

/// Sorted, deduplicated list of event dates plus the proximity window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCalendar {
    dates: Vec<NaiveDate>,
    window_days: i64,
}

impl EventCalendar {
    pub fn new(mut dates: Vec<NaiveDate>, window_days: i64) -> Self {
        dates.sort();
        dates.dedup();
        Self { dates, window_days }
    }

    pub fn from_config(config: &EventConfig) -> Self {
        Self::new(config.dates.clone(), config.window_days)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    /// Days to the nearest event; `None` for an empty calendar
    pub fn days_to_event(&self, date: NaiveDate) -> Option<i64> {
        // first event on or after `date`
        let idx = self.dates.partition_point(|d| *d < date);

        let after = self.dates.get(idx).map(|d| (*d - date).num_days());
        let before = idx
            .checked_sub(1)
            .and_then(|i| self.dates.get(i))
            .map(|d| (date - *d).num_days());

        match (before, after) {
            (Some(b), Some(a)) => Some(b.min(a)),
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    /// Tag a date against the calendar
    pub fn proximity(&self, date: NaiveDate) -> Option<EventProximity> {
        self.days_to_event(date).map(|days| EventProximity {
            days_to_event: days,
            near_event: days <= self.window_days,
        })
    }

    /// Tag a quote timestamp; the time of day is dropped first
    pub fn tag(&self, quote_date: DateTime<Utc>) -> Option<EventProximity> {
        self.proximity(quote_date.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> EventCalendar {
        EventCalendar::new(
            vec![date(2021, 5, 26), date(2021, 2, 24), date(2021, 8, 18)],
            3,
        )
    }

    #[test]
    fn test_window_boundary() {
        let cal = calendar();

        let three_days = cal.proximity(date(2021, 5, 23)).unwrap();
        assert_eq!(three_days.days_to_event, 3);
        assert!(three_days.near_event);

        let four_days = cal.proximity(date(2021, 5, 30)).unwrap();
        assert_eq!(four_days.days_to_event, 4);
        assert!(!four_days.near_event);

        let on_event = cal.proximity(date(2021, 8, 18)).unwrap();
        assert_eq!(on_event.days_to_event, 0);
        assert!(on_event.near_event);
    }

    #[test]
    fn test_outside_calendar_range_no_wraparound() {
        let cal = calendar();
        assert_eq!(cal.days_to_event(date(2021, 2, 1)), Some(23));
        assert_eq!(cal.days_to_event(date(2021, 12, 31)), Some(135));
    }

    #[test]
    fn test_nearest_of_two_neighbours() {
        let cal = calendar();
        // 2021-04-10 is 45 days after Feb 24 and 46 days before May 26
        assert_eq!(cal.days_to_event(date(2021, 4, 10)), Some(45));
    }

    #[test]
    fn test_time_of_day_truncated() {
        let cal = calendar();
        let late = Utc.with_ymd_and_hms(2021, 5, 29, 23, 59, 0).unwrap();
        assert_eq!(cal.tag(late).unwrap().days_to_event, 3);
    }

    #[test]
    fn test_empty_calendar() {
        let cal = EventCalendar::new(Vec::new(), 3);
        assert_eq!(cal.days_to_event(date(2021, 1, 1)), None);
        assert_eq!(cal.proximity(date(2021, 1, 1)), None);
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let cal = EventCalendar::new(vec![date(2022, 1, 1), date(2021, 1, 1), date(2022, 1, 1)], 3);
        assert_eq!(cal.dates(), &[date(2021, 1, 1), date(2022, 1, 1)]);
    }
}
