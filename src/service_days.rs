use chrono::{Datelike, NaiveDate, Weekday};
use gtfs_model::{Exception, Feed};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// Aggregation bucket over calendar dates.
///
/// Classification is a policy, not something intrinsic to the feed; the
/// configuration chooses which buckets take part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Saturday,
    Sunday,
}

impl DayType {
    pub fn classify(date: NaiveDate) -> DayType {
        match date.weekday() {
            Weekday::Sat => DayType::Saturday,
            Weekday::Sun => DayType::Sunday,
            _ => DayType::Weekday,
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            DayType::Weekday => "weekday",
            DayType::Saturday => "saturday",
            DayType::Sunday => "sunday",
        };
        write!(f, "{}", label)
    }
}

/// Inclusive range of calendar dates a run aggregates over.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The feed's own validity envelope: the span of its calendars plus any
    /// exception dates outside them.
    pub fn from_feed(feed: &Feed) -> Option<DateRange> {
        let mut range: Option<DateRange> = None;
        let mut extend = |start: NaiveDate, end: NaiveDate| match &mut range {
            Some(r) => {
                r.start = r.start.min(start);
                r.end = r.end.max(end);
            }
            None => range = Some(DateRange { start, end }),
        };
        for calendar in feed.calendar.values() {
            extend(calendar.start_date, calendar.end_date);
        }
        for dates in feed.calendar_dates.values() {
            for date in dates {
                if date.exception_type == Exception::Added {
                    extend(date.date, date.date);
                }
            }
        }
        range
    }
}

/// The concrete set of calendar dates each service runs on, materialized
/// once so the span and frequency engines only ever compare explicit dates.
#[derive(Debug, Default)]
pub struct ServiceDaySet {
    active: FxHashMap<String, BTreeSet<NaiveDate>>,
}

impl ServiceDaySet {
    /// Expands the weekday bitsets over the date range, then applies the
    /// exception dates: added dates union in, removed dates subtract.
    pub fn resolve(feed: &Feed, range: DateRange) -> ServiceDaySet {
        let mut active: FxHashMap<String, BTreeSet<NaiveDate>> = FxHashMap::default();

        for (id, calendar) in &feed.calendar {
            let days = active.entry(id.clone()).or_default();
            let mut date = calendar.start_date.max(range.start);
            let end = calendar.end_date.min(range.end);
            while date <= end {
                if calendar.valid_weekday(date) {
                    days.insert(date);
                }
                match date.succ_opt() {
                    Some(next) => date = next,
                    None => break,
                }
            }
        }

        for (id, dates) in &feed.calendar_dates {
            let days = active.entry(id.clone()).or_default();
            for exception in dates {
                if exception.date < range.start || exception.date > range.end {
                    continue;
                }
                match exception.exception_type {
                    Exception::Added => {
                        days.insert(exception.date);
                    }
                    Exception::Deleted => {
                        days.remove(&exception.date);
                    }
                }
            }
        }

        active.retain(|_, days| !days.is_empty());
        ServiceDaySet { active }
    }

    /// The dates a service runs on; None when it never runs in range.
    pub fn dates(&self, service_id: &str) -> Option<&BTreeSet<NaiveDate>> {
        self.active.get(service_id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }
}

/// For each configured bucket, the services active on at least one of its
/// dates. A trip takes part in a bucket's metrics iff its service is listed.
#[derive(Debug, Default)]
pub struct DayTypeIndex {
    services: FxHashMap<DayType, FxHashSet<String>>,
}

impl DayTypeIndex {
    pub fn build(day_set: &ServiceDaySet, buckets: &[DayType]) -> DayTypeIndex {
        let mut services: FxHashMap<DayType, FxHashSet<String>> =
            buckets.iter().map(|b| (*b, FxHashSet::default())).collect();
        for (id, dates) in &day_set.active {
            for date in dates {
                if let Some(set) = services.get_mut(&DayType::classify(*date)) {
                    set.insert(id.clone());
                }
            }
        }
        DayTypeIndex { services }
    }

    /// Services active on the given day type; None when the bucket is not
    /// part of the run's configuration.
    pub fn active_services(&self, day_type: DayType) -> Option<&FxHashSet<String>> {
        self.services.get(&day_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_model::{Calendar, CalendarDate, RawFeed};
    use std::convert::TryFrom;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekday_calendar(id: &str) -> Calendar {
        Calendar {
            id: id.to_owned(),
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: false,
            sunday: false,
            start_date: date(2024, 9, 2),
            end_date: date(2024, 9, 13),
        }
    }

    fn feed_with(
        calendar: Vec<Calendar>,
        calendar_dates: Vec<CalendarDate>,
    ) -> Feed {
        Feed::try_from(RawFeed {
            calendar: Some(Ok(calendar)),
            calendar_dates: Some(Ok(calendar_dates)),
            ..RawFeed::default()
        })
        .unwrap()
    }

    #[test]
    fn weekday_bitset_expands_to_concrete_dates() {
        let feed = feed_with(vec![weekday_calendar("wk")], vec![]);
        let range = DateRange {
            start: date(2024, 9, 2),
            end: date(2024, 9, 13),
        };
        let days = ServiceDaySet::resolve(&feed, range);
        let dates = days.dates("wk").unwrap();
        // two full Mon-Fri weeks
        assert_eq!(10, dates.len());
        assert!(dates.contains(&date(2024, 9, 2)));
        assert!(!dates.contains(&date(2024, 9, 7)));
        assert!(!dates.contains(&date(2024, 9, 8)));
    }

    #[test]
    fn removed_exception_subtracts_exactly_that_date() {
        let feed = feed_with(
            vec![weekday_calendar("wk")],
            vec![CalendarDate {
                service_id: "wk".to_owned(),
                date: date(2024, 9, 11),
                exception_type: Exception::Deleted,
            }],
        );
        let range = DateRange {
            start: date(2024, 9, 2),
            end: date(2024, 9, 13),
        };
        let days = ServiceDaySet::resolve(&feed, range);
        let dates = days.dates("wk").unwrap();
        assert_eq!(9, dates.len());
        assert!(!dates.contains(&date(2024, 9, 11)));
        assert!(dates.contains(&date(2024, 9, 10)));
        assert!(dates.contains(&date(2024, 9, 12)));
    }

    #[test]
    fn added_exception_unions_in_and_respects_range() {
        let feed = feed_with(
            vec![weekday_calendar("wk")],
            vec![
                CalendarDate {
                    service_id: "wk".to_owned(),
                    date: date(2024, 9, 7),
                    exception_type: Exception::Added,
                },
                CalendarDate {
                    service_id: "wk".to_owned(),
                    date: date(2024, 10, 5),
                    exception_type: Exception::Added,
                },
            ],
        );
        let range = DateRange {
            start: date(2024, 9, 2),
            end: date(2024, 9, 13),
        };
        let days = ServiceDaySet::resolve(&feed, range);
        let dates = days.dates("wk").unwrap();
        assert!(dates.contains(&date(2024, 9, 7)));
        // outside the range, ignored
        assert!(!dates.contains(&date(2024, 10, 5)));
    }

    #[test]
    fn exception_only_service_exists() {
        let feed = feed_with(
            vec![],
            vec![CalendarDate {
                service_id: "special".to_owned(),
                date: date(2024, 9, 8),
                exception_type: Exception::Added,
            }],
        );
        let range = DateRange {
            start: date(2024, 9, 2),
            end: date(2024, 9, 13),
        };
        let days = ServiceDaySet::resolve(&feed, range);
        assert_eq!(1, days.len());
        assert!(days.dates("special").unwrap().contains(&date(2024, 9, 8)));
    }

    #[test]
    fn day_type_index_groups_services_by_bucket() {
        let mut saturday = weekday_calendar("sat");
        saturday.monday = false;
        saturday.tuesday = false;
        saturday.wednesday = false;
        saturday.thursday = false;
        saturday.friday = false;
        saturday.saturday = true;
        let feed = feed_with(vec![weekday_calendar("wk"), saturday], vec![]);
        let range = DateRange {
            start: date(2024, 9, 2),
            end: date(2024, 9, 13),
        };
        let days = ServiceDaySet::resolve(&feed, range);
        let index = DayTypeIndex::build(
            &days,
            &[DayType::Weekday, DayType::Saturday, DayType::Sunday],
        );
        assert!(index
            .active_services(DayType::Weekday)
            .unwrap()
            .contains("wk"));
        assert!(index
            .active_services(DayType::Saturday)
            .unwrap()
            .contains("sat"));
        assert!(!index
            .active_services(DayType::Saturday)
            .unwrap()
            .contains("wk"));
        assert!(index.active_services(DayType::Sunday).unwrap().is_empty());
    }

    #[test]
    fn classify_is_total_over_the_week() {
        assert_eq!(DayType::Weekday, DayType::classify(date(2024, 9, 2)));
        assert_eq!(DayType::Saturday, DayType::classify(date(2024, 9, 7)));
        assert_eq!(DayType::Sunday, DayType::classify(date(2024, 9, 8)));
    }
}
