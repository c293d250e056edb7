use gtfs_model::Feed;
use rustc_hash::{FxHashMap, FxHashSet};

/// First and last observed service at an entity across a day type, in the
/// same unbounded offset space as the stop times. Offsets past midnight stay
/// above 86400; wrapping them would collapse late service onto the morning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanSummary {
    /// Earliest departure offset
    pub first_departure: u32,
    /// Latest arrival offset
    pub last_arrival: u32,
}

impl SpanSummary {
    /// Length of the service day. Zero is a real outcome: a stop served by
    /// one departure has a span, it is just empty. A stop visited exactly
    /// once can even see its only arrival precede its only departure by the
    /// dwell time, which clamps to zero rather than going negative.
    pub fn duration(&self) -> u32 {
        self.last_arrival.saturating_sub(self.first_departure)
    }

    fn fold(&mut self, other: SpanSummary) {
        self.first_departure = self.first_departure.min(other.first_departure);
        self.last_arrival = self.last_arrival.max(other.last_arrival);
    }
}

fn fold_stop_time(
    spans: &mut FxHashMap<String, SpanSummary>,
    key: &str,
    departure: Option<u32>,
    arrival: Option<u32>,
) {
    // untimed intermediate stop times contribute nothing
    let (Some(first), Some(last)) = (departure.or(arrival), arrival.or(departure)) else {
        return;
    };
    let observed = SpanSummary {
        first_departure: first,
        last_arrival: last,
    };
    spans
        .entry(key.to_owned())
        .and_modify(|span| span.fold(observed))
        .or_insert(observed);
}

/// Span per route over the trips whose service is in `active`. Routes with
/// no active trip are absent from the map, which downstream reports as
/// unavailable rather than a zero.
pub fn route_spans(feed: &Feed, active: &FxHashSet<String>) -> FxHashMap<String, SpanSummary> {
    let mut spans = FxHashMap::default();
    for trip in feed.trips.values() {
        if !active.contains(&trip.service_id) {
            continue;
        }
        for stop_time in &trip.stop_times {
            fold_stop_time(&mut spans, &trip.route_id, stop_time.departure, stop_time.arrival);
        }
    }
    spans
}

/// Span per stop, analogous to [route_spans].
pub fn stop_spans(feed: &Feed, active: &FxHashSet<String>) -> FxHashMap<String, SpanSummary> {
    let mut spans = FxHashMap::default();
    for trip in feed.trips.values() {
        if !active.contains(&trip.service_id) {
            continue;
        }
        for stop_time in &trip.stop_times {
            fold_stop_time(&mut spans, &stop_time.stop_id, stop_time.departure, stop_time.arrival);
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_model::{Calendar, RawFeed, RawStopTime, RawTrip, Route, Stop};
    use std::convert::TryFrom;

    fn active(ids: &[&str]) -> FxHashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn test_feed() -> Feed {
        let stop = |id: &str| Stop {
            id: id.to_owned(),
            latitude: Some(48.79),
            longitude: Some(2.45),
            ..Stop::default()
        };
        let stop_time = |trip: &str, stop: &str, seq: u32, arrival: u32, departure: u32| {
            RawStopTime {
                trip_id: trip.to_owned(),
                stop_id: stop.to_owned(),
                stop_sequence: seq,
                arrival_time: Some(arrival),
                departure_time: Some(departure),
            }
        };
        Feed::try_from(RawFeed {
            calendar: Some(Ok(vec![
                Calendar {
                    id: "wk".to_owned(),
                    monday: true,
                    tuesday: true,
                    wednesday: true,
                    thursday: true,
                    friday: true,
                    saturday: false,
                    sunday: false,
                    start_date: chrono::NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
                    end_date: chrono::NaiveDate::from_ymd_opt(2024, 9, 27).unwrap(),
                },
                Calendar {
                    id: "sun".to_owned(),
                    monday: false,
                    tuesday: false,
                    wednesday: false,
                    thursday: false,
                    friday: false,
                    saturday: false,
                    sunday: true,
                    start_date: chrono::NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
                    end_date: chrono::NaiveDate::from_ymd_opt(2024, 9, 27).unwrap(),
                },
            ])),
            stops: Ok(vec![stop("a"), stop("b")]),
            routes: Ok(vec![Route {
                id: "r1".to_owned(),
                ..Route::default()
            }]),
            trips: Ok(vec![
                RawTrip {
                    id: "t1".to_owned(),
                    route_id: "r1".to_owned(),
                    service_id: "wk".to_owned(),
                    shape_id: None,
                },
                RawTrip {
                    id: "t2".to_owned(),
                    route_id: "r1".to_owned(),
                    service_id: "wk".to_owned(),
                    shape_id: None,
                },
                RawTrip {
                    id: "t3".to_owned(),
                    route_id: "r1".to_owned(),
                    service_id: "sun".to_owned(),
                    shape_id: None,
                },
            ]),
            stop_times: Ok(vec![
                stop_time("t1", "a", 1, 21600, 21630),
                stop_time("t1", "b", 2, 22200, 22200),
                stop_time("t2", "a", 1, 90600, 90900),
                stop_time("t2", "b", 2, 91800, 91800),
                // the sunday trip, not active on weekdays
                stop_time("t3", "a", 1, 36000, 36000),
            ]),
            ..RawFeed::default()
        })
        .unwrap()
    }

    #[test]
    fn route_span_covers_first_to_last_active_trip() {
        let feed = test_feed();
        let spans = route_spans(&feed, &active(&["wk"]));
        let span = spans["r1"];
        assert_eq!(21630, span.first_departure);
        // post-midnight arrival preserved, not wrapped
        assert_eq!(91800, span.last_arrival);
        assert_eq!(91800 - 21630, span.duration());
    }

    #[test]
    fn stop_span_only_sees_its_own_visits() {
        let feed = test_feed();
        let spans = stop_spans(&feed, &active(&["wk"]));
        let b = spans["b"];
        assert_eq!(22200, b.first_departure);
        assert_eq!(91800, b.last_arrival);
    }

    #[test]
    fn inactive_services_leave_no_span() {
        let feed = test_feed();
        let spans = route_spans(&feed, &active(&[]));
        assert!(spans.is_empty());
    }

    #[test]
    fn single_visit_has_zero_duration_not_unavailable() {
        let feed = test_feed();
        let spans = stop_spans(&feed, &active(&["sun"]));
        let a = spans["a"];
        assert_eq!(0, a.duration());
    }

    #[test]
    fn dwell_at_a_single_visit_clamps_to_zero() {
        let span = SpanSummary {
            first_departure: 100,
            last_arrival: 50,
        };
        assert_eq!(0, span.duration());
    }
}
