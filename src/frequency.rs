use crate::config::TimeWindow;
use gtfs_model::Feed;
use rustc_hash::{FxHashMap, FxHashSet};

/// Headway statistics of one entity inside one time-of-day window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Departures falling inside the window
    pub trip_count: usize,
    /// Window span divided by the departure count; None below two
    /// departures, since a single point defines no interval.
    pub mean_headway: Option<f64>,
    /// Largest wait between consecutive departures, with the window
    /// boundaries acting as virtual departures so a long silence at either
    /// edge of the window stays visible. An empty window is one full-span
    /// gap.
    pub max_gap: f64,
}

/// Departure stream per route: the origin departure of each active trip.
/// Route headway is measured where the service originates; measuring at
/// every stop would count each trip once per stop.
pub fn route_departures(feed: &Feed, active: &FxHashSet<String>) -> FxHashMap<String, Vec<u32>> {
    let mut departures: FxHashMap<String, Vec<u32>> = FxHashMap::default();
    for trip in feed.trips.values() {
        if !active.contains(&trip.service_id) {
            continue;
        }
        let Some(origin) = trip
            .stop_times
            .iter()
            .find_map(|st| st.departure.or(st.arrival))
        else {
            continue;
        };
        departures.entry(trip.route_id.clone()).or_default().push(origin);
    }
    departures
}

/// Departure stream per stop: every departure at the stop, all routes mixed.
pub fn stop_departures(feed: &Feed, active: &FxHashSet<String>) -> FxHashMap<String, Vec<u32>> {
    let mut departures: FxHashMap<String, Vec<u32>> = FxHashMap::default();
    for trip in feed.trips.values() {
        if !active.contains(&trip.service_id) {
            continue;
        }
        for stop_time in &trip.stop_times {
            if let Some(departure) = stop_time.departure.or(stop_time.arrival) {
                departures
                    .entry(stop_time.stop_id.clone())
                    .or_default()
                    .push(departure);
            }
        }
    }
    departures
}

/// Statistics of the departures that fall inside `window`. The stream does
/// not need to be sorted or pre-filtered.
pub fn window_stats(departures: &[u32], window: &TimeWindow) -> WindowStats {
    let mut inside: Vec<u32> = departures
        .iter()
        .copied()
        .filter(|d| window.contains(*d))
        .collect();
    inside.sort_unstable();

    let trip_count = inside.len();
    let mean_headway = if trip_count >= 2 {
        Some(window.span() as f64 / trip_count as f64)
    } else {
        None
    };

    let mut max_gap = 0;
    let mut previous = window.start;
    for departure in &inside {
        max_gap = max_gap.max(departure - previous);
        previous = *departure;
    }
    max_gap = max_gap.max(window.end - previous);

    WindowStats {
        trip_count,
        mean_headway,
        max_gap: max_gap as f64,
    }
}
