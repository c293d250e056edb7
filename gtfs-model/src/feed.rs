use crate::objects::*;
use crate::{Error, RawFeed};
use log::info;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::path::Path;
use std::time::Instant;

/// Data structure with all the typed GTFS objects
///
/// Construction is all-or-nothing: every cross-relation reference is checked
/// and the first inconsistency aborts the load, so a [Feed] that exists is a
/// [Feed] whose relations hold together.
///
/// The [StopTime] are accessible from their [Trip].
#[derive(Debug, Default)]
pub struct Feed {
    /// All stops by `stop_id`
    pub stops: HashMap<String, Stop>,
    /// All routes by `route_id`
    pub routes: HashMap<String, Route>,
    /// All trips by `trip_id`, each holding its ordered stop times
    pub trips: HashMap<String, Trip>,
    /// All shape points by `shape_id`, ordered by sequence
    pub shapes: HashMap<String, Vec<Shape>>,
    /// All calendars by `service_id`
    pub calendar: HashMap<String, Calendar>,
    /// All calendar dates grouped by `service_id`
    pub calendar_dates: HashMap<String, Vec<CalendarDate>>,
}

impl TryFrom<RawFeed> for Feed {
    type Error = Error;

    /// Tries to build a [Feed] from a [RawFeed]
    ///
    /// It fails if a mandatory file could not be read, if an object
    /// references an id that does not exist, or if a row violates one of
    /// the feed invariants (unique ids, coordinates in range, increasing
    /// stop sequences, departure not before arrival).
    fn try_from(raw: RawFeed) -> Result<Feed, Error> {
        if raw.calendar.is_none() && raw.calendar_dates.is_none() {
            return Err(Error::MissingCalendar);
        }
        let calendar = to_map(raw.calendar.unwrap_or_else(|| Ok(Vec::new()))?)?;
        let calendar_dates =
            to_calendar_dates(raw.calendar_dates.unwrap_or_else(|| Ok(Vec::new()))?);
        let stops = to_stop_map(raw.stops?)?;
        let routes = to_map(raw.routes?)?;
        let trips = create_trips(
            raw.trips?,
            raw.stop_times?,
            &stops,
            &routes,
            &calendar,
            &calendar_dates,
        )?;
        let shapes = to_shape_map(raw.shapes.unwrap_or_else(|| Ok(Vec::new()))?);

        Ok(Feed {
            stops,
            routes,
            trips,
            shapes,
            calendar,
            calendar_dates,
        })
    }
}

impl Feed {
    /// Reads a feed from a local directory or zipped archive and validates it
    pub fn from_path<P>(path: P) -> Result<Feed, Error>
    where
        P: AsRef<Path>,
    {
        let now = Instant::now();
        let raw = RawFeed::from_path(path)?;
        raw.log_stats();
        let feed = Feed::try_from(raw)?;
        info!("feed loaded in {} ms", now.elapsed().as_millis());
        Ok(feed)
    }

    /// Gets a [Stop] by its `stop_id`
    pub fn get_stop<'a>(&'a self, id: &str) -> Result<&'a Stop, Error> {
        self.stops
            .get(id)
            .ok_or_else(|| Error::ReferenceError(id.to_owned()))
    }

    /// Gets a [Trip] by its `trip_id`
    pub fn get_trip<'a>(&'a self, id: &str) -> Result<&'a Trip, Error> {
        self.trips
            .get(id)
            .ok_or_else(|| Error::ReferenceError(id.to_owned()))
    }

    /// Gets a [Route] by its `route_id`
    pub fn get_route<'a>(&'a self, id: &str) -> Result<&'a Route, Error> {
        self.routes
            .get(id)
            .ok_or_else(|| Error::ReferenceError(id.to_owned()))
    }

    /// Gets a [Calendar] by its `service_id`
    pub fn get_calendar<'a>(&'a self, id: &str) -> Result<&'a Calendar, Error> {
        self.calendar
            .get(id)
            .ok_or_else(|| Error::ReferenceError(id.to_owned()))
    }
}

fn to_map<O: Id>(elements: impl IntoIterator<Item = O>) -> Result<HashMap<String, O>, Error> {
    let mut map = HashMap::new();
    for e in elements {
        if let Some(previous) = map.insert(e.id().to_owned(), e) {
            return Err(Error::DuplicateId(previous.id().to_owned()));
        }
    }
    Ok(map)
}

fn to_stop_map(stops: Vec<Stop>) -> Result<HashMap<String, Stop>, Error> {
    for stop in &stops {
        let latitude_valid = stop.latitude.map_or(true, |l| (-90.0..=90.0).contains(&l));
        let longitude_valid = stop
            .longitude
            .map_or(true, |l| (-180.0..=180.0).contains(&l));
        if !latitude_valid || !longitude_valid {
            return Err(Error::InvalidCoordinate(stop.id.clone()));
        }
    }
    to_map(stops)
}

fn to_shape_map(shapes: Vec<Shape>) -> HashMap<String, Vec<Shape>> {
    let mut res: HashMap<String, Vec<Shape>> = HashMap::new();
    for s in shapes {
        res.entry(s.id.clone()).or_default().push(s);
    }
    for shapes in res.values_mut() {
        shapes.sort_by_key(|s| s.sequence);
    }
    res
}

fn to_calendar_dates(cd: Vec<CalendarDate>) -> HashMap<String, Vec<CalendarDate>> {
    let mut res: HashMap<String, Vec<CalendarDate>> = HashMap::new();
    for c in cd {
        res.entry(c.service_id.clone()).or_default().push(c);
    }
    res
}

fn create_trips(
    raw_trips: Vec<RawTrip>,
    raw_stop_times: Vec<RawStopTime>,
    stops: &HashMap<String, Stop>,
    routes: &HashMap<String, Route>,
    calendar: &HashMap<String, Calendar>,
    calendar_dates: &HashMap<String, Vec<CalendarDate>>,
) -> Result<HashMap<String, Trip>, Error> {
    let mut trips = to_map(raw_trips.into_iter().map(|rt| Trip {
        id: rt.id,
        service_id: rt.service_id,
        route_id: rt.route_id,
        shape_id: rt.shape_id,
        stop_times: vec![],
    }))?;

    for trip in trips.values() {
        if !routes.contains_key(&trip.route_id) {
            return Err(Error::ReferenceError(trip.route_id.clone()));
        }
        if !calendar.contains_key(&trip.service_id)
            && !calendar_dates.contains_key(&trip.service_id)
        {
            return Err(Error::ReferenceError(trip.service_id.clone()));
        }
    }

    for s in raw_stop_times {
        let trip = trips
            .get_mut(&s.trip_id)
            .ok_or_else(|| Error::ReferenceError(s.trip_id.clone()))?;
        if !stops.contains_key(&s.stop_id) {
            return Err(Error::ReferenceError(s.stop_id.clone()));
        }
        if let (Some(arrival), Some(departure)) = (s.arrival_time, s.departure_time) {
            if departure < arrival {
                return Err(Error::DepartureBeforeArrival {
                    trip_id: s.trip_id.clone(),
                    stop_sequence: s.stop_sequence,
                });
            }
        }
        trip.stop_times.push(StopTime::from_raw(&s));
    }

    for trip in trips.values_mut() {
        trip.stop_times.sort_by_key(|st| st.stop_sequence);
        let ordered = trip
            .stop_times
            .windows(2)
            .all(|w| w[0].stop_sequence < w[1].stop_sequence);
        if !ordered {
            return Err(Error::StopSequenceOrder(trip.id.clone()));
        }
    }

    Ok(trips)
}
