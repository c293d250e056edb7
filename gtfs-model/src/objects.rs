pub use crate::enums::*;
use crate::serde_helpers::*;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Objects that have an identifier implement this trait
///
/// Those identifiers are technical and should not be shown to travellers
pub trait Id {
    /// Identifier of the object
    fn id(&self) -> &str;
}

/// A calendar describes on which days a service runs. See <https://gtfs.org/reference/static/#calendartxt>
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Calendar {
    /// Unique technical identifier (not for the traveller) of this calendar
    #[serde(rename = "service_id")]
    pub id: String,
    /// Does the service run on mondays
    #[serde(
        deserialize_with = "deserialize_bool",
        serialize_with = "serialize_bool"
    )]
    pub monday: bool,
    /// Does the service run on tuesdays
    #[serde(
        deserialize_with = "deserialize_bool",
        serialize_with = "serialize_bool"
    )]
    pub tuesday: bool,
    /// Does the service run on wednesdays
    #[serde(
        deserialize_with = "deserialize_bool",
        serialize_with = "serialize_bool"
    )]
    pub wednesday: bool,
    /// Does the service run on thursdays
    #[serde(
        deserialize_with = "deserialize_bool",
        serialize_with = "serialize_bool"
    )]
    pub thursday: bool,
    /// Does the service run on fridays
    #[serde(
        deserialize_with = "deserialize_bool",
        serialize_with = "serialize_bool"
    )]
    pub friday: bool,
    /// Does the service run on saturdays
    #[serde(
        deserialize_with = "deserialize_bool",
        serialize_with = "serialize_bool"
    )]
    pub saturday: bool,
    /// Does the service run on sundays
    #[serde(
        deserialize_with = "deserialize_bool",
        serialize_with = "serialize_bool"
    )]
    pub sunday: bool,
    /// First service day of the validity interval
    #[serde(
        deserialize_with = "deserialize_date",
        serialize_with = "serialize_date"
    )]
    pub start_date: NaiveDate,
    /// Last service day of the validity interval. This day is included
    #[serde(
        deserialize_with = "deserialize_date",
        serialize_with = "serialize_date"
    )]
    pub end_date: NaiveDate,
}

impl Id for Calendar {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}—{}", self.start_date, self.end_date)
    }
}

impl Calendar {
    /// Does the weekday bitset allow service on that date
    pub fn valid_weekday(&self, date: NaiveDate) -> bool {
        match date.weekday() {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

/// A specific date that is added to or removed from a [Calendar]. See <https://gtfs.org/reference/static/#calendar_datestxt>
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CalendarDate {
    /// Identifier of the service that is modified at this date
    pub service_id: String,
    /// Date where the service will be added or deleted
    #[serde(
        deserialize_with = "deserialize_date",
        serialize_with = "serialize_date"
    )]
    pub date: NaiveDate,
    /// Is the service added or deleted
    pub exception_type: Exception,
}

/// A physical stop, station or area. See <https://gtfs.org/reference/static/#stopstxt>
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Stop {
    /// Unique technical identifier (not for the traveller) of the stop
    #[serde(rename = "stop_id")]
    pub id: String,
    /// Short text or a number that identifies the location for riders
    #[serde(rename = "stop_code")]
    pub code: Option<String>,
    /// Name of the location
    #[serde(rename = "stop_name", default)]
    pub name: String,
    /// Type of the location
    #[serde(default, deserialize_with = "de_with_empty_default")]
    pub location_type: LocationType,
    /// Defines hierarchy between the different locations; a weak reference, never validated
    pub parent_station: Option<String>,
    /// Longitude of the stop
    #[serde(deserialize_with = "de_with_optional_float", default)]
    #[serde(rename = "stop_lon")]
    pub longitude: Option<f64>,
    /// Latitude of the stop
    #[serde(deserialize_with = "de_with_optional_float", default)]
    #[serde(rename = "stop_lat")]
    pub latitude: Option<f64>,
}

impl Id for Stop {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A route is a commercial line. See <https://gtfs.org/reference/static/#routestxt>
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Route {
    /// Unique technical identifier (not for the traveller) of the route
    #[serde(rename = "route_id")]
    pub id: String,
    /// Short name of the route, like "32" or "Green"
    #[serde(rename = "route_short_name", default)]
    pub short_name: String,
    /// Full name of the route, generally more descriptive than the short name
    #[serde(rename = "route_long_name", default)]
    pub long_name: String,
    /// Mode of transportation used on the route
    #[serde(rename = "route_type", default)]
    pub mode: RouteMode,
}

impl Id for Route {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.long_name.is_empty() {
            write!(f, "{}", self.long_name)
        } else {
            write!(f, "{}", self.short_name)
        }
    }
}

/// A trip as read from trips.txt, before its stop times are attached. See <https://gtfs.org/reference/static/#tripstxt>
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RawTrip {
    /// Unique technical identifier (not for the traveller) of the trip
    #[serde(rename = "trip_id")]
    pub id: String,
    /// References the [Calendar] on which this trip runs
    pub service_id: String,
    /// References along which [Route] this trip runs
    pub route_id: String,
    /// Shape of the trip
    pub shape_id: Option<String>,
}

impl Id for RawTrip {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A [StopTime] where the relations with [RawTrip] and [Stop] have not been tested yet
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct RawStopTime {
    /// Trip to which this stop time belongs
    pub trip_id: String,
    /// Arrival offset, in seconds from the service day's nominal midnight;
    /// may exceed 86399 for post-midnight service on the same service day
    #[serde(
        deserialize_with = "deserialize_optional_time",
        serialize_with = "serialize_optional_time",
        default
    )]
    pub arrival_time: Option<u32>,
    /// Departure offset, same space as the arrival offset
    #[serde(
        deserialize_with = "deserialize_optional_time",
        serialize_with = "serialize_optional_time",
        default
    )]
    pub departure_time: Option<u32>,
    /// Identifier of the [Stop] where the vehicle stops
    pub stop_id: String,
    /// Order of stops for a particular trip. The values must increase along
    /// the trip but do not need to be consecutive
    pub stop_sequence: u32,
}

/// A [Stop] visit within its owning [Trip], relations validated
#[derive(Debug, Serialize, Clone, Default)]
pub struct StopTime {
    /// Identifier of the visited [Stop]
    pub stop_id: String,
    /// Arrival offset in seconds from the service day's nominal midnight
    pub arrival: Option<u32>,
    /// Departure offset, never below the arrival offset
    pub departure: Option<u32>,
    /// Order of this visit within the trip
    pub stop_sequence: u32,
}

impl StopTime {
    pub(crate) fn from_raw(raw: &RawStopTime) -> Self {
        StopTime {
            stop_id: raw.stop_id.clone(),
            arrival: raw.arrival_time,
            departure: raw.departure_time,
            stop_sequence: raw.stop_sequence,
        }
    }
}

/// A trip with all the [StopTime] that define it
#[derive(Debug, Serialize, Clone, Default)]
pub struct Trip {
    /// Unique technical identifier (not for the traveller) of the trip
    pub id: String,
    /// References the [Calendar] on which this trip runs
    pub service_id: String,
    /// References along which [Route] this trip runs
    pub route_id: String,
    /// Shape of the trip
    pub shape_id: Option<String>,
    /// All the stop visits of the trip, ordered by stop_sequence
    pub stop_times: Vec<StopTime>,
}

impl Id for Trip {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A single shape point. See <https://gtfs.org/reference/static/#shapestxt>
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Shape {
    /// Unique technical identifier (not for the traveller) of the shape
    #[serde(rename = "shape_id")]
    pub id: String,
    /// Latitude of the shape point
    #[serde(rename = "shape_pt_lat", default)]
    pub latitude: f64,
    /// Longitude of the shape point
    #[serde(rename = "shape_pt_lon", default)]
    pub longitude: f64,
    /// Order of the shape points
    #[serde(rename = "shape_pt_sequence")]
    pub sequence: usize,
}

impl Id for Shape {
    fn id(&self) -> &str {
        &self.id
    }
}
