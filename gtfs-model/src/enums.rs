use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;

fn serialize_i32_as_str<S: Serializer>(s: S, value: i32) -> Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

/// Describes the kind of [crate::Stop]. See <https://gtfs.org/reference/static/#stopstxt> `location_type`
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LocationType {
    /// Stop (or Platform). A location where passengers board or disembark from a transit vehicle
    #[default]
    StopPoint,
    /// Station. A physical structure or area that contains one or more platform
    StopArea,
    /// A location where passengers can enter or exit a station from the street
    StationEntrance,
    /// A location within a station, not matching any other [crate::Stop::location_type]
    GenericNode,
    /// A specific location on a platform, where passengers can board and/or alight vehicles
    BoardingArea,
    /// An unknown value
    Unknown(i32),
}

impl<'de> Deserialize<'de> for LocationType {
    fn deserialize<D>(deserializer: D) -> Result<LocationType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "" | "0" => LocationType::StopPoint,
            "1" => LocationType::StopArea,
            "2" => LocationType::StationEntrance,
            "3" => LocationType::GenericNode,
            "4" => LocationType::BoardingArea,
            s => LocationType::Unknown(s.parse().map_err(|_| {
                serde::de::Error::custom(format!(
                    "invalid value for LocationType, must be an integer: {}",
                    s
                ))
            })?),
        })
    }
}

impl Serialize for LocationType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_i32_as_str(
            serializer,
            match self {
                LocationType::StopPoint => 0,
                LocationType::StopArea => 1,
                LocationType::StationEntrance => 2,
                LocationType::GenericNode => 3,
                LocationType::BoardingArea => 4,
                LocationType::Unknown(i) => *i,
            },
        )
    }
}

/// Travel mode of a [crate::Route]. See <https://gtfs.org/reference/static/#routestxt> `route_type`
///
/// Extended route type codes (<https://developers.google.com/transit/gtfs/reference/extended-route-types>)
/// are kept as [RouteMode::Other] with their original value.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RouteMode {
    /// Tram, streetcar, light rail. Any street level system within a metropolitan area
    Tram,
    /// Any underground rail system within a metropolitan area
    Subway,
    /// Used for intercity or long-distance travel
    Rail,
    /// Used for short- and long-distance bus routes
    #[default]
    Bus,
    /// Used for short- and long-distance boat service
    Ferry,
    /// Any other value, including the extended route type codes
    Other(i32),
}

impl<'de> Deserialize<'de> for RouteMode {
    fn deserialize<D>(deserializer: D) -> Result<RouteMode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "0" => RouteMode::Tram,
            "1" => RouteMode::Subway,
            "2" => RouteMode::Rail,
            "" | "3" => RouteMode::Bus,
            "4" => RouteMode::Ferry,
            s => RouteMode::Other(s.parse().map_err(|_| {
                serde::de::Error::custom(format!(
                    "invalid value for RouteMode, must be an integer: {}",
                    s
                ))
            })?),
        })
    }
}

impl Serialize for RouteMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_i32_as_str(
            serializer,
            match self {
                RouteMode::Tram => 0,
                RouteMode::Subway => 1,
                RouteMode::Rail => 2,
                RouteMode::Bus => 3,
                RouteMode::Ferry => 4,
                RouteMode::Other(i) => *i,
            },
        )
    }
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            RouteMode::Tram => "tram",
            RouteMode::Subway => "subway",
            RouteMode::Rail => "rail",
            RouteMode::Bus => "bus",
            RouteMode::Ferry => "ferry",
            RouteMode::Other(_) => "other",
        };
        write!(f, "{}", label)
    }
}

/// Is the service added or removed on a [crate::CalendarDate]. See
/// <https://gtfs.org/reference/static/#calendar_datestxt> `exception_type`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// The service is added on that date
    Added,
    /// The service is removed on that date
    Deleted,
}

impl<'de> Deserialize<'de> for Exception {
    fn deserialize<D>(deserializer: D) -> Result<Exception, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        match s.as_str() {
            "1" => Ok(Exception::Added),
            "2" => Ok(Exception::Deleted),
            s => Err(serde::de::Error::custom(format!(
                "invalid value for Exception, must be 1 or 2: {}",
                s
            ))),
        }
    }
}

impl Serialize for Exception {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_i32_as_str(
            serializer,
            match self {
                Exception::Added => 1,
                Exception::Deleted => 2,
            },
        )
    }
}
