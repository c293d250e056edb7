use chrono::NaiveDate;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::Serializer;

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s: &str = Deserialize::deserialize(deserializer)?;
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(serde::de::Error::custom)
}

pub fn serialize_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format("%Y%m%d").to_string())
}

/// Parses GTFS clock text into seconds since the service day's nominal
/// midnight. Hours are not bounded at 24: "25:30:00" is 91800 seconds and
/// describes service past midnight on the same service day.
pub fn parse_clock_time(s: &str) -> Result<u32, crate::Error> {
    let bad = || crate::Error::InvalidTime(s.to_owned());
    let len = s.len();

    // shortest valid form is H:MM:SS
    if len < 7 || !s.is_ascii() {
        return Err(bad());
    }
    if &s[len - 3..len - 2] != ":" || &s[len - 6..len - 5] != ":" {
        return Err(bad());
    }
    let hours: u32 = s[..len - 6].parse().map_err(|_| bad())?;
    let minutes: u32 = s[len - 5..len - 3].parse().map_err(|_| bad())?;
    let seconds: u32 = s[len - 2..].parse().map_err(|_| bad())?;
    if minutes > 59 || seconds > 59 {
        return Err(bad());
    }
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Renders a seconds offset back to GTFS clock text, keeping hours ≥ 24.
pub fn format_clock_time(time: u32) -> String {
    format!("{:02}:{:02}:{:02}", time / 3600, time % 3600 / 60, time % 60)
}

pub fn deserialize_time<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let s: &str = Deserialize::deserialize(deserializer)?;
    parse_clock_time(s).map_err(de::Error::custom)
}

pub fn serialize_time<S>(time: &u32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_clock_time(*time))
}

pub fn deserialize_optional_time<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<&str> = Deserialize::deserialize(deserializer)?;

    match s {
        None | Some("") => Ok(None),
        Some(t) => parse_clock_time(t).map(Some).map_err(de::Error::custom),
    }
}

pub fn serialize_optional_time<S>(time: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match time {
        None => serializer.serialize_none(),
        Some(t) => serialize_time(t, serializer),
    }
}

pub fn de_with_optional_float<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(de).and_then(|s| {
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse().map(Some).map_err(de::Error::custom)
        }
    })
}

pub fn de_with_empty_default<'de, T: Default, D>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(|opt| opt.unwrap_or_default())
}

pub fn deserialize_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s: &str = Deserialize::deserialize(deserializer)?;
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        &_ => Err(serde::de::Error::custom(format!(
            "Invalid value `{}`, expected 0 or 1",
            s
        ))),
    }
}

pub fn serialize_bool<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(u8::from(*value))
}
