use crate::service_days::DayType;
use anyhow::{bail, Context, Result};
use gtfs_model::{format_clock_time, parse_clock_time};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A half-open time-of-day window [start, end) in the same offset space as
/// the stop times. A window that represents the small hours of the next
/// wall-clock day within the same service day carries an end above 24:00:00.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeWindow {
    pub label: String,
    #[serde(deserialize_with = "deserialize_clock")]
    pub start: u32,
    #[serde(deserialize_with = "deserialize_clock")]
    pub end: u32,
}

impl TimeWindow {
    pub fn new(label: &str, start: u32, end: u32) -> TimeWindow {
        TimeWindow {
            label: label.to_owned(),
            start,
            end,
        }
    }

    pub fn span(&self) -> u32 {
        self.end - self.start
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}

fn deserialize_clock<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_clock_time(&s).map_err(de::Error::custom)
}

/// Run configuration, read from a JSON file; every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Access radius around a stop, in meters
    pub buffer_radius_meters: f64,
    /// Which day-type buckets take part in the aggregation
    pub day_type_buckets: Vec<DayType>,
    /// Ordered, non-overlapping time-of-day windows for the headway metrics
    pub frequency_windows: Vec<TimeWindow>,
    /// Optional CSV point set (lat, lon, population) for weighted coverage
    pub population_source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            buffer_radius_meters: 400.0,
            day_type_buckets: vec![DayType::Weekday, DayType::Saturday, DayType::Sunday],
            frequency_windows: vec![
                TimeWindow::new("early", 4 * 3600, 6 * 3600),
                TimeWindow::new("am_peak", 6 * 3600, 9 * 3600),
                TimeWindow::new("midday", 9 * 3600, 15 * 3600 + 1800),
                TimeWindow::new("pm_peak", 15 * 3600 + 1800, 18 * 3600 + 1800),
                TimeWindow::new("evening", 18 * 3600 + 1800, 22 * 3600),
                // runs past midnight within the same service day
                TimeWindow::new("night", 22 * 3600, 28 * 3600),
            ],
            population_source: None,
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Config> {
        let file = File::open(path)
            .with_context(|| format!("could not open configuration {}", path.display()))?;
        let config: Config = serde_json::from_reader(file)
            .with_context(|| format!("could not parse configuration {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.day_type_buckets.is_empty() {
            bail!("day_type_buckets must name at least one bucket");
        }
        for window in &self.frequency_windows {
            if window.start >= window.end {
                bail!(
                    "window {} is empty: {} is not before {}",
                    window.label,
                    format_clock_time(window.start),
                    format_clock_time(window.end)
                );
            }
        }
        for pair in self.frequency_windows.windows(2) {
            if pair[1].start < pair[0].end {
                bail!(
                    "windows {} and {} overlap",
                    pair[0].label,
                    pair[1].label
                );
            }
        }
        Ok(())
    }
}
