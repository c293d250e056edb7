use crate::config::TimeWindow;
use crate::coverage::CoverageRegion;
use crate::frequency::{window_stats, WindowStats};
use crate::service_days::DayType;
use crate::span::SpanSummary;
use gtfs_model::Feed;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::ser::Serializer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A computed metric value. A bucket with no data is Unavailable, which is a
/// value in its own right and serializes as null: coercing it to zero would
/// make "no service" indistinguishable from "instant service".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Value(f64),
    Unavailable,
}

impl MetricValue {
    pub fn from_option(value: Option<f64>) -> MetricValue {
        match value {
            Some(v) => MetricValue::Value(v),
            None => MetricValue::Unavailable,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> MetricValue {
        MetricValue::Value(value)
    }
}

impl Serialize for MetricValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MetricValue::Value(v) => serializer.serialize_f64(*v),
            MetricValue::Unavailable => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{}", v),
            MetricValue::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// What kind of entity a fact describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityType {
    Network,
    Route,
    Stop,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Network => "network",
            EntityType::Route => "route",
            EntityType::Stop => "stop",
        }
    }
}

/// Full key of one metric fact. The derived ordering (entity type, entity
/// id, day type, window, metric name) is the deterministic order of the
/// output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FactKey {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub day_type: String,
    pub window: String,
    pub metric: String,
}

impl FactKey {
    pub fn new(
        entity_type: EntityType,
        entity_id: &str,
        day_type: &str,
        window: &str,
        metric: &str,
    ) -> FactKey {
        FactKey {
            entity_type,
            entity_id: entity_id.to_owned(),
            day_type: day_type.to_owned(),
            window: window.to_owned(),
            metric: metric.to_owned(),
        }
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.entity_type.as_str(),
            self.entity_id,
            self.day_type,
            self.window,
            self.metric
        )
    }
}

/// Two computations claiming the same key with different values. This is an
/// upstream bug, never a property of the feed; the run aborts rather than
/// pick a side.
#[derive(Debug, Error)]
#[error("conflicting values for {key}: {existing} then {candidate}")]
pub struct AggregationConflict {
    pub key: String,
    pub existing: MetricValue,
    pub candidate: MetricValue,
}

/// One output record, shaped for downstream consumers.
#[derive(Debug, Serialize)]
pub struct FactRecord<'a> {
    pub entity_type: &'static str,
    pub entity_id: &'a str,
    pub day_type: &'a str,
    pub window_label: &'a str,
    pub metric_name: &'a str,
    pub value: MetricValue,
}

/// The normalized fact table every engine writes into.
#[derive(Debug, Default)]
pub struct MetricsTable {
    facts: BTreeMap<FactKey, MetricValue>,
}

impl MetricsTable {
    pub fn insert(&mut self, key: FactKey, value: MetricValue) -> Result<(), AggregationConflict> {
        if let Some(existing) = self.facts.get(&key) {
            if *existing != value {
                return Err(AggregationConflict {
                    key: key.to_string(),
                    existing: *existing,
                    candidate: value,
                });
            }
        }
        self.facts.insert(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    #[cfg(test)]
    pub fn get(&self, key: &FactKey) -> Option<MetricValue> {
        self.facts.get(key).copied()
    }

    /// Records in deterministic key order.
    pub fn records(&self) -> impl Iterator<Item = FactRecord<'_>> + '_ {
        self.facts.iter().map(|(key, value)| FactRecord {
            entity_type: key.entity_type.as_str(),
            entity_id: &key.entity_id,
            day_type: &key.day_type,
            window_label: &key.window,
            metric_name: &key.metric,
            value: *value,
        })
    }
}

/// Day-type and window label used by facts that are not bucketed.
pub const WHOLE_RUN: &str = "all";

/// Facts of one coverage region.
pub fn add_coverage_facts(
    table: &mut MetricsTable,
    region: &CoverageRegion,
) -> Result<(), AggregationConflict> {
    let key = |metric: &str| {
        FactKey::new(
            EntityType::Network,
            &region.label,
            WHOLE_RUN,
            WHOLE_RUN,
            metric,
        )
    };
    table.insert(key("coverage_area_m2"), region.area_m2.into())?;
    table.insert(key("stops_buffered"), (region.stop_count as f64).into())?;
    if let Some(population) = &region.population {
        table.insert(key("population_covered"), population.covered.into())?;
        table.insert(key("population_total"), population.total.into())?;
        table.insert(key("population_pct"), population.percent().into())?;
    }
    Ok(())
}

/// Span facts for every entity in `entity_ids`; entities missing from
/// `spans` had no active trip and get Unavailable across the board.
pub fn add_span_facts<'a>(
    table: &mut MetricsTable,
    entity_type: EntityType,
    entity_ids: impl Iterator<Item = &'a str>,
    spans: &FxHashMap<String, SpanSummary>,
    day_type: DayType,
) -> Result<(), AggregationConflict> {
    let day = day_type.to_string();
    for id in entity_ids {
        let span = spans.get(id);
        let key = |metric: &str| FactKey::new(entity_type, id, &day, WHOLE_RUN, metric);
        table.insert(
            key("first_departure"),
            MetricValue::from_option(span.map(|s| s.first_departure as f64)),
        )?;
        table.insert(
            key("last_arrival"),
            MetricValue::from_option(span.map(|s| s.last_arrival as f64)),
        )?;
        table.insert(
            key("span_duration"),
            MetricValue::from_option(span.map(|s| s.duration() as f64)),
        )?;
    }
    Ok(())
}

/// Headway facts for every entity and window. Entities with no departure
/// stream still get their windows reported: zero trips is an observation.
pub fn add_headway_facts<'a>(
    table: &mut MetricsTable,
    entity_type: EntityType,
    entity_ids: impl Iterator<Item = &'a str>,
    departures: &FxHashMap<String, Vec<u32>>,
    windows: &[TimeWindow],
    day_type: DayType,
) -> Result<(), AggregationConflict> {
    let day = day_type.to_string();
    let empty = Vec::new();
    for id in entity_ids {
        let stream = departures.get(id).unwrap_or(&empty);
        for window in windows {
            let stats: WindowStats = window_stats(stream, window);
            let key = |metric: &str| FactKey::new(entity_type, id, &day, &window.label, metric);
            table.insert(key("trip_count"), (stats.trip_count as f64).into())?;
            table.insert(
                key("mean_headway"),
                MetricValue::from_option(stats.mean_headway),
            )?;
            table.insert(key("max_gap"), stats.max_gap.into())?;
        }
    }
    Ok(())
}

/// Per-route usage counters: active trips and distinct stops served.
pub fn add_route_usage_facts(
    table: &mut MetricsTable,
    feed: &Feed,
    active: &FxHashSet<String>,
    day_type: DayType,
) -> Result<(), AggregationConflict> {
    let mut trip_counts: FxHashMap<&str, f64> = FxHashMap::default();
    let mut stops_served: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();
    for trip in feed.trips.values() {
        if !active.contains(&trip.service_id) {
            continue;
        }
        *trip_counts.entry(trip.route_id.as_str()).or_default() += 1.0;
        let served = stops_served.entry(trip.route_id.as_str()).or_default();
        for stop_time in &trip.stop_times {
            served.insert(stop_time.stop_id.as_str());
        }
    }
    let day = day_type.to_string();
    for route_id in feed.routes.keys() {
        let key = |metric: &str| {
            FactKey::new(EntityType::Route, route_id, &day, WHOLE_RUN, metric)
        };
        table.insert(
            key("trips"),
            trip_counts.get(route_id.as_str()).copied().unwrap_or(0.0).into(),
        )?;
        table.insert(
            key("stops_served"),
            stops_served
                .get(route_id.as_str())
                .map_or(0.0, |s| s.len() as f64)
                .into(),
        )?;
    }
    Ok(())
}
