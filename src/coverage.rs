use crate::projection::LocalProjection;
use anyhow::{Context, Result};
use geo::{Area, BooleanOps, BoundingRect, Contains};
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};
use gtfs_model::{Feed, LocationType, RouteMode};
use log::debug;
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Vertices per stop buffer. A 64-gon underestimates the disk area by
/// about 0.16%, well under the distortion of the projection itself.
const BUFFER_SEGMENTS: usize = 64;

/// Selects which stops contribute to a coverage region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopFilter {
    /// Every stop with a platform role
    All,
    /// Stops served by at least one route of the mode
    Mode(RouteMode),
    /// Stops on the trips of one route
    Route(String),
}

impl StopFilter {
    pub fn label(&self) -> String {
        match self {
            StopFilter::All => "all".to_owned(),
            StopFilter::Mode(mode) => mode.to_string(),
            StopFilter::Route(id) => format!("route:{}", id),
        }
    }
}

/// Share of a weighted point set that falls inside a region.
#[derive(Debug, Clone, Copy)]
pub struct PopulationCoverage {
    pub covered: f64,
    pub total: f64,
}

impl PopulationCoverage {
    pub fn percent(&self) -> f64 {
        if self.total > 0.0 {
            self.covered / self.total * 100.0
        } else {
            0.0
        }
    }
}

/// The unioned service area of a set of stops: every point within
/// `radius_m` of one of them, as one geometry in the projected plane.
pub struct CoverageRegion {
    pub label: String,
    pub radius_m: f64,
    /// How many located stops contributed a buffer
    pub stop_count: usize,
    pub geometry: MultiPolygon,
    pub area_m2: f64,
    pub population: Option<PopulationCoverage>,
}

/// Buffers every stop matched by `filter` and unions the buffers. Overlap
/// between nearby stops is counted once, which is the point of unioning
/// instead of summing. No matching stop is a valid outcome: the region is
/// empty with area zero.
pub fn coverage(
    feed: &Feed,
    projection: &LocalProjection,
    radius_m: f64,
    filter: &StopFilter,
    population: Option<&PopulationIndex>,
) -> Result<CoverageRegion> {
    let mut disks = Vec::new();
    for stop_id in matching_stops(feed, filter) {
        let stop = &feed.stops[stop_id];
        let (Some(lng), Some(lat)) = (stop.longitude, stop.latitude) else {
            continue;
        };
        let center = projection.project(lng, lat)?;
        disks.push(disk(center, radius_m));
    }
    let stop_count = disks.len();
    let geometry = union_all(disks);
    let area_m2 = geometry.unsigned_area();
    let population = population.map(|index| index.coverage(&geometry));
    debug!(
        "coverage[{}] r={}m: {} stops, {:.0} m2",
        filter.label(),
        radius_m,
        stop_count,
        area_m2
    );

    Ok(CoverageRegion {
        label: filter.label(),
        radius_m,
        stop_count,
        geometry,
        area_m2,
        population,
    })
}

/// Modes that actually appear on the feed's routes, deduplicated by label.
pub fn present_modes(feed: &Feed) -> Vec<RouteMode> {
    let mut seen = BTreeSet::new();
    let mut modes = Vec::new();
    for route in feed.routes.values() {
        if seen.insert(route.mode.to_string()) {
            modes.push(route.mode);
        }
    }
    modes.sort_by_key(|m| m.to_string());
    modes
}

fn matching_stops<'a>(feed: &'a Feed, filter: &StopFilter) -> BTreeSet<&'a str> {
    let mut ids = BTreeSet::new();
    match filter {
        StopFilter::All => {
            for stop in feed.stops.values() {
                if stop.location_type == LocationType::StopPoint {
                    ids.insert(stop.id.as_str());
                }
            }
        }
        StopFilter::Mode(mode) => {
            for trip in feed.trips.values() {
                if feed.routes[&trip.route_id].mode != *mode {
                    continue;
                }
                for stop_time in &trip.stop_times {
                    ids.insert(stop_time.stop_id.as_str());
                }
            }
        }
        StopFilter::Route(route_id) => {
            for trip in feed.trips.values() {
                if trip.route_id != *route_id {
                    continue;
                }
                for stop_time in &trip.stop_times {
                    ids.insert(stop_time.stop_id.as_str());
                }
            }
        }
    }
    ids
}

fn disk(center: Coord, radius: f64) -> Polygon {
    let mut ring = Vec::with_capacity(BUFFER_SEGMENTS + 1);
    for i in 0..BUFFER_SEGMENTS {
        let angle = std::f64::consts::TAU * i as f64 / BUFFER_SEGMENTS as f64;
        ring.push(Coord {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        });
    }
    let first = ring[0];
    ring.push(first);
    Polygon::new(LineString::new(ring), vec![])
}

/// Balanced pairwise union; merging neighbours level by level keeps the
/// intermediate polygons small instead of accreting onto one giant region.
fn union_all(disks: Vec<Polygon>) -> MultiPolygon {
    let mut layer: Vec<MultiPolygon> = disks
        .into_iter()
        .map(|disk| MultiPolygon::new(vec![disk]))
        .collect();
    if layer.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => unreachable!(),
            })
            .collect();
    }
    layer.swap_remove(0)
}

#[derive(Debug, Deserialize)]
struct PopulationRow {
    lat: f64,
    lon: f64,
    population: f64,
}

/// Weighted points in the projected plane, indexed for envelope queries.
pub struct PopulationIndex {
    tree: RTree<GeomWithData<[f64; 2], f64>>,
    total: f64,
}

impl PopulationIndex {
    pub fn from_csv(path: &Path, projection: &LocalProjection) -> Result<PopulationIndex> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("could not open population source {}", path.display()))?;
        let mut points = Vec::new();
        let mut total = 0.0;
        for row in reader.deserialize() {
            let row: PopulationRow = row
                .with_context(|| format!("could not parse population source {}", path.display()))?;
            let projected = projection.project(row.lon, row.lat)?;
            total += row.population;
            points.push(GeomWithData::new([projected.x, projected.y], row.population));
        }
        Ok(PopulationIndex {
            tree: RTree::bulk_load(points),
            total,
        })
    }

    fn coverage(&self, region: &MultiPolygon) -> PopulationCoverage {
        let Some(rect) = region.bounding_rect() else {
            return PopulationCoverage {
                covered: 0.0,
                total: self.total,
            };
        };
        let envelope = AABB::from_corners(
            [rect.min().x, rect.min().y],
            [rect.max().x, rect.max().y],
        );
        let covered = self
            .tree
            .locate_in_envelope(&envelope)
            .filter(|point| region.contains(&Point::new(point.geom()[0], point.geom()[1])))
            .map(|point| point.data)
            .sum();
        PopulationCoverage {
            covered,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_model::{Calendar, RawFeed, RawStopTime, RawTrip, Route, Stop};
    use std::convert::TryFrom;

    const LNG: f64 = 2.45;
    const LAT: f64 = 48.79;

    fn stop(id: &str, lng: f64, lat: f64) -> Stop {
        Stop {
            id: id.to_owned(),
            longitude: Some(lng),
            latitude: Some(lat),
            ..Stop::default()
        }
    }

    fn service(id: &str) -> Calendar {
        Calendar {
            id: id.to_owned(),
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: true,
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2024, 9, 27).unwrap(),
        }
    }

    fn one_stop_feed() -> Feed {
        Feed::try_from(RawFeed {
            calendar: Some(Ok(vec![service("s")])),
            stops: Ok(vec![stop("a", LNG, LAT)]),
            ..RawFeed::default()
        })
        .unwrap()
    }

    fn projection() -> LocalProjection {
        LocalProjection::new(LNG, LAT).unwrap()
    }

    #[test]
    fn single_stop_region_area_is_roughly_a_disk() {
        let feed = one_stop_feed();
        let region = coverage(&feed, &projection(), 400.0, &StopFilter::All, None).unwrap();
        assert_eq!(1, region.stop_count);
        let expected = std::f64::consts::PI * 400.0 * 400.0;
        let relative = (region.area_m2 - expected).abs() / expected;
        assert!(relative < 0.02, "area {} off by {}", region.area_m2, relative);
    }

    #[test]
    fn area_is_monotone_in_radius() {
        let feed = one_stop_feed();
        let projection = projection();
        let mut previous = 0.0;
        for radius in [100.0, 200.0, 400.0, 800.0] {
            let region = coverage(&feed, &projection, radius, &StopFilter::All, None).unwrap();
            assert!(region.area_m2 > previous);
            previous = region.area_m2;
        }
    }

    #[test]
    fn no_matching_stop_is_an_empty_region_not_an_error() {
        let feed = one_stop_feed();
        let region = coverage(
            &feed,
            &projection(),
            400.0,
            &StopFilter::Route("nope".to_owned()),
            None,
        )
        .unwrap();
        assert_eq!(0, region.stop_count);
        assert_eq!(0.0, region.area_m2);
        assert!(region.geometry.0.is_empty());
    }

    #[test]
    fn overlapping_buffers_do_not_double_count() {
        // two stops 100m apart with 400m buffers: far less than two disks
        let feed = Feed::try_from(RawFeed {
            calendar: Some(Ok(vec![service("s")])),
            stops: Ok(vec![
                stop("a", LNG, LAT),
                stop("b", LNG + 100.0 / 73_000.0, LAT),
            ]),
            ..RawFeed::default()
        })
        .unwrap();
        let region = coverage(&feed, &projection(), 400.0, &StopFilter::All, None).unwrap();
        let disk = std::f64::consts::PI * 400.0 * 400.0;
        assert!(region.area_m2 < 1.3 * disk);
        assert!(region.area_m2 > disk);
    }

    #[test]
    fn union_is_order_invariant() {
        let projection = projection();
        let centers: Vec<Coord> = (0..5)
            .map(|i| {
                projection
                    .project(LNG + i as f64 * 300.0 / 73_000.0, LAT)
                    .unwrap()
            })
            .collect();
        let forward: Vec<Polygon> = centers.iter().map(|c| disk(*c, 400.0)).collect();
        let reversed: Vec<Polygon> = centers.iter().rev().map(|c| disk(*c, 400.0)).collect();
        let a = union_all(forward).unsigned_area();
        let b = union_all(reversed).unsigned_area();
        assert!((a - b).abs() / a < 1e-9);
    }

    #[test]
    fn mode_filter_selects_served_stops() {
        let feed = Feed::try_from(RawFeed {
            calendar: Some(Ok(vec![service("s")])),
            stops: Ok(vec![stop("a", LNG, LAT), stop("b", LNG + 0.01, LAT)]),
            routes: Ok(vec![
                Route {
                    id: "bus".to_owned(),
                    mode: RouteMode::Bus,
                    ..Route::default()
                },
                Route {
                    id: "metro".to_owned(),
                    mode: RouteMode::Subway,
                    ..Route::default()
                },
            ]),
            trips: Ok(vec![RawTrip {
                id: "t".to_owned(),
                route_id: "bus".to_owned(),
                service_id: "s".to_owned(),
                shape_id: None,
            }]),
            stop_times: Ok(vec![RawStopTime {
                trip_id: "t".to_owned(),
                stop_id: "a".to_owned(),
                arrival_time: Some(3600),
                departure_time: Some(3600),
                stop_sequence: 1,
            }]),
            ..RawFeed::default()
        })
        .unwrap();

        let bus = matching_stops(&feed, &StopFilter::Mode(RouteMode::Bus));
        assert_eq!(1, bus.len());
        assert!(bus.contains("a"));
        assert!(matching_stops(&feed, &StopFilter::Mode(RouteMode::Subway)).is_empty());
        assert_eq!(2, matching_stops(&feed, &StopFilter::All).len());
    }
}
