mod aggregate;
mod config;
mod coverage;
mod frequency;
mod projection;
mod report;
mod service_days;
mod span;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use gtfs_model::{Feed, LocationType};
use log::info;
use rustc_hash::FxHashSet;
use std::path::PathBuf;
use std::time::Instant;

use aggregate::{
    add_coverage_facts, add_headway_facts, add_route_usage_facts, add_span_facts, EntityType,
    MetricsTable,
};
use config::Config;
use coverage::{coverage, present_modes, CoverageRegion, PopulationIndex, StopFilter};
use projection::LocalProjection;
use service_days::{DateRange, DayTypeIndex, ServiceDaySet};

/// Computes service-quality metrics from a static GTFS feed: spatial stop
/// coverage, service span per day type, and headways by time-of-day window.
#[derive(Parser, Debug)]
#[command(name = "gtfs-metrics", version)]
struct Args {
    /// Feed directory or zip archive
    feed: PathBuf,
    /// JSON configuration file; defaults apply when absent
    #[arg(long)]
    config: Option<PathBuf>,
    /// First date of the analysis range (default: the feed's own validity start)
    #[arg(long)]
    start_date: Option<NaiveDate>,
    /// Last date of the analysis range (default: the feed's own validity end)
    #[arg(long)]
    end_date: Option<NaiveDate>,
    /// Also compute a coverage region for each named route
    #[arg(long = "coverage-route")]
    coverage_route: Vec<String>,
    /// Directory the metrics and coverage files are written into
    #[arg(long, default_value = "metrics-out")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let started = Instant::now();
    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    info!("loading feed from {}", args.feed.display());
    let feed = Feed::from_path(&args.feed)?;

    let range = resolve_range(&args, &feed)?;
    info!("analysis range {} to {}", range.start, range.end);
    let day_set = ServiceDaySet::resolve(&feed, range);
    info!("{} services active in range", day_set.len());
    let day_index = DayTypeIndex::build(&day_set, &config.day_type_buckets);

    let projection = LocalProjection::for_feed(&feed)?;
    let population = config
        .population_source
        .as_deref()
        .map(|path| PopulationIndex::from_csv(path, &projection))
        .transpose()?;

    let mut table = MetricsTable::default();
    let regions = compute_coverage(
        &feed,
        &projection,
        &config,
        &args.coverage_route,
        population.as_ref(),
        &mut table,
    )?;
    compute_service_metrics(&feed, &day_index, &config, &mut table)?;
    info!("aggregated {} metric facts", table.len());

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("could not create {}", args.out_dir.display()))?;
    report::write_metrics(&table, &args.out_dir.join("metrics.json"))?;
    report::write_coverage(&regions, &projection, &args.out_dir.join("coverage.geojson"))?;

    info!("finished in {:.1}s", started.elapsed().as_secs_f32());
    Ok(())
}

fn resolve_range(args: &Args, feed: &Feed) -> Result<DateRange> {
    let envelope = DateRange::from_feed(feed);
    let start = args
        .start_date
        .or(envelope.map(|r| r.start))
        .context("the feed carries no dates; pass --start-date and --end-date")?;
    let end = args
        .end_date
        .or(envelope.map(|r| r.end))
        .context("the feed carries no dates; pass --start-date and --end-date")?;
    anyhow::ensure!(start <= end, "start date {} is after end date {}", start, end);
    Ok(DateRange { start, end })
}

/// One region per filter: the whole network, each present mode, and any
/// routes singled out on the command line.
fn compute_coverage(
    feed: &Feed,
    projection: &LocalProjection,
    config: &Config,
    route_filters: &[String],
    population: Option<&PopulationIndex>,
    table: &mut MetricsTable,
) -> Result<Vec<CoverageRegion>> {
    let mut filters = vec![StopFilter::All];
    filters.extend(present_modes(feed).into_iter().map(StopFilter::Mode));
    for route_id in route_filters {
        feed.get_route(route_id)?;
        filters.push(StopFilter::Route(route_id.clone()));
    }

    let mut regions = Vec::with_capacity(filters.len());
    for filter in &filters {
        let region = coverage(
            feed,
            projection,
            config.buffer_radius_meters,
            filter,
            population,
        )?;
        add_coverage_facts(table, &region)?;
        regions.push(region);
    }
    Ok(regions)
}

/// Span, headway and usage facts for every route and platform stop, per
/// configured day type.
fn compute_service_metrics(
    feed: &Feed,
    day_index: &DayTypeIndex,
    config: &Config,
    table: &mut MetricsTable,
) -> Result<()> {
    let none = FxHashSet::default();
    let route_ids: Vec<&str> = feed.routes.keys().map(String::as_str).collect();
    let stop_ids: Vec<&str> = feed
        .stops
        .values()
        .filter(|stop| stop.location_type == LocationType::StopPoint)
        .map(|stop| stop.id.as_str())
        .collect();

    for day_type in &config.day_type_buckets {
        let active = day_index.active_services(*day_type).unwrap_or(&none);

        let route_spans = span::route_spans(feed, active);
        add_span_facts(
            table,
            EntityType::Route,
            route_ids.iter().copied(),
            &route_spans,
            *day_type,
        )?;
        let stop_spans = span::stop_spans(feed, active);
        add_span_facts(
            table,
            EntityType::Stop,
            stop_ids.iter().copied(),
            &stop_spans,
            *day_type,
        )?;

        let route_departures = frequency::route_departures(feed, active);
        add_headway_facts(
            table,
            EntityType::Route,
            route_ids.iter().copied(),
            &route_departures,
            &config.frequency_windows,
            *day_type,
        )?;
        let stop_departures = frequency::stop_departures(feed, active);
        add_headway_facts(
            table,
            EntityType::Stop,
            stop_ids.iter().copied(),
            &stop_departures,
            &config.frequency_windows,
            *day_type,
        )?;

        add_route_usage_facts(table, feed, active, *day_type)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_days::DayType;
    use gtfs_model::{Calendar, RawFeed, RawStopTime, RawTrip, Route, Stop};
    use std::convert::TryFrom;

    fn weekday_feed() -> Feed {
        let stop = |id: &str, lng: f64| Stop {
            id: id.to_owned(),
            latitude: Some(48.79),
            longitude: Some(lng),
            ..Stop::default()
        };
        let trip = |id: &str| RawTrip {
            id: id.to_owned(),
            route_id: "r1".to_owned(),
            service_id: "wk".to_owned(),
            shape_id: None,
        };
        let stop_time = |trip: &str, stop: &str, seq: u32, at: u32| RawStopTime {
            trip_id: trip.to_owned(),
            stop_id: stop.to_owned(),
            stop_sequence: seq,
            arrival_time: Some(at),
            departure_time: Some(at),
        };
        Feed::try_from(RawFeed {
            calendar: Some(Ok(vec![Calendar {
                id: "wk".to_owned(),
                monday: true,
                tuesday: true,
                wednesday: true,
                thursday: true,
                friday: true,
                saturday: false,
                sunday: false,
                start_date: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 9, 13).unwrap(),
            }])),
            stops: Ok(vec![stop("a", 2.45), stop("b", 2.46)]),
            routes: Ok(vec![Route {
                id: "r1".to_owned(),
                ..Route::default()
            }]),
            trips: Ok(vec![trip("t1"), trip("t2"), trip("t3")]),
            stop_times: Ok(vec![
                stop_time("t1", "a", 1, 300),
                stop_time("t1", "b", 2, 600),
                stop_time("t2", "a", 1, 1200),
                stop_time("t2", "b", 2, 1500),
                stop_time("t3", "a", 1, 2100),
                stop_time("t3", "b", 2, 2400),
            ]),
            ..RawFeed::default()
        })
        .unwrap()
    }

    #[test]
    fn pipeline_produces_expected_headway_facts() {
        let feed = weekday_feed();
        let mut config = Config::default();
        config.frequency_windows = vec![config::TimeWindow::new("first_hour", 0, 3600)];
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 9, 13).unwrap(),
        };
        let day_set = ServiceDaySet::resolve(&feed, range);
        let day_index = DayTypeIndex::build(&day_set, &config.day_type_buckets);

        let mut table = MetricsTable::default();
        compute_service_metrics(&feed, &day_index, &config, &mut table).unwrap();

        use crate::aggregate::{FactKey, MetricValue};
        let key = |metric: &str| {
            FactKey::new(EntityType::Route, "r1", "weekday", "first_hour", metric)
        };
        assert_eq!(Some(MetricValue::Value(3.0)), table.get(&key("trip_count")));
        assert_eq!(
            Some(MetricValue::Value(1200.0)),
            table.get(&key("mean_headway"))
        );
        assert_eq!(Some(MetricValue::Value(1500.0)), table.get(&key("max_gap")));

        // no saturday service: span is unavailable, not zero
        let saturday_span = FactKey::new(
            EntityType::Route,
            "r1",
            "saturday",
            aggregate::WHOLE_RUN,
            "span_duration",
        );
        assert_eq!(
            Some(MetricValue::Unavailable),
            table.get(&saturday_span)
        );

        let usage = FactKey::new(
            EntityType::Route,
            "r1",
            "weekday",
            aggregate::WHOLE_RUN,
            "trips",
        );
        assert_eq!(Some(MetricValue::Value(3.0)), table.get(&usage));
    }

    #[test]
    fn pipeline_span_facts_use_offsets() {
        let feed = weekday_feed();
        let config = Config::default();
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 9, 13).unwrap(),
        };
        let day_set = ServiceDaySet::resolve(&feed, range);
        let day_index = DayTypeIndex::build(&day_set, &[DayType::Weekday]);

        let mut table = MetricsTable::default();
        let narrowed = Config {
            day_type_buckets: vec![DayType::Weekday],
            ..config
        };
        compute_service_metrics(&feed, &day_index, &narrowed, &mut table).unwrap();

        use crate::aggregate::{FactKey, MetricValue};
        let stop_b = FactKey::new(
            EntityType::Stop,
            "b",
            "weekday",
            aggregate::WHOLE_RUN,
            "span_duration",
        );
        assert_eq!(
            Some(MetricValue::Value((2400 - 600) as f64)),
            table.get(&stop_b)
        );
    }
}
