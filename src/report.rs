use crate::aggregate::MetricsTable;
use crate::coverage::CoverageRegion;
use crate::projection::LocalProjection;
use anyhow::{Context, Result};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes the fact table as a JSON array of flat records.
pub fn write_metrics(table: &MetricsTable, path: &Path) -> Result<()> {
    let records: Vec<_> = table.records().collect();
    let file =
        File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &records)
        .with_context(|| format!("could not write {}", path.display()))?;
    info!("wrote {} metric facts to {}", records.len(), path.display());
    Ok(())
}

/// Writes the coverage regions as a GeoJSON FeatureCollection, boundaries
/// reprojected back to geodetic coordinates for rendering.
pub fn write_coverage(
    regions: &[CoverageRegion],
    projection: &LocalProjection,
    path: &Path,
) -> Result<()> {
    let mut features = Vec::with_capacity(regions.len());
    for region in regions {
        let geodetic = inverse_geometry(&region.geometry, projection)?;
        let mut properties = JsonObject::new();
        properties.insert("label".to_owned(), JsonValue::from(region.label.clone()));
        properties.insert("radius_m".to_owned(), JsonValue::from(region.radius_m));
        properties.insert("stop_count".to_owned(), JsonValue::from(region.stop_count));
        properties.insert("area_m2".to_owned(), JsonValue::from(region.area_m2));
        if let Some(population) = &region.population {
            properties.insert(
                "population_covered".to_owned(),
                JsonValue::from(population.covered),
            );
            properties.insert(
                "population_total".to_owned(),
                JsonValue::from(population.total),
            );
            properties.insert(
                "population_pct".to_owned(),
                JsonValue::from(population.percent()),
            );
        }
        features.push(Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&geodetic))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let file =
        File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &collection)
        .with_context(|| format!("could not write {}", path.display()))?;
    info!("wrote {} coverage regions to {}", regions.len(), path.display());
    Ok(())
}

fn inverse_ring(ring: &LineString, projection: &LocalProjection) -> Result<LineString> {
    let mut coords = Vec::with_capacity(ring.0.len());
    for coord in &ring.0 {
        let (lng, lat) = projection.inverse(*coord)?;
        coords.push(Coord { x: lng, y: lat });
    }
    Ok(LineString::new(coords))
}

fn inverse_geometry(
    geometry: &MultiPolygon,
    projection: &LocalProjection,
) -> Result<MultiPolygon> {
    let mut polygons = Vec::with_capacity(geometry.0.len());
    for polygon in &geometry.0 {
        let exterior = inverse_ring(polygon.exterior(), projection)?;
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| inverse_ring(ring, projection))
            .collect::<Result<Vec<_>>>()?;
        polygons.push(Polygon::new(exterior, interiors));
    }
    Ok(MultiPolygon::new(polygons))
}
