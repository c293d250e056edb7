use anyhow::{ensure, Context, Result};
use geo_types::Coord;
use gtfs_model::Feed;
use proj::Proj;

/// Planar projection local to the feed being processed.
///
/// Buffer radii are meters, so the geometry must live in a metric plane:
/// buffering in degrees is wrong and never done here. A Mercator plane
/// centered on the feed, with `lat_ts` pinning the scale to truth at the
/// feed's own latitude, keeps distortion negligible over a single region.
pub struct LocalProjection {
    proj: Proj,
}

impl LocalProjection {
    pub fn new(lng_0: f64, lat_0: f64) -> Result<LocalProjection> {
        let definition = format!("+proj=merc +lon_0={lng_0} +lat_0={lat_0} +lat_ts={lat_0}");
        let proj = Proj::new(&definition)
            .with_context(|| format!("could not create projection {definition}"))?;
        Ok(LocalProjection { proj })
    }

    /// Centers the plane on the mean coordinate of the feed's located stops.
    pub fn for_feed(feed: &Feed) -> Result<LocalProjection> {
        let mut count = 0usize;
        let (mut lng_sum, mut lat_sum) = (0.0, 0.0);
        for stop in feed.stops.values() {
            if let (Some(lng), Some(lat)) = (stop.longitude, stop.latitude) {
                lng_sum += lng;
                lat_sum += lat;
                count += 1;
            }
        }
        ensure!(count > 0, "the feed has no located stops to project");
        LocalProjection::new(lng_sum / count as f64, lat_sum / count as f64)
    }

    pub fn project(&self, lng: f64, lat: f64) -> Result<Coord> {
        let (x, y) = self
            .proj
            .project((lng.to_radians(), lat.to_radians()), false)?;
        Ok(Coord { x, y })
    }

    /// Back from the plane to (lng, lat) degrees.
    pub fn inverse(&self, coord: Coord) -> Result<(f64, f64)> {
        let (lng, lat) = self.proj.project((coord.x, coord.y), true)?;
        Ok((lng.to_degrees(), lat.to_degrees()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_plane() {
        let projection = LocalProjection::new(-70.65, -33.45).unwrap();
        let projected = projection.project(-70.6, -33.4).unwrap();
        let (lng, lat) = projection.inverse(projected).unwrap();
        assert!((lng - -70.6).abs() < 1e-9);
        assert!((lat - -33.4).abs() < 1e-9);
    }

    #[test]
    fn local_distances_are_near_true_meters() {
        let projection = LocalProjection::new(-70.65, -33.45).unwrap();
        // one degree of longitude at 33.45°S is about 92.9 km on the ellipsoid
        let a = projection.project(-70.65, -33.45).unwrap();
        let b = projection.project(-69.65, -33.45).unwrap();
        let d = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        let expected = 111_319.49 * (-33.45f64).to_radians().cos().abs();
        assert!((d - expected).abs() / expected < 0.01, "distance {d}");
    }
}
