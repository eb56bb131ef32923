use crate::{Coordinate, GeometryError};

/// Mean earth radius used for great-circle distances
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Result of projecting a point onto a polyline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// The projected point, on the line
    pub point: Coordinate,

    /// Index of the segment start vertex; the segment ends at `segment_index + 1`
    pub segment_index: usize,

    /// Distance in meters between the input point and `point`
    pub distance: f64,
}

/// Geometry collaborator
pub trait Geometry: Send + Sync + std::fmt::Debug {
    /// Project `point` onto `line`. Ties go to the earliest segment.
    ///
    /// `segment_index` must satisfy `segment_index + 1 < line.len()`.
    fn nearest_point_on_line(&self, line: &[Coordinate], point: Coordinate) -> Result<NearestPoint, GeometryError>;

    /// Distance in meters. Symmetric.
    fn distance(&self, a: Coordinate, b: Coordinate) -> f64;
}

/// Spherical geometry: haversine distances, projection in a local
/// equirectangular frame per segment.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoOperations;

impl Geometry for GeoOperations {
    fn nearest_point_on_line(&self, line: &[Coordinate], point: Coordinate) -> Result<NearestPoint, GeometryError> {
        nearest_by(line, point, |a, b| ((a.lat + b.lat) / 2.0).to_radians().cos(), |a, b| {
            self.distance(a, b)
        })
    }

    fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        let d_lat = (b.lat - a.lat).to_radians();
        let d_lon = (b.lon - a.lon).to_radians();
        let h = (d_lat / 2.0).sin().powi(2)
            + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
    }
}

/// Flat geometry where one degree is one meter.
///
/// Used in tests that need exact distances.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanarGeometry;

impl Geometry for PlanarGeometry {
    fn nearest_point_on_line(&self, line: &[Coordinate], point: Coordinate) -> Result<NearestPoint, GeometryError> {
        nearest_by(line, point, |_, _| 1.0, |a, b| self.distance(a, b))
    }

    fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        (b.lat - a.lat).hypot(b.lon - a.lon)
    }
}

fn nearest_by(
    line: &[Coordinate],
    point: Coordinate,
    lon_scale: impl Fn(Coordinate, Coordinate) -> f64,
    distance: impl Fn(Coordinate, Coordinate) -> f64,
) -> Result<NearestPoint, GeometryError> {
    if line.len() < 2 {
        return Err(GeometryError::DegenerateLine { points: line.len() });
    }
    if let Some(bad) = line.iter().chain(std::iter::once(&point)).find(|c| !c.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate {
            lat: bad.lat,
            lon: bad.lon,
        });
    }

    let mut best: Option<NearestPoint> = None;

    for (segment_index, pair) in line.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let kx = lon_scale(a, b);

        let (dx, dy) = ((b.lon - a.lon) * kx, b.lat - a.lat);
        let (px, py) = ((point.lon - a.lon) * kx, point.lat - a.lat);
        let length_sq = dx * dx + dy * dy;

        let t = if length_sq == 0.0 {
            0.0
        } else {
            ((px * dx + py * dy) / length_sq).clamp(0.0, 1.0)
        };

        let projected = Coordinate::new(a.lat + t * (b.lat - a.lat), a.lon + t * (b.lon - a.lon));
        let d = distance(point, projected);

        if best.map_or(true, |current| d < current.distance) {
            best = Some(NearestPoint {
                point: projected,
                segment_index,
                distance: d,
            });
        }
    }

    // windows(2) yields at least one segment for two or more points
    best.ok_or(GeometryError::DegenerateLine { points: line.len() })
}
