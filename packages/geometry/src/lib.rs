//! # Mapedit Geometry
//!
//! The two geometric primitives the change engine needs when a new point is
//! snapped onto an existing way:
//!
//! - `nearest_point_on_line(line, point)` → projected point + segment index
//! - `distance(a, b)` → meters
//!
//! The engine only depends on the [`Geometry`] trait. [`GeoOperations`] is the
//! spherical implementation used in production; [`PlanarGeometry`] treats
//! coordinates as plain meters, which keeps tests about distance thresholds
//! exact.
//!
//! Coordinates are always passed as [`Coordinate`] values. Storage formats
//! that keep `[lat, lon]` or `[lon, lat]` pairs convert explicitly with
//! [`Coordinate::from_lat_lon`] / [`Coordinate::from_lon_lat`].

mod coordinate;
mod error;
mod operations;

pub use coordinate::Coordinate;
pub use error::GeometryError;
pub use operations::{GeoOperations, Geometry, NearestPoint, PlanarGeometry, EARTH_RADIUS_METERS};
