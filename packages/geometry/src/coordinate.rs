use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// From a `[lat, lon]` pair (OSM object storage order)
    pub fn from_lat_lon(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }

    /// From a `[lon, lat]` pair (GeoJSON order)
    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self::new(pair[1], pair[0])
    }

    pub fn to_lat_lon(self) -> [f64; 2] {
        [self.lat, self.lon]
    }

    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}
