use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Line needs at least 2 points, got {points}")]
    DegenerateLine { points: usize },

    #[error("Coordinate is not finite: {lat},{lon}")]
    NonFiniteCoordinate { lat: f64, lon: f64 },
}
