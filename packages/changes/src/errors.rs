//! Error types for the change engine

use mapedit_geometry::GeometryError;
use mapedit_tags::ExpressionError;
use thiserror::Error;

/// Why an action could not produce its change descriptions.
///
/// All variants are fatal for the action: nothing is appended to the log.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Latitude or longitude is missing or not finite (lat: {lat:?}, lon: {lon:?})")]
    InvalidCoordinate { lat: Option<f64>, lon: Option<f64> },

    #[error("Tag '{key}' has pattern value '{pattern}'; only literal values can be written")]
    InvalidTagValue { key: String, pattern: String },

    #[error("Way {way} has {nodes} nodes but {coordinates} coordinates")]
    InvalidWay { way: i64, nodes: usize, coordinates: usize },

    #[error("Segment {segment} does not exist on way {way} with {vertices} vertices")]
    SegmentOutOfRange { way: i64, segment: usize, vertices: usize },

    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

#[derive(Error, Debug)]
pub enum ChangesError {
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Object graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reported by an [`crate::Uploader`] when a batch could not be written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Upload failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Change for {target} carries no usable geometry")]
    MissingGeometry { target: String },

    #[error("Way {way} has {nodes} nodes but {coordinates} coordinates")]
    MismatchedWay { way: String, nodes: usize, coordinates: usize },
}
