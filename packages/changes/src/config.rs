use crate::errors::ChangesError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "mapedit.config.json";

/// Change engine configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesConfig {
    /// First placeholder id handed out in a session
    #[serde(default = "default_first_placeholder_id")]
    pub first_placeholder_id: i64,

    /// Snapped points closer than this to an existing vertex reuse the vertex
    #[serde(default = "default_reuse_point_within_meters")]
    pub reuse_point_within_meters: f64,

    /// Theme recorded in change metadata when an action names none
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_first_placeholder_id() -> i64 {
    -1
}

fn default_reuse_point_within_meters() -> f64 {
    1.0
}

fn default_theme() -> String {
    "unknown".to_string()
}

impl ChangesConfig {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ChangesError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ChangesError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for ChangesConfig {
    fn default() -> Self {
        Self {
            first_placeholder_id: default_first_placeholder_id(),
            reuse_point_within_meters: default_reuse_point_within_meters(),
            theme: default_theme(),
        }
    }
}
