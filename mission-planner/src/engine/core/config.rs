use bevy::prelude::*;
use constants::network::{DEFAULT_MISSION_PRESET, DEFAULT_SERVER_ORIGIN};

/// Runtime settings. Values can be overridden through environment variables.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Origin of the upload and save-mission endpoints.
    pub server_origin: String,
    /// Asset path of the mission preset that seeds the counts.
    pub preset_path: Option<String>,
    /// Tile URL template for the optional base map.
    pub base_map_template: Option<String>,
    pub base_map_lat: f64,
    pub base_map_lon: f64,
    pub base_map_zoom: u8,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Empty values count as unset.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PlannerConfig {
    pub fn from_env() -> Self {
        let preset_path = match std::env::var("MISSION_PLANNER_PRESET") {
            // An explicitly empty value disables the preset.
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value.trim().to_string()),
            Err(_) => Some(DEFAULT_MISSION_PRESET.to_string()),
        };

        Self {
            server_origin: env_string("MISSION_PLANNER_SERVER")
                .unwrap_or_else(|| DEFAULT_SERVER_ORIGIN.to_string()),
            preset_path,
            base_map_template: env_string("MISSION_PLANNER_BASE_MAP"),
            base_map_lat: env_parse("MISSION_PLANNER_BASE_MAP_LAT").unwrap_or(0.0),
            base_map_lon: env_parse("MISSION_PLANNER_BASE_MAP_LON").unwrap_or(0.0),
            base_map_zoom: env_parse("MISSION_PLANNER_BASE_MAP_ZOOM").unwrap_or(15),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        // The browser has no process environment.
        #[cfg(target_arch = "wasm32")]
        {
            Self {
                server_origin: DEFAULT_SERVER_ORIGIN.to_string(),
                preset_path: Some(DEFAULT_MISSION_PRESET.to_string()),
                base_map_template: None,
                base_map_lat: 0.0,
                base_map_lon: 0.0,
                base_map_zoom: 15,
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::from_env()
        }
    }
}
