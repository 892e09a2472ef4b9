//! Shared tunables for the mission planner: marker geometry per asset type,
//! scene dimensions, render sizes and network defaults.

pub mod mission;
pub mod network;
pub mod render_settings;
pub mod scene;
