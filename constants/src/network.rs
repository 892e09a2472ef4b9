pub const DEFAULT_SERVER_ORIGIN: &str = "http://localhost:5000";
pub const UPLOAD_PATH: &str = "/upload";
pub const SAVE_MISSION_PATH: &str = "/save-mission";

/// Multipart field name expected by the upload endpoint.
pub const UPLOAD_FIELD: &str = "file";

pub const MESH_EXTENSIONS: &[&str] = &["obj"];
pub const RASTER_EXTENSIONS: &[&str] = &["tif", "tiff"];

pub const MAX_TILE_ZOOM: u8 = 19;

pub const DEFAULT_MISSION_PRESET: &str = "missions/default.mission.json";

/// Seconds before an error banner dismisses itself.
pub const ERROR_BANNER_SECONDS: f32 = 6.0;

/// Seconds between `fps_update` notifications to the host page.
pub const FPS_NOTIFY_SECONDS: f32 = 0.5;
