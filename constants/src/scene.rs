use bevy::math::Vec3;

/// Side length of the invisible fallback ground plane at y = 0.
pub const GROUND_PLANE_SIZE: f32 = 100.0;

/// Reference grid drawn on the ground plane.
pub const GRID_SIZE: f32 = 10.0;
pub const GRID_DIVISIONS: u32 = 10;

pub const CAMERA_START: Vec3 = Vec3::new(0.0, 5.0, 10.0);
pub const CAMERA_FOV_DEGREES: f32 = 50.0;

/// Imported meshes are re-centred and uniformly scaled by this factor.
pub const MESH_TERRAIN_SCALE: f32 = 0.5;

/// World-space width and depth of a raster terrain.
pub const RASTER_EXTENT: f32 = 10.0;
/// World-space height of full-white raster samples.
pub const RASTER_RELIEF: f32 = 1.0;
/// Rasters are decimated to at most this many samples per side.
pub const RASTER_MAX_RESOLUTION: u32 = 256;

/// Pointer readout multiplies world units by this to display metres.
pub const COORDINATE_DISPLAY_SCALE: f32 = 100.0;

// Orbit controls
pub const ORBIT_SENSITIVITY: f32 = 0.005;
pub const PAN_SENSITIVITY: f32 = 0.002;
pub const ZOOM_SENSITIVITY: f32 = 0.6;
pub const MIN_ORBIT_RADIUS: f32 = 0.5;
pub const MAX_ORBIT_RADIUS: f32 = 80.0;
