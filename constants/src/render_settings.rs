use bevy::color::Srgba;
use bevy::color::palettes::css;

pub const DRAW_LINE_WIDTH: f32 = 0.008;
pub const MOUSE_RAYCAST_INTERSECTION_SPHERE_SIZE: f32 = 0.015;

/// Translucency of the deployment preview marker.
pub const PREVIEW_ALPHA: f32 = 0.5;
pub const PREVIEW_COLOUR: Srgba = css::BLUE;

pub const MEASURE_PREVIEW_COLOUR: Srgba = Srgba::rgb(1.0, 1.0, 0.2);
pub const MEASURE_COMPLETED_COLOUR: Srgba = Srgba::rgb(1.0, 0.27, 0.0);

