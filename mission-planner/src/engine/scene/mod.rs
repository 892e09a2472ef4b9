//! Scene content: lights, reference grid, asset markers and measurement visuals.

/// Lighting and the ground reference grid.
pub mod environment;

/// Marker entities mirrored from the placed-asset registry, plus the deploy preview.
pub mod markers;

/// Measurement points and lines.
pub mod measure_visuals;
