//! Orbit camera for viewport navigation.
//!
//! Right drag orbits around the focus point, middle drag pans across the
//! ground, the wheel zooms. Input is ignored while an asset is being dragged.

/// Orbit camera resource and controller system.
pub mod orbit_camera;
