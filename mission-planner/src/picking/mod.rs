//! Pointer-to-surface projection.
//!
//! Turns a cursor position into a world ray and intersects it with pickable
//! terrain, or with a finite invisible ground plane when terrain is absent
//! or missed.

pub mod projector;
pub mod ray;
