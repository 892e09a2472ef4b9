//! Mission planning viewport.
//!
//! Users import terrain (Wavefront OBJ meshes or GeoTIFF rasters), deploy
//! troops, arsenal, vehicles and tanks onto it, drag placed assets around,
//! measure distances and export the mission as an OBJ file with metadata.
//! Runs natively with an overlay and keyboard shortcuts, or in a browser
//! iframe driven by the host page over JSON-RPC.

pub mod engine;
pub mod network;
pub mod picking;
pub mod rpc;
pub mod terrain;
pub mod tools;
pub mod ui;
