//! Core application setup.
//!
//! Builds the Bevy app, reads runtime configuration and seeds the mission
//! from its preset for both native and WASM targets.

/// Application setup and plugin configuration.
pub mod app_setup;

/// Environment-driven runtime settings.
pub mod config;

/// Mission preset loading through the asset server.
pub mod preset;

/// Platform-specific window configuration for native and WASM builds.
pub mod window_config;
