//! Mission interaction tools: deployment, drag, measurement and the
//! coordinator that keeps them mutually exclusive.
//!
//! ## Interaction Model
//!
//! `ToolManager` holds a single `InteractionMode`:
//!
//! ```text
//! Idle ──deploy(kind), count > 0──> Deploying(Armed | Previewing)
//!  │                                   │  click on surface: place, count - 1
//!  │                                   │  count hits 0 ──> Idle
//!  ├──press on asset hit box──> Dragging ──release──> previous deployment or Idle
//!  └──measure──> Measuring(0 | 1 point) ──second click──> Idle
//! ```
//!
//! Commands from the keyboard (native), file drops and the RPC bridge all
//! arrive as `PlannerCommandEvent`s and are applied in one system, which
//! routes the resulting notifications back to the host.

/// Deploy state machine: arm, preview, confirm.
pub mod deployment;

/// Drag state, marker hover tiers and hit-box picking.
pub mod drag;

/// Keyboard shortcuts and file drops.
pub mod input;

/// Two-point distance measurement with an elevation profile.
pub mod measure;

/// Asset kinds and mission counts.
pub mod mission;

/// Per-frame pointer projection and cursor feedback.
pub mod pointer;

/// Ordered registry of placed assets.
pub mod registry;

/// Interaction mode owner and command routing.
pub mod tool_manager;
