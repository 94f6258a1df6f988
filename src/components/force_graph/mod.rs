//! Force-directed graph canvas.
//!
//! Renders the live document graph on an HTML canvas with:
//! - Physics-based node positioning via force simulation
//! - Layout kept stable across live updates (positions keyed by document id)
//! - Pan, zoom and node dragging, hover labels and click-to-open
//! - Presence overlays showing who is working on which document
//!
//! The sync driver writes engine snapshots into a [`SharedScene`]; the canvas
//! reads it every animation frame.

mod component;
mod easing;
mod render;
mod scale;
mod state;
mod theme;

pub use component::{ForceGraphCanvas, SharedScene};
pub use state::{GraphScene, LegendEntry};
