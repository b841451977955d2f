//! Preview geometry negotiation.
//!
//! This module matches the camera's preview size and orientation to the
//! display surface showing it. The pure selection functions are usable
//! on their own; [`PreviewGeometryPlanner`] applies them to a live
//! camera whenever the surface changes size.

mod planner;
mod surface;

pub use planner::{
    adapt_to_rotation, best_preview_size, choose_resolution, PreviewGeometryPlanner,
    RotationPlan, FALLBACK_RESOLUTION,
};
pub use surface::{ConfigOrientation, DisplaySurface, FixedSurface, Rotation, SurfaceEvent};
