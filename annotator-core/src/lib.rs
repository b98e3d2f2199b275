//! Picking core for the point-cloud label annotator.
//!
//! Everything in this crate is frame-agnostic: the interactive shell feeds it
//! camera matrices, viewport sizes and gesture coordinates, and consumes the
//! per-point color buffer it keeps in sync. No rendering, no file dialogs.

pub mod cloud;
pub mod labels;
pub mod persistence;
pub mod projection;
pub mod selection;
pub mod visibility;

pub use cloud::{PointSet, UNLABELED};
pub use labels::{LabelStore, Palette};
pub use projection::ScreenProjectionIndex;
pub use selection::{SelectMode, SelectionEngine};
pub use visibility::{OcclusionProbe, SurfaceOcclusion, VisibilityOracle};
