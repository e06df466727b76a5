//! Raster and geometry algorithms for telling an open garage door from a
//! closed one in a fixed webcam's snapshots.
//!
//! The pipeline per frame is: locate a reference patch ([`locate_template`]),
//! place the door ROI relative to it ([`offset_to_vertices`]), normalize the
//! ROI's appearance ([`normalize_roi`]) and threshold its median intensity
//! ([`decide`]).
//!
//! This crate does no file I/O and depends on no image codec; see
//! `doorcam-deck` for snapshot files and batches.

mod blur;
mod clahe;
mod decision;
mod error;
mod geometry;
mod image;
mod lab;
mod locate;
mod logger;
mod normalize;
mod params;

pub use blur::{gaussian_blur, gaussian_kernel};
pub use clahe::clahe;
pub use decision::{
    classify, decide, median_intensity, roi_histogram, Decision, DecisionParams, DoorState,
};
pub use error::CoreError;
pub use geometry::{offset_to_vertices, vertices_to_box, BoxXywh, OffsetBox, Point, RoiVertices};
pub use image::{GrayImage, GrayImageView, RgbImage};
pub use lab::LabImage;
pub use locate::{locate_template, match_surface, MatchResult, MatchSurface};
pub use normalize::{normalize_roi, NormalizeParams, NormalizedRoi, Smoothing};
pub use params::{DecisionSource, PipelineParams};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
