//! Tell an open garage door from a closed one in snapshots from a fixed
//! webcam.
//!
//! This crate re-exports the two building blocks:
//! - [`core`]: raster algorithms (template matching, CLAHE normalization,
//!   median-threshold decision). No file I/O.
//! - [`deck`]: snapshot files, lazily evaluated per-image records, collection
//!   filters, batch scoring and markup images.
//!
//! The `doorcam` binary (feature `cli`, on by default) wraps them.
//!
//! ```no_run
//! use doorcam::deck::{DoorcamConfig, ImageRecord, TemplateCache};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = DoorcamConfig::load_json("doorcam.json")?;
//! let template = cfg.template(&mut TemplateCache::new())?;
//! let mut record = ImageRecord::new(
//!     "snapshots/2017-11-10_06_00_open.jpg",
//!     template,
//!     cfg.shared_pipeline(),
//! );
//! let decision = record.decision()?;
//! println!("{} (median {:.1})", decision.state, decision.statistic);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//! - `cli` (default): the `doorcam` binary.
//! - `rayon`: `deck::analyze_batch_parallel` and `doorcam batch --parallel`.
//! - `tracing`: spans from the pipeline stages and a `tracing` subscriber in
//!   the binary.

pub use doorcam_core as core;
pub use doorcam_deck as deck;

pub use doorcam_core::{Decision, DoorState, PipelineParams};
pub use doorcam_deck::{
    BatchReport, CollectionFilter, DoorcamConfig, ImageRecord, RecordedState, Template,
};
