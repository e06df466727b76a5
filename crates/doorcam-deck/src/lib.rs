//! Snapshot files, per-image records and batch analysis for doorcam.
//!
//! `doorcam-core` works on in-memory rasters; this crate connects it to a
//! folder of webcam snapshots named `YYYY-MM-DD_HH_MM_<open|close>.jpg`.
//!
//! - [`ImageRecord`] runs the pipeline for one file lazily and caches
//!   every stage, including failures.
//! - [`CollectionFilter`] selects snapshots by date range, time of day and
//!   recorded state.
//! - [`analyze_batch`] runs many records and scores them against the
//!   recorded states; a broken file only produces a [`RecordFailure`].
//! - [`annotate`] renders the before/after markup image.
//!
//! ```no_run
//! use doorcam_deck::{
//!     analyze_batch, list_snapshots, records_from_paths, DoorcamConfig, TemplateCache,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = DoorcamConfig::load_json("doorcam.json")?;
//! let template = cfg.template(&mut TemplateCache::new())?;
//! let paths = list_snapshots("snapshots".as_ref())?;
//! let report = analyze_batch(records_from_paths(paths, &template, &cfg.shared_pipeline()));
//! println!("{:?}", report.agreement());
//! # Ok(())
//! # }
//! ```

mod batch;
mod filename;
mod filter;
mod io;
mod listing;
mod markup;
mod raster;
mod record;
mod template;

pub use batch::{
    analyze_batch, analyze_record, records_from_paths, AgreementSummary, Analyzed, BatchReport,
    RecordFailure, RecordOutcome, RoiHistograms,
};
#[cfg(feature = "rayon")]
pub use batch::analyze_batch_parallel;
pub use filename::{
    parse_snapshot_name, parse_snapshot_path, FilenameError, RecordedState, SnapshotName,
};
pub use filter::{CollectionFilter, FilteredPaths, FilteredSet};
pub use io::{save_rgb, DeckIoError, DoorcamConfig};
pub use listing::{list_snapshots, select_by_age, Age};
pub use markup::{annotate, draw_box, hstack, ANCHOR_COLOR, DOOR_COLOR, TARGET_COLOR};
pub use raster::{gray_from_image, load_gray, load_rgb, rgb_from_image, rgb_to_image};
pub use record::{Frame, ImageRecord, Progress, RecordError, RecordErrorKind, Stage};
pub use template::{Template, TemplateCache, TemplateError, TemplateSource};
