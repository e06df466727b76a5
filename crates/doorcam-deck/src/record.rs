//! One snapshot and its lazily derived pipeline stages.
//!
//! Stages run on first request, in order, and are memoized per record:
//!
//! ```text
//! Unloaded -> FrameLoaded -> AnchorLocated -> RoiNormalized -> Decided
//! ```
//!
//! A stage that fails keeps its error and hands the same error back on every
//! later request; nothing is retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use doorcam_core::{
    decide, locate_template, normalize_roi, offset_to_vertices, roi_histogram, CoreError,
    Decision, DecisionSource, GrayImage, LabImage, MatchResult, NormalizedRoi, PipelineParams,
    RgbImage, RoiVertices,
};
use serde::{Deserialize, Serialize};

use crate::filename::{parse_snapshot_path, RecordedState, SnapshotName};
use crate::template::Template;

/// Pipeline step a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LoadFrame,
    LocateAnchor,
    NormalizeRoi,
    Decide,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::LoadFrame => "load_frame",
            Stage::LocateAnchor => "locate_anchor",
            Stage::NormalizeRoi => "normalize_roi",
            Stage::Decide => "decide",
        })
    }
}

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum RecordErrorKind {
    #[error("unreadable image: {0}")]
    UnreadableImage(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RecordErrorKind {
    /// Stable snake_case tag.
    pub fn tag(&self) -> &'static str {
        match self {
            RecordErrorKind::UnreadableImage(_) => "unreadable_image",
            RecordErrorKind::Core(e) => e.kind(),
        }
    }
}

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("{stage} failed: {kind}")]
pub struct RecordError {
    pub stage: Stage,
    pub kind: RecordErrorKind,
}

impl RecordError {
    fn core(stage: Stage, err: CoreError) -> Self {
        Self {
            stage,
            kind: err.into(),
        }
    }
}

/// Memo cell of one stage: `None` until computed, then the cached outcome.
#[derive(Clone, Debug)]
struct Slot<T>(Option<Result<T, RecordError>>);

impl<T> Slot<T> {
    const PENDING: Self = Slot(None);

    fn ready(value: T) -> Self {
        Slot(Some(Ok(value)))
    }

    fn is_ready(&self) -> bool {
        matches!(self.0, Some(Ok(_)))
    }

    fn is_failed(&self) -> bool {
        matches!(self.0, Some(Err(_)))
    }

    fn peek(&self) -> Option<Result<&T, RecordError>> {
        self.0.as_ref().map(|r| r.as_ref().map_err(Clone::clone))
    }

    /// Run `init` on first use only; later calls replay its outcome.
    fn get_or_try_init(
        &mut self,
        init: impl FnOnce() -> Result<T, RecordError>,
    ) -> Result<&T, RecordError> {
        match self.0.get_or_insert_with(init) {
            Ok(v) => Ok(&*v),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Decoded frame with its L*a*b* split.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgb: RgbImage,
    pub lab: LabImage,
}

impl Frame {
    pub fn from_rgb(rgb: RgbImage) -> Self {
        let lab = LabImage::from_rgb(&rgb);
        Self { rgb, lab }
    }

    /// Luminance plane used for matching and statistics.
    #[inline]
    pub fn luminance(&self) -> &GrayImage {
        &self.lab.l
    }
}

/// How far a record's pipeline has progressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Unloaded,
    FrameLoaded,
    AnchorLocated,
    RoiNormalized,
    Decided,
    Failed(Stage),
}

pub struct ImageRecord {
    path: PathBuf,
    name: Option<SnapshotName>,
    file_size: Option<u64>,
    template: Template,
    params: Arc<PipelineParams>,
    frame: Slot<Frame>,
    anchor: Slot<MatchResult>,
    normalized: Slot<NormalizedRoi>,
    decision: Slot<Decision>,
}

impl std::fmt::Debug for ImageRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRecord")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("file_size", &self.file_size)
            .field("progress", &self.progress())
            .finish()
    }
}

impl ImageRecord {
    /// Record for a snapshot file. Nothing is decoded until a stage is asked for.
    ///
    /// Names that do not follow the snapshot convention are accepted; such
    /// records have no timestamp and an `Unknown` recorded state.
    pub fn new(path: impl Into<PathBuf>, template: Template, params: Arc<PipelineParams>) -> Self {
        let path = path.into();
        let name = parse_snapshot_path(&path).ok();
        let file_size = std::fs::metadata(&path).ok().map(|m| m.len());
        Self {
            path,
            name,
            file_size,
            template,
            params,
            frame: Slot::PENDING,
            anchor: Slot::PENDING,
            normalized: Slot::PENDING,
            decision: Slot::PENDING,
        }
    }

    /// Record for an already decoded frame; `label` stands in for the path.
    pub fn from_rgb(
        label: impl Into<PathBuf>,
        rgb: RgbImage,
        template: Template,
        params: Arc<PipelineParams>,
    ) -> Self {
        let path = label.into();
        let name = parse_snapshot_path(&path).ok();
        Self {
            path,
            name,
            file_size: None,
            template,
            params,
            frame: Slot::ready(Frame::from_rgb(rgb)),
            anchor: Slot::PENDING,
            normalized: Slot::PENDING,
            decision: Slot::PENDING,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&SnapshotName> {
        self.name.as_ref()
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.name.map(|n| n.timestamp)
    }

    pub fn recorded_state(&self) -> RecordedState {
        self.name.map_or(RecordedState::Unknown, |n| n.state)
    }

    /// Size on disk at construction, if the file could be inspected.
    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub fn progress(&self) -> Progress {
        let failed = [
            (self.frame.is_failed(), Stage::LoadFrame),
            (self.anchor.is_failed(), Stage::LocateAnchor),
            (self.normalized.is_failed(), Stage::NormalizeRoi),
            (self.decision.is_failed(), Stage::Decide),
        ];
        if let Some(&(_, stage)) = failed.iter().find(|(f, _)| *f) {
            return Progress::Failed(stage);
        }
        if self.decision.is_ready() {
            Progress::Decided
        } else if self.normalized.is_ready() {
            Progress::RoiNormalized
        } else if self.anchor.is_ready() {
            Progress::AnchorLocated
        } else if self.frame.is_ready() {
            Progress::FrameLoaded
        } else {
            Progress::Unloaded
        }
    }

    /// Decoded frame.
    pub fn frame(&mut self) -> Result<&Frame, RecordError> {
        let path = &self.path;
        self.frame.get_or_try_init(|| load_frame(path))
    }

    /// Where the template sits in the frame's luminance.
    pub fn anchor(&mut self) -> Result<MatchResult, RecordError> {
        let (_, anchor) = located(&self.path, &self.template, &mut self.frame, &mut self.anchor)?;
        Ok(anchor)
    }

    /// Door ROI placed relative to the anchor.
    pub fn roi(&mut self) -> Result<RoiVertices, RecordError> {
        let anchor = self.anchor()?;
        Ok(offset_to_vertices(
            anchor.anchor.top_left(),
            &self.params.door_offset,
        ))
    }

    /// Target-marker box, when one is configured. Used for markup only.
    pub fn target_vertices(&mut self) -> Result<Option<RoiVertices>, RecordError> {
        let Some(offset) = self.params.target_offset else {
            return Ok(None);
        };
        let anchor = self.anchor()?;
        Ok(Some(offset_to_vertices(anchor.anchor.top_left(), &offset)))
    }

    /// Frame with the normalized ROI and the ROI crop itself.
    pub fn normalized(&mut self) -> Result<&NormalizedRoi, RecordError> {
        let (frame, anchor) =
            located(&self.path, &self.template, &mut self.frame, &mut self.anchor)?;
        let params = &*self.params;
        let roi = offset_to_vertices(anchor.anchor.top_left(), &params.door_offset);
        self.normalized.get_or_try_init(|| {
            normalize_roi(&frame.lab, &roi, &params.normalize)
                .map_err(|e| RecordError::core(Stage::NormalizeRoi, e))
        })
    }

    /// The raster the decision reads, per the configured source.
    pub fn decision_roi(&mut self) -> Result<GrayImage, RecordError> {
        let roi = self.roi()?;
        let source = self.params.decision_source;
        let normalized = self.normalized()?;
        match source {
            DecisionSource::NormalizedCrop => Ok(normalized.crop.clone()),
            DecisionSource::RederivedLuminance => LabImage::from_rgb(&normalized.frame)
                .l
                .crop(&roi)
                .map_err(|e| RecordError::core(Stage::Decide, e)),
        }
    }

    /// Open/closed verdict and its statistic.
    pub fn decision(&mut self) -> Result<Decision, RecordError> {
        if let Some(done) = self.decision.peek() {
            return done.copied();
        }
        let decided = match self.decision_roi() {
            Ok(roi) => decide(&roi, &self.params.decision)
                .map_err(|e| RecordError::core(Stage::Decide, e)),
            Err(e) if e.stage == Stage::Decide => Err(e),
            // Upstream failures stay cached in their own slot.
            Err(e) => return Err(e),
        };
        match &decided {
            Ok(d) => log::debug!(
                "{}: {} (median {:.1})",
                self.path.display(),
                d.state,
                d.statistic
            ),
            Err(e) => log::debug!("{}: {e}", self.path.display()),
        }
        self.decision.get_or_try_init(|| decided).copied()
    }

    /// Intensity histogram of the decision ROI.
    pub fn roi_histogram(&mut self) -> Result<[u32; 256], RecordError> {
        Ok(roi_histogram(&self.decision_roi()?))
    }
}

fn load_frame(path: &Path) -> Result<Frame, RecordError> {
    let rgb = crate::raster::load_rgb(path).map_err(|e| RecordError {
        stage: Stage::LoadFrame,
        kind: RecordErrorKind::UnreadableImage(format!("{}: {e}", path.display())),
    })?;
    log::debug!(
        "{}: loaded {}x{} frame",
        path.display(),
        rgb.width,
        rgb.height
    );
    Ok(Frame::from_rgb(rgb))
}

/// Resolve the frame and anchor slots, in that order.
fn located<'a>(
    path: &Path,
    template: &Template,
    frame: &'a mut Slot<Frame>,
    anchor: &mut Slot<MatchResult>,
) -> Result<(&'a Frame, MatchResult), RecordError> {
    let frame = frame.get_or_try_init(|| load_frame(path))?;
    let found = anchor.get_or_try_init(|| {
        locate_template(&frame.luminance().view(), &template.raster().view())
            .map_err(|e| RecordError::core(Stage::LocateAnchor, e))
    })?;
    Ok((frame, *found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorcam_core::{DecisionParams, DoorState, NormalizeParams, OffsetBox, Smoothing};

    fn params(threshold: f64) -> Arc<PipelineParams> {
        Arc::new(PipelineParams {
            normalize: NormalizeParams {
                smoothing: Smoothing::Gaussian(3),
                clip_limit: 2.0,
                grid_size: 2,
            },
            door_offset: OffsetBox::new(10, 0, 6, 8).unwrap(),
            target_offset: Some(OffsetBox::new(0, 10, 4, 4).unwrap()),
            decision: DecisionParams { threshold },
            decision_source: DecisionSource::NormalizedCrop,
        })
    }

    fn template() -> Template {
        let raster = GrayImage::from_raw(
            6,
            5,
            (0..30).map(|i| if (i / 2) % 2 == 0 { 250 } else { 10 }).collect(),
        )
        .unwrap();
        Template::from_raster(raster).unwrap()
    }

    /// 40x30 frame with the template pasted at (5, 4) and a uniform door patch.
    fn frame_with_door(door: u8) -> RgbImage {
        let mut rgb = RgbImage::filled(40, 30, [90, 90, 90]);
        let t = template();
        // Two gray levels map affinely onto L, so the pasted patch still correlates perfectly.
        for y in 0..t.height() {
            for x in 0..t.width() {
                let v = t.raster().get(x, y);
                rgb.set(5 + x, 4 + y, [v, v, v]);
            }
        }
        for y in 4..12 {
            for x in 15..21 {
                rgb.set(x, y, [door, door, door]);
            }
        }
        rgb
    }

    #[test]
    fn stages_progress_lazily() {
        let mut rec = ImageRecord::from_rgb(
            "2017-11-10_06_00_open.jpg",
            frame_with_door(40),
            template(),
            params(191.0),
        );
        assert_eq!(rec.progress(), Progress::FrameLoaded);
        let anchor = rec.anchor().unwrap();
        assert_eq!(anchor.anchor.top_left(), doorcam_core::Point::new(5, 4));
        assert_eq!((anchor.anchor.width, anchor.anchor.height), (6, 5));
        assert_eq!(rec.progress(), Progress::AnchorLocated);
        rec.normalized().unwrap();
        assert_eq!(rec.progress(), Progress::RoiNormalized);
        rec.decision().unwrap();
        assert_eq!(rec.progress(), Progress::Decided);
    }

    #[test]
    fn roi_follows_the_door_offset() {
        let mut rec = ImageRecord::from_rgb("x.png", frame_with_door(40), template(), params(191.0));
        let roi = rec.roi().unwrap();
        assert_eq!(roi.top_left, doorcam_core::Point::new(15, 4));
        assert_eq!(roi.bottom_right, doorcam_core::Point::new(21, 12));
        let target = rec.target_vertices().unwrap().unwrap();
        assert_eq!(target.top_left, doorcam_core::Point::new(5, 14));
        let crop = &rec.normalized().unwrap().crop;
        assert_eq!((crop.width, crop.height), (6, 8));
    }

    #[test]
    fn decision_is_memoized() {
        let mut rec = ImageRecord::from_rgb("x.png", frame_with_door(40), template(), params(191.0));
        let a = rec.decision().unwrap();
        let b = rec.decision().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn threshold_drives_the_verdict() {
        // A uniform crop stays uniform through CLAHE, so its median is fixed.
        let mut rec = ImageRecord::from_rgb("x.png", frame_with_door(40), template(), params(0.0));
        let median = rec.decision().unwrap().statistic;
        assert_eq!(rec.decision().unwrap().state, DoorState::Closed);

        let mut rec = ImageRecord::from_rgb(
            "x.png",
            frame_with_door(40),
            template(),
            params(median + 0.5),
        );
        assert_eq!(rec.decision().unwrap().state, DoorState::Open);
    }

    #[test]
    fn unreadable_file_fails_at_load_and_stays_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2017-11-10_06_00_open.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        let mut rec = ImageRecord::new(&path, template(), params(191.0));
        assert_eq!(rec.file_size(), Some(10));
        assert_eq!(rec.recorded_state(), RecordedState::Open);

        let err = rec.decision().unwrap_err();
        assert_eq!(err.stage, Stage::LoadFrame);
        assert_eq!(err.kind.tag(), "unreadable_image");
        assert_eq!(rec.progress(), Progress::Failed(Stage::LoadFrame));
        assert_eq!(rec.anchor().unwrap_err(), err);
    }

    #[test]
    fn roi_outside_frame_fails_at_normalization() {
        let mut p = (*params(191.0)).clone();
        p.door_offset = OffsetBox::new(30, 20, 10, 10).unwrap();
        let mut rec =
            ImageRecord::from_rgb("x.png", frame_with_door(40), template(), Arc::new(p));
        let err = rec.decision().unwrap_err();
        assert_eq!(err.stage, Stage::NormalizeRoi);
        assert!(matches!(
            err.kind,
            RecordErrorKind::Core(CoreError::RoiOutOfBounds { .. })
        ));
        assert_eq!(rec.progress(), Progress::Failed(Stage::NormalizeRoi));
    }

    #[test]
    fn template_larger_than_frame_fails_at_locate() {
        let small = RgbImage::filled(4, 4, [0, 0, 0]);
        let mut rec = ImageRecord::from_rgb("x.png", small, template(), params(191.0));
        let err = rec.anchor().unwrap_err();
        assert_eq!(err.stage, Stage::LocateAnchor);
        assert_eq!(err.kind.tag(), "template_too_large");
    }

    #[test]
    fn rederived_luminance_source_reads_the_normalized_frame() {
        let mut p = (*params(191.0)).clone();
        p.decision_source = DecisionSource::RederivedLuminance;
        let mut rec =
            ImageRecord::from_rgb("x.png", frame_with_door(40), template(), Arc::new(p));
        let roi = rec.decision_roi().unwrap();
        assert_eq!((roi.width, roi.height), (6, 8));
        assert!(rec.decision().is_ok());
        assert_eq!(rec.roi_histogram().unwrap().iter().sum::<u32>(), 48);
    }

    #[test]
    fn names_outside_the_convention_are_unknown() {
        let rec = ImageRecord::from_rgb("frame.png", frame_with_door(40), template(), params(191.0));
        assert!(rec.name().is_none());
        assert_eq!(rec.recorded_state(), RecordedState::Unknown);
        assert_eq!(rec.timestamp(), None);
    }
}
