//! ROI appearance normalization: crop, smooth, equalize, paste back.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::blur::{gaussian_blur, gaussian_kernel};
use crate::clahe::{clahe, validate_clahe_params};
use crate::{CoreError, GrayImage, LabImage, RgbImage, RoiVertices};

/// Optional Gaussian pre-smoothing of the ROI.
///
/// Serialized as the odd kernel size (`5`) or the string `"none"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SmoothingRepr", into = "SmoothingRepr")]
pub enum Smoothing {
    None,
    Gaussian(u32),
}

impl Smoothing {
    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            Smoothing::None => Ok(()),
            Smoothing::Gaussian(k) => gaussian_kernel(k).map(|_| ()),
        }
    }
}

impl std::str::FromStr for Smoothing {
    type Err = CoreError;

    /// Parses `"none"` or a kernel size; the size is validated here too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Smoothing::None);
        }
        let k: u32 = s.parse().map_err(|_| CoreError::InvalidKernelSize(0))?;
        let smoothing = Smoothing::Gaussian(k);
        smoothing.validate()?;
        Ok(smoothing)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SmoothingRepr {
    Size(u32),
    Word(String),
}

impl TryFrom<SmoothingRepr> for Smoothing {
    type Error = String;

    fn try_from(repr: SmoothingRepr) -> Result<Self, Self::Error> {
        match repr {
            SmoothingRepr::Size(k) => {
                let s = Smoothing::Gaussian(k);
                s.validate().map_err(|e| e.to_string())?;
                Ok(s)
            }
            SmoothingRepr::Word(w) if w.eq_ignore_ascii_case("none") => Ok(Smoothing::None),
            SmoothingRepr::Word(w) => Err(format!(
                "smoothing must be an odd kernel size or \"none\", got {w:?}"
            )),
        }
    }
}

impl From<Smoothing> for SmoothingRepr {
    fn from(s: Smoothing) -> Self {
        match s {
            Smoothing::None => SmoothingRepr::Word("none".to_string()),
            Smoothing::Gaussian(k) => SmoothingRepr::Size(k),
        }
    }
}

/// Parameters of the ROI normalizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizeParams {
    pub smoothing: Smoothing,
    /// CLAHE contrast clamp; larger values equalize more aggressively.
    pub clip_limit: f32,
    /// CLAHE tiles per side.
    pub grid_size: u32,
}

impl NormalizeParams {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.smoothing.validate()?;
        validate_clahe_params(self.clip_limit, self.grid_size)
    }
}

/// Output of [`normalize_roi`].
#[derive(Clone, Debug)]
pub struct NormalizedRoi {
    /// Full frame with the normalized ROI, back in RGB.
    pub frame: RgbImage,
    /// Copy of the luminance plane with the normalized ROI pasted in.
    pub luminance: GrayImage,
    /// The normalized ROI alone.
    pub crop: GrayImage,
}

/// Normalize the appearance of `roi` inside `lab`.
///
/// The input planes are left untouched; the normalized crop is written into a
/// copy of the luminance plane and recombined with the original chroma.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(lab, params),
        fields(
            x0 = roi.top_left.x,
            y0 = roi.top_left.y,
            w = roi.width(),
            h = roi.height()
        )
    )
)]
pub fn normalize_roi(
    lab: &LabImage,
    roi: &RoiVertices,
    params: &NormalizeParams,
) -> Result<NormalizedRoi, CoreError> {
    params.validate()?;

    let crop = lab.l.crop(roi)?;
    let smoothed = match params.smoothing {
        Smoothing::None => crop,
        Smoothing::Gaussian(k) => gaussian_blur(&crop, k)?,
    };
    let crop = clahe(&smoothed, params.clip_limit, params.grid_size)?;

    let mut luminance = lab.l.clone();
    luminance.paste(roi, &crop)?;
    let frame = lab.with_luminance(luminance.clone()).to_rgb();
    log::debug!(
        "normalized roi {}x{} at ({}, {})",
        crop.width,
        crop.height,
        roi.top_left.x,
        roi.top_left.y
    );

    Ok(NormalizedRoi {
        frame,
        luminance,
        crop,
    })
}
