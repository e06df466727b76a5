//! Median-intensity threshold classification of a normalized ROI.

use serde::{Deserialize, Serialize};

use crate::{CoreError, GrayImage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Closed,
}

impl std::fmt::Display for DoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub state: DoorState,
    /// Median ROI intensity the verdict was derived from.
    pub statistic: f64,
}

/// Calibrated threshold on the 8-bit intensity scale.
///
/// There is no default: the value depends on the camera and lighting of one
/// installation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionParams {
    pub threshold: f64,
}

impl DecisionParams {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.threshold.is_finite() {
            return Err(CoreError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// 256-bin intensity histogram.
pub fn roi_histogram(roi: &GrayImage) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in &roi.data {
        hist[v as usize] += 1;
    }
    hist
}

/// Median pixel value. An even pixel count yields the mean of the two middle
/// values.
pub fn median_intensity(roi: &GrayImage) -> Result<f64, CoreError> {
    if roi.is_empty() {
        return Err(CoreError::EmptyRoi);
    }
    let hist = roi_histogram(roi);
    let n = roi.data.len();
    // Zero-based ranks of the middle element(s).
    let lo_rank = (n - 1) / 2;
    let hi_rank = n / 2;

    let mut lo = None;
    let mut seen = 0usize;
    for (value, &count) in hist.iter().enumerate() {
        seen += count as usize;
        if lo.is_none() && seen > lo_rank {
            lo = Some(value);
        }
        if seen > hi_rank {
            let lo = lo.unwrap_or(value);
            return Ok((lo + value) as f64 / 2.0);
        }
    }
    Err(CoreError::EmptyRoi)
}

/// `Open` iff `statistic < threshold`.
#[inline]
pub fn classify(statistic: f64, threshold: f64) -> DoorState {
    if statistic < threshold {
        DoorState::Open
    } else {
        DoorState::Closed
    }
}

pub fn decide(roi: &GrayImage, params: &DecisionParams) -> Result<Decision, CoreError> {
    params.validate()?;
    let statistic = median_intensity(roi)?;
    let state = classify(statistic, params.threshold);
    log::debug!(
        "median {statistic:.1} vs threshold {:.1} -> {state}",
        params.threshold
    );
    Ok(Decision { state, statistic })
}
