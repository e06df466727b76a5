use serde::{Deserialize, Serialize};

use crate::{CoreError, DecisionParams, NormalizeParams, OffsetBox};

/// Which raster the decision engine reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// The normalized ROI crop straight out of the normalizer.
    #[default]
    NormalizedCrop,
    /// The ROI re-cut from the luminance of the normalized RGB frame.
    RederivedLuminance,
}

/// Everything the per-image pipeline needs besides the frame and template.
///
/// The offsets and the threshold belong to one camera installation and have
/// no defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub normalize: NormalizeParams,
    /// ROI placement relative to the located anchor.
    pub door_offset: OffsetBox,
    /// Secondary marker, only drawn in markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_offset: Option<OffsetBox>,
    pub decision: DecisionParams,
    #[serde(default)]
    pub decision_source: DecisionSource,
}

impl PipelineParams {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.normalize.validate()?;
        self.decision.validate()
    }
}
