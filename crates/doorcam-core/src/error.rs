/// Errors produced by the raster pipeline stages.
///
/// Every variant is cheap to clone so that a failed stage can be cached and
/// handed back on every later query.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum CoreError {
    #[error("invalid geometry: width={width}, height={height} (both must be positive)")]
    InvalidGeometry { width: i64, height: i64 },

    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("invalid raster buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error(
        "template {template_width}x{template_height} does not fit inside frame {frame_width}x{frame_height}"
    )]
    TemplateTooLarge {
        template_width: usize,
        template_height: usize,
        frame_width: usize,
        frame_height: usize,
    },

    #[error(
        "roi ({x0},{y0})-({x1},{y1}) lies outside the {width}x{height} frame; \
         the camera may have moved or the offset box is miscalibrated"
    )]
    RoiOutOfBounds {
        x0: i64,
        y0: i64,
        x1: i64,
        y1: i64,
        width: usize,
        height: usize,
    },

    #[error("blur kernel size must be odd and >= 1, got {0}")]
    InvalidKernelSize(u32),

    #[error("clip limit must be finite and positive, got {0}")]
    InvalidClipLimit(f32),

    #[error("grid size must be >= 2, got {0}")]
    InvalidGridSize(u32),

    #[error("decision threshold must be finite, got {0}")]
    InvalidThreshold(f64),

    #[error("roi has zero area")]
    EmptyRoi,
}

impl CoreError {
    /// Stable tag used in reports and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidGeometry { .. } => "invalid_geometry",
            CoreError::EmptyImage { .. } => "empty_image",
            CoreError::InvalidBuffer { .. } => "invalid_buffer",
            CoreError::TemplateTooLarge { .. } => "template_too_large",
            CoreError::RoiOutOfBounds { .. } => "roi_out_of_bounds",
            CoreError::InvalidKernelSize(_) => "invalid_kernel_size",
            CoreError::InvalidClipLimit(_) => "invalid_clip_limit",
            CoreError::InvalidGridSize(_) => "invalid_grid_size",
            CoreError::InvalidThreshold(_) => "invalid_threshold",
            CoreError::EmptyRoi => "empty_roi",
        }
    }
}
