//! Template localisation by zero-mean normalized cross-correlation.
//!
//! The score at `(x, y)` is
//!
//! ```text
//!            Σ T'(i,j) · I'(x+i, y+j)
//! r(x,y) = ----------------------------
//!          sqrt(Σ T'² · Σ I'(x+i,y+j)²)
//! ```
//!
//! where `T'` and `I'` are the template and the frame window with their means
//! removed. Scores lie in `[-1, 1]` and **higher is better**: the match is the
//! global maximum of the surface. A flat window (or a flat template) has no
//! defined correlation and scores `0`.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{BoxXywh, CoreError, GrayImageView};

/// Variance below which a window is treated as flat.
const FLAT_EPS: f64 = 1e-9;

/// Best template placement inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Where the template was found; width/height equal the template's.
    pub anchor: BoxXywh,
    /// Correlation score at the anchor, in `[-1, 1]`.
    pub score: f32,
}

/// Dense correlation scores for every valid template placement.
#[derive(Clone, Debug)]
pub struct MatchSurface {
    pub width: usize,
    pub height: usize,
    pub scores: Vec<f32>, // row-major
}

impl MatchSurface {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.scores[y * self.width + x]
    }

    /// Position of the global maximum; ties go to the first in raster order.
    pub fn argmax(&self) -> Option<(usize, usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &s) in self.scores.iter().enumerate() {
            if best.map(|(_, b)| s > b).unwrap_or(true) {
                best = Some((idx, s));
            }
        }
        best.map(|(idx, s)| (idx % self.width, idx / self.width, s))
    }
}

/// Summed-area tables of pixel values and squared pixel values.
struct Integrals {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl Integrals {
    fn new(img: &GrayImageView<'_>) -> Self {
        let stride = img.width + 1;
        let mut sum = vec![0u64; stride * (img.height + 1)];
        let mut sum_sq = vec![0u64; stride * (img.height + 1)];
        for y in 0..img.height {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for (x, &v) in img.row(y).iter().enumerate() {
                let v = v as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    #[inline]
    fn rect(&self, table: &[u64], x: usize, y: usize, w: usize, h: usize) -> u64 {
        let s = self.stride;
        table[(y + h) * s + x + w] + table[y * s + x] - table[y * s + x + w] - table[(y + h) * s + x]
    }
}

fn check_inputs(frame: &GrayImageView<'_>, template: &GrayImageView<'_>) -> Result<(), CoreError> {
    if frame.is_empty() {
        return Err(CoreError::EmptyImage {
            width: frame.width,
            height: frame.height,
        });
    }
    if template.is_empty() {
        return Err(CoreError::EmptyImage {
            width: template.width,
            height: template.height,
        });
    }
    if template.width > frame.width || template.height > frame.height {
        return Err(CoreError::TemplateTooLarge {
            template_width: template.width,
            template_height: template.height,
            frame_width: frame.width,
            frame_height: frame.height,
        });
    }
    Ok(())
}

/// Compute the full correlation surface of `template` over `frame`.
pub fn match_surface(
    frame: &GrayImageView<'_>,
    template: &GrayImageView<'_>,
) -> Result<MatchSurface, CoreError> {
    check_inputs(frame, template)?;

    let (tw, th) = (template.width, template.height);
    let n = (tw * th) as f64;
    let t_mean = template.data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let t_zero: Vec<f64> = template.data.iter().map(|&v| v as f64 - t_mean).collect();
    let t_var: f64 = t_zero.iter().map(|v| v * v).sum();

    let out_w = frame.width - tw + 1;
    let out_h = frame.height - th + 1;
    let mut scores = vec![0.0f32; out_w * out_h];

    if t_var <= FLAT_EPS {
        return Ok(MatchSurface {
            width: out_w,
            height: out_h,
            scores,
        });
    }

    let integrals = Integrals::new(frame);
    for y in 0..out_h {
        for x in 0..out_w {
            let s = integrals.rect(&integrals.sum, x, y, tw, th) as f64;
            let sq = integrals.rect(&integrals.sum_sq, x, y, tw, th) as f64;
            let w_var = sq - s * s / n;
            if w_var <= FLAT_EPS {
                continue;
            }
            // Σ T'·I' == Σ T'·(I - mean(I)) because Σ T' == 0.
            let mut cross = 0.0f64;
            for j in 0..th {
                let frow = &frame.row(y + j)[x..x + tw];
                let trow = &t_zero[j * tw..(j + 1) * tw];
                for (&f, &t) in frow.iter().zip(trow) {
                    cross += f as f64 * t;
                }
            }
            let r = cross / (t_var * w_var).sqrt();
            scores[y * out_w + x] = r.clamp(-1.0, 1.0) as f32;
        }
    }

    Ok(MatchSurface {
        width: out_w,
        height: out_h,
        scores,
    })
}

/// Find the best placement of `template` inside `frame`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(frame, template),
        fields(
            frame_w = frame.width,
            frame_h = frame.height,
            tmpl_w = template.width,
            tmpl_h = template.height
        )
    )
)]
pub fn locate_template(
    frame: &GrayImageView<'_>,
    template: &GrayImageView<'_>,
) -> Result<MatchResult, CoreError> {
    let surface = match_surface(frame, template)?;
    let (x, y, score) = surface.argmax().ok_or(CoreError::EmptyImage {
        width: surface.width,
        height: surface.height,
    })?;
    log::debug!("template matched at ({x}, {y}) with score {score:.4}");
    Ok(MatchResult {
        anchor: BoxXywh::new(
            x as i64,
            y as i64,
            template.width as i64,
            template.height as i64,
        ),
        score,
    })
}
