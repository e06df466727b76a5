//! Pixel-coordinate conversions between vertex pairs, `(x, y, w, h)` boxes and
//! anchor-relative offset boxes.
//!
//! All coordinates are integer pixels with `x` to the right and `y` down.
//! Nothing here knows about frame sizes; bounds are checked where a box is
//! actually used to index a raster.

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Absolute box as `(x, y, width, height)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BoxXywh {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl BoxXywh {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Vertex pair spanning this box.
    pub fn vertices(&self) -> RoiVertices {
        RoiVertices {
            top_left: self.top_left(),
            bottom_right: Point::new(self.x + self.width, self.y + self.height),
        }
    }
}

/// Calibrated ROI placement relative to the top-left corner of a located anchor.
///
/// `dx`/`dy` may be negative; `width`/`height` are strictly positive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OffsetBoxRepr", into = "OffsetBoxRepr")]
pub struct OffsetBox {
    dx: i64,
    dy: i64,
    width: i64,
    height: i64,
}

impl OffsetBox {
    pub fn new(dx: i64, dy: i64, width: i64, height: i64) -> Result<Self, CoreError> {
        if width <= 0 || height <= 0 {
            return Err(CoreError::InvalidGeometry { width, height });
        }
        Ok(Self {
            dx,
            dy,
            width,
            height,
        })
    }

    #[inline]
    pub fn dx(&self) -> i64 {
        self.dx
    }

    #[inline]
    pub fn dy(&self) -> i64 {
        self.dy
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.height
    }
}

/// On-disk form: `[dx, dy, width, height]`.
#[derive(Serialize, Deserialize)]
struct OffsetBoxRepr([i64; 4]);

impl TryFrom<OffsetBoxRepr> for OffsetBox {
    type Error = CoreError;

    fn try_from(OffsetBoxRepr([dx, dy, w, h]): OffsetBoxRepr) -> Result<Self, Self::Error> {
        OffsetBox::new(dx, dy, w, h)
    }
}

impl From<OffsetBox> for OffsetBoxRepr {
    fn from(b: OffsetBox) -> Self {
        OffsetBoxRepr([b.dx, b.dy, b.width, b.height])
    }
}

/// Opposite corners of a rectangle; `bottom_right` is exclusive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RoiVertices {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl RoiVertices {
    #[inline]
    pub fn width(&self) -> i64 {
        self.bottom_right.x - self.top_left.x
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.bottom_right.y - self.top_left.y
    }
}

/// Convert a vertex pair into `(x, y, w, h)`.
///
/// Fails unless `bottom_right` lies strictly down and to the right of `top_left`.
pub fn vertices_to_box(top_left: Point, bottom_right: Point) -> Result<BoxXywh, CoreError> {
    let width = bottom_right.x - top_left.x;
    let height = bottom_right.y - top_left.y;
    if width <= 0 || height <= 0 {
        return Err(CoreError::InvalidGeometry { width, height });
    }
    Ok(BoxXywh::new(top_left.x, top_left.y, width, height))
}

/// Place an offset box relative to an anchor's top-left corner.
pub fn offset_to_vertices(anchor_top_left: Point, offset: &OffsetBox) -> RoiVertices {
    let top_left = Point::new(anchor_top_left.x + offset.dx, anchor_top_left.y + offset.dy);
    let bottom_right = Point::new(top_left.x + offset.width, top_left.y + offset.height);
    RoiVertices {
        top_left,
        bottom_right,
    }
}
