use serde::{Deserialize, Serialize};

use crate::{CoreError, RoiVertices};

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl GrayImageView<'_> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn to_owned_image(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Wrap a row-major buffer, checking its length.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, CoreError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(CoreError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Copy out the rectangle `roi`. The rectangle must lie inside the image.
    pub fn crop(&self, roi: &RoiVertices) -> Result<GrayImage, CoreError> {
        let (x0, y0, w, h) = checked_rect(roi, self.width, self.height)?;
        let mut data = Vec::with_capacity(w * h);
        for y in y0..y0 + h {
            let start = y * self.width + x0;
            data.extend_from_slice(&self.data[start..start + w]);
        }
        Ok(GrayImage {
            width: w,
            height: h,
            data,
        })
    }

    /// Overwrite the rectangle `roi` with `patch`, which must have the same size.
    pub fn paste(&mut self, roi: &RoiVertices, patch: &GrayImage) -> Result<(), CoreError> {
        let (x0, y0, w, h) = checked_rect(roi, self.width, self.height)?;
        if patch.width != w || patch.height != h {
            return Err(CoreError::InvalidBuffer {
                expected: w * h,
                got: patch.data.len(),
            });
        }
        for (row, y) in (y0..y0 + h).enumerate() {
            let dst = y * self.width + x0;
            self.data[dst..dst + w].copy_from_slice(&patch.data[row * w..(row + 1) * w]);
        }
        Ok(())
    }
}

/// Interleaved 8-bit RGB raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // row-major, len = w*h*3
}

impl RgbImage {
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, CoreError> {
        let expected = width * height * 3;
        if data.len() != expected {
            return Err(CoreError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        let i = 3 * (y * self.width + x);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = 3 * (y * self.width + x);
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Validate `roi` against a `width x height` raster and return `(x0, y0, w, h)`.
fn checked_rect(
    roi: &RoiVertices,
    width: usize,
    height: usize,
) -> Result<(usize, usize, usize, usize), CoreError> {
    let out_of_bounds = || CoreError::RoiOutOfBounds {
        x0: roi.top_left.x,
        y0: roi.top_left.y,
        x1: roi.bottom_right.x,
        y1: roi.bottom_right.y,
        width,
        height,
    };
    let tl = roi.top_left;
    let br = roi.bottom_right;
    if tl.x < 0 || tl.y < 0 || br.x > width as i64 || br.y > height as i64 {
        return Err(out_of_bounds());
    }
    if br.x <= tl.x || br.y <= tl.y {
        return Err(CoreError::InvalidGeometry {
            width: br.x - tl.x,
            height: br.y - tl.y,
        });
    }
    Ok((
        tl.x as usize,
        tl.y as usize,
        (br.x - tl.x) as usize,
        (br.y - tl.y) as usize,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn ramp(width: usize, height: usize) -> GrayImage {
        let data = (0..width * height).map(|i| (i % 251) as u8).collect();
        GrayImage::from_raw(width, height, data).unwrap()
    }

    fn roi(x0: i64, y0: i64, x1: i64, y1: i64) -> RoiVertices {
        RoiVertices {
            top_left: Point::new(x0, y0),
            bottom_right: Point::new(x1, y1),
        }
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(GrayImage::from_raw(4, 4, vec![0; 15]).is_err());
        assert!(RgbImage::from_raw(2, 2, vec![0; 12]).is_ok());
        assert!(RgbImage::from_raw(2, 2, vec![0; 4]).is_err());
    }

    #[test]
    fn crop_copies_the_requested_rectangle() {
        let img = ramp(10, 8);
        let c = img.crop(&roi(2, 3, 6, 5)).unwrap();
        assert_eq!((c.width, c.height), (4, 2));
        assert_eq!(c.get(0, 0), img.get(2, 3));
        assert_eq!(c.get(3, 1), img.get(5, 4));
    }

    #[test]
    fn crop_touching_the_far_edge_is_in_bounds() {
        let img = ramp(10, 8);
        let c = img.crop(&roi(0, 0, 10, 8)).unwrap();
        assert_eq!(c, img);
    }

    #[test]
    fn crop_outside_frame_is_rejected() {
        let img = ramp(10, 8);
        for r in [roi(-1, 0, 5, 5), roi(0, 0, 11, 5), roi(3, 3, 5, 9)] {
            assert!(matches!(
                img.crop(&r),
                Err(CoreError::RoiOutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn paste_writes_back_only_the_rectangle() {
        let mut img = GrayImage::filled(6, 6, 10);
        let patch = GrayImage::filled(2, 3, 200);
        img.paste(&roi(1, 2, 3, 5), &patch).unwrap();
        assert_eq!(img.get(0, 2), 10);
        assert_eq!(img.get(1, 2), 200);
        assert_eq!(img.get(2, 4), 200);
        assert_eq!(img.get(3, 4), 10);
        assert_eq!(img.get(1, 5), 10);
        assert_eq!(img.data.iter().filter(|&&v| v == 200).count(), 6);
    }
}
