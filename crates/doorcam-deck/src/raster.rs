//! Bridges between `image` crate buffers and `doorcam-core` rasters.

use std::path::Path;

use doorcam_core::{GrayImage, RgbImage};

pub fn gray_from_image(img: &image::GrayImage) -> GrayImage {
    GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

pub fn rgb_from_image(img: &image::RgbImage) -> RgbImage {
    RgbImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// `None` if the dimensions do not fit `u32` or the buffer is inconsistent.
pub fn rgb_to_image(img: &RgbImage) -> Option<image::RgbImage> {
    let w = u32::try_from(img.width).ok()?;
    let h = u32::try_from(img.height).ok()?;
    image::RgbImage::from_raw(w, h, img.data.clone())
}

/// Decode any supported format into RGB8.
pub fn load_rgb(path: &Path) -> Result<RgbImage, image::ImageError> {
    Ok(rgb_from_image(&image::open(path)?.to_rgb8()))
}

/// Decode any supported format into 8-bit gray.
pub fn load_gray(path: &Path) -> Result<GrayImage, image::ImageError> {
    Ok(gray_from_image(&image::open(path)?.to_luma8()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_buffers_survive_conversion() {
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgb([9, 8, 7]));
        let core = rgb_from_image(&img);
        assert_eq!((core.width, core.height), (3, 2));
        assert_eq!(core.get(2, 1), [9, 8, 7]);
        assert_eq!(rgb_to_image(&core).unwrap(), img);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_rgb(Path::new("/definitely/not/here.jpg"));
        assert!(err.is_err());
    }

    #[test]
    fn gray_round_trip_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.png");
        let img = image::GrayImage::from_fn(4, 3, |x, y| image::Luma([(x * 10 + y) as u8]));
        img.save(&path).unwrap();
        let back = load_gray(&path).unwrap();
        assert_eq!(back.get(3, 2), 32);
    }
}
