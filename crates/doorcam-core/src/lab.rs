//! 8-bit CIE L*a*b* split of an RGB frame.
//!
//! Encoding follows the usual 8-bit convention: `L` scaled from `0..100` to
//! `0..255`, `a`/`b` offset by 128. White point D65, sRGB transfer curve.
//! The `l` plane is the luminance channel used for matching and statistics.

use std::sync::OnceLock;

use crate::{GrayImage, RgbImage};

const XN: f32 = 0.950_456;
const ZN: f32 = 1.088_754;
const EPS: f32 = 0.008_856;
const KAPPA: f32 = 903.3;

/// Planar L*a*b* image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabImage {
    pub l: GrayImage,
    pub a: GrayImage,
    pub b: GrayImage,
}

impl LabImage {
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let n = rgb.width * rgb.height;
        let mut l = Vec::with_capacity(n);
        let mut a = Vec::with_capacity(n);
        let mut b = Vec::with_capacity(n);
        let lut = srgb_to_linear_lut();
        for px in rgb.data.chunks_exact(3) {
            let [lv, av, bv] = rgb_to_lab(lut, [px[0], px[1], px[2]]);
            l.push(lv);
            a.push(av);
            b.push(bv);
        }
        let plane = |data| GrayImage {
            width: rgb.width,
            height: rgb.height,
            data,
        };
        Self {
            l: plane(l),
            a: plane(a),
            b: plane(b),
        }
    }

    /// Recombine the three planes into RGB.
    pub fn to_rgb(&self) -> RgbImage {
        let mut data = Vec::with_capacity(self.l.data.len() * 3);
        for ((&l, &a), &b) in self.l.data.iter().zip(&self.a.data).zip(&self.b.data) {
            data.extend_from_slice(&lab_to_rgb([l, a, b]));
        }
        RgbImage {
            width: self.l.width,
            height: self.l.height,
            data,
        }
    }

    /// Same chroma planes, different luminance.
    pub fn with_luminance(&self, l: GrayImage) -> Self {
        Self {
            l,
            a: self.a.clone(),
            b: self.b.clone(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.l.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.l.height
    }
}

fn srgb_to_linear_lut() -> &'static [f32; 256] {
    static LUT: OnceLock<[f32; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        let mut lut = [0.0f32; 256];
        for (i, v) in lut.iter_mut().enumerate() {
            let c = i as f32 / 255.0;
            *v = if c <= 0.040_45 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            };
        }
        lut
    })
}

#[inline]
fn linear_to_srgb_u8(v: f32) -> u8 {
    let c = if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > EPS {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f32) -> f32 {
    let t = f * f * f;
    if t > EPS {
        t
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

fn rgb_to_lab(lut: &[f32; 256], [r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (lut[r as usize], lut[g as usize], lut[b as usize]);
    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / XN;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / ZN;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > EPS { 116.0 * fy - 16.0 } else { KAPPA * y };
    let a = 500.0 * (fx - fy) + 128.0;
    let bb = 200.0 * (fy - fz) + 128.0;

    [
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        a.round().clamp(0.0, 255.0) as u8,
        bb.round().clamp(0.0, 255.0) as u8,
    ]
}

fn lab_to_rgb([l, a, b]: [u8; 3]) -> [u8; 3] {
    let l = l as f32 * 100.0 / 255.0;
    let a = a as f32 - 128.0;
    let b = b as f32 - 128.0;

    let y = if l <= KAPPA * EPS {
        l / KAPPA
    } else {
        let fy = (l + 16.0) / 116.0;
        fy * fy * fy
    };
    let fy = lab_f(y);
    let x = lab_f_inv(fy + a / 500.0) * XN;
    let z = lab_f_inv(fy - b / 200.0) * ZN;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    [
        linear_to_srgb_u8(r.max(0.0)),
        linear_to_srgb_u8(g.max(0.0)),
        linear_to_srgb_u8(bl.max(0.0)),
    ]
}
