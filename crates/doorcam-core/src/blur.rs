//! Separable Gaussian smoothing.

use crate::{CoreError, GrayImage};

/// Map an out-of-range index back inside `0..n` by mirroring around the edge
/// pixels without repeating them (`dcb|abcd|cba`).
#[inline]
pub(crate) fn reflect101(mut i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// 1-D Gaussian weights for an odd `ksize`, summing to one.
///
/// Small kernels use the classic binomial-like tables; larger ones derive
/// sigma from the size as `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(ksize: u32) -> Result<Vec<f32>, CoreError> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(CoreError::InvalidKernelSize(ksize));
    }
    let fixed: Option<&[f32]> = match ksize {
        1 => Some(&[1.0]),
        3 => Some(&[0.25, 0.5, 0.25]),
        5 => Some(&[0.0625, 0.25, 0.375, 0.25, 0.0625]),
        7 => Some(&[
            0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
        ]),
        _ => None,
    };
    if let Some(k) = fixed {
        return Ok(k.to_vec());
    }

    let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (ksize / 2) as i64;
    let scale = -0.5 / (sigma * sigma);
    let raw: Vec<f64> = (-half..=half)
        .map(|i| (scale * (i * i) as f64).exp())
        .collect();
    let sum: f64 = raw.iter().sum();
    Ok(raw.into_iter().map(|v| (v / sum) as f32).collect())
}

/// Blur `img` with a `ksize x ksize` Gaussian (horizontal then vertical pass).
pub fn gaussian_blur(img: &GrayImage, ksize: u32) -> Result<GrayImage, CoreError> {
    let kernel = gaussian_kernel(ksize)?;
    if ksize == 1 || img.is_empty() {
        return Ok(img.clone());
    }
    let (w, h) = (img.width, img.height);
    let half = (kernel.len() / 2) as isize;

    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &img.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &wt) in kernel.iter().enumerate() {
                let sx = reflect101(x as isize + k as isize - half, w);
                acc += wt * row[sx] as f32;
            }
            tmp[y * w + x] = acc;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &wt) in kernel.iter().enumerate() {
                let sy = reflect101(y as isize + k as isize - half, h);
                acc += wt * tmp[sy * w + x];
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    Ok(GrayImage {
        width: w,
        height: h,
        data: out,
    })
}
