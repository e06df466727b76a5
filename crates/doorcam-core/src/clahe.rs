//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a `grid x grid` tiling. Each tile gets its own
//! clipped-histogram equalization LUT, and every output pixel blends the LUTs
//! of the four nearest tile centers bilinearly so tile seams do not show.
//! Images whose size is not a multiple of the grid are padded on the
//! right/bottom (reflect-101) for LUT estimation only.

use crate::blur::reflect101;
use crate::{CoreError, GrayImage};

const BINS: usize = 256;

/// Reject parameters CLAHE cannot work with.
pub fn validate_clahe_params(clip_limit: f32, grid: u32) -> Result<(), CoreError> {
    if !clip_limit.is_finite() || clip_limit <= 0.0 {
        return Err(CoreError::InvalidClipLimit(clip_limit));
    }
    if grid < 2 {
        return Err(CoreError::InvalidGridSize(grid));
    }
    Ok(())
}

/// Equalize `img` with tile-wise clipped histograms.
pub fn clahe(img: &GrayImage, clip_limit: f32, grid: u32) -> Result<GrayImage, CoreError> {
    validate_clahe_params(clip_limit, grid)?;
    if img.is_empty() {
        return Err(CoreError::EmptyImage {
            width: img.width,
            height: img.height,
        });
    }
    let tiles = grid as usize;
    let padded = pad_to_multiple(img, tiles);
    let tile_w = padded.width / tiles;
    let tile_h = padded.height / tiles;
    let luts = tile_luts(&padded, tiles, tile_w, tile_h, clip_limit);
    Ok(interpolate(img, &luts, tiles, tile_w, tile_h))
}

fn pad_to_multiple(img: &GrayImage, tiles: usize) -> GrayImage {
    let pad = |n: usize| if n % tiles == 0 { n } else { n + tiles - n % tiles };
    let (pw, ph) = (pad(img.width), pad(img.height));
    if pw == img.width && ph == img.height {
        return img.clone();
    }
    let mut data = Vec::with_capacity(pw * ph);
    for y in 0..ph {
        let sy = reflect101(y as isize, img.height);
        for x in 0..pw {
            let sx = reflect101(x as isize, img.width);
            data.push(img.get(sx, sy));
        }
    }
    GrayImage {
        width: pw,
        height: ph,
        data,
    }
}

/// One 256-entry LUT per tile, row-major over the tile grid.
fn tile_luts(
    padded: &GrayImage,
    tiles: usize,
    tile_w: usize,
    tile_h: usize,
    clip_limit: f32,
) -> Vec<[u8; BINS]> {
    let area = tile_w * tile_h;
    let clip = ((clip_limit as f64 * area as f64 / BINS as f64) as u32).max(1);
    let lut_scale = (BINS - 1) as f64 / area as f64;

    let mut luts = Vec::with_capacity(tiles * tiles);
    for ty in 0..tiles {
        for tx in 0..tiles {
            let mut hist = [0u32; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let row = &padded.data[y * padded.width + tx * tile_w..][..tile_w];
                for &v in row {
                    hist[v as usize] += 1;
                }
            }
            clip_histogram(&mut hist, clip);

            let mut lut = [0u8; BINS];
            let mut sum = 0u32;
            for (bin, &count) in hist.iter().enumerate() {
                sum += count;
                lut[bin] = (sum as f64 * lut_scale).round().clamp(0.0, 255.0) as u8;
            }
            luts.push(lut);
        }
    }
    luts
}

/// Clamp bins at `clip` and hand the excess back evenly; the remainder goes
/// one count at a time to bins spaced `BINS / remainder` apart.
fn clip_histogram(hist: &mut [u32; BINS], clip: u32) {
    let mut clipped = 0u32;
    for h in hist.iter_mut() {
        if *h > clip {
            clipped += *h - clip;
            *h = clip;
        }
    }
    let batch = clipped / BINS as u32;
    let mut residual = clipped - batch * BINS as u32;
    for h in hist.iter_mut() {
        *h += batch;
    }
    if residual > 0 {
        let step = (BINS / residual as usize).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

fn interpolate(
    img: &GrayImage,
    luts: &[[u8; BINS]],
    tiles: usize,
    tile_w: usize,
    tile_h: usize,
) -> GrayImage {
    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    let last = tiles as isize - 1;

    // Column neighbours and weights do not depend on the row.
    let cols: Vec<(usize, usize, f32)> = (0..img.width)
        .map(|x| {
            let txf = x as f32 * inv_tw - 0.5;
            let tx1 = txf.floor() as isize;
            let xa = txf - tx1 as f32;
            (tx1.max(0) as usize, (tx1 + 1).min(last) as usize, xa)
        })
        .collect();

    let mut out = vec![0u8; img.width * img.height];
    for y in 0..img.height {
        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor() as isize;
        let ya = tyf - ty1 as f32;
        let ty2 = (ty1 + 1).min(last) as usize;
        let ty1 = ty1.max(0) as usize;

        for (x, &(tx1, tx2, xa)) in cols.iter().enumerate() {
            let v = img.get(x, y) as usize;
            let top = luts[ty1 * tiles + tx1][v] as f32 * (1.0 - xa)
                + luts[ty1 * tiles + tx2][v] as f32 * xa;
            let bottom = luts[ty2 * tiles + tx1][v] as f32 * (1.0 - xa)
                + luts[ty2 * tiles + tx2][v] as f32 * xa;
            out[y * img.width + x] = (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage {
        width: img.width,
        height: img.height,
        data: out,
    }
}
