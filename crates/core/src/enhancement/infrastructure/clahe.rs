//! Contrast-limited adaptive histogram equalization on a single 8-bit plane.
//!
//! The plane is split into a grid of tiles. Each tile gets its own
//! equalization lookup table built from a clipped histogram, and every
//! pixel is remapped by bilinear interpolation between the tables of the
//! four nearest tile centres, which hides tile seams.

const BINS: usize = 256;

/// Equalizes `plane` (`width x height`, one byte per pixel).
///
/// `clip_limit` is relative to a flat histogram: a bin may hold at most
/// `clip_limit * tile_pixels / 256` counts before the excess is spread
/// over all bins. `grid` is the number of tiles per axis, reduced for
/// planes smaller than the grid.
pub fn equalize(plane: &[u8], width: usize, height: usize, clip_limit: f64, grid: usize) -> Vec<u8> {
    if width == 0 || height == 0 || grid == 0 {
        return plane.to_vec();
    }
    debug_assert_eq!(plane.len(), width * height);

    let tiles = TileGrid::new(width, height, grid);
    let luts: Vec<[u8; BINS]> = (0..tiles.rows)
        .flat_map(|ty| (0..tiles.cols).map(move |tx| (tx, ty)))
        .map(|(tx, ty)| tile_lut(plane, width, &tiles.bounds(tx, ty), clip_limit))
        .collect();

    let mut out = vec![0u8; plane.len()];
    for y in 0..height {
        let (ty0, ty1, wy) = tiles.neighbours(y, tiles.tile_h, tiles.rows);
        for x in 0..width {
            let (tx0, tx1, wx) = tiles.neighbours(x, tiles.tile_w, tiles.cols);
            let v = plane[y * width + x] as usize;
            let at = |tx: usize, ty: usize| luts[ty * tiles.cols + tx][v] as f64;

            let top = at(tx0, ty0) * (1.0 - wx) + at(tx1, ty0) * wx;
            let bottom = at(tx0, ty1) * (1.0 - wx) + at(tx1, ty1) * wx;
            let value = top * (1.0 - wy) + bottom * wy;
            out[y * width + x] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

struct TileGrid {
    width: usize,
    height: usize,
    tile_w: usize,
    tile_h: usize,
    cols: usize,
    rows: usize,
}

struct TileBounds {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl TileGrid {
    fn new(width: usize, height: usize, grid: usize) -> Self {
        let tile_w = width.div_ceil(grid.min(width));
        let tile_h = height.div_ceil(grid.min(height));
        Self {
            width,
            height,
            tile_w,
            tile_h,
            cols: width.div_ceil(tile_w),
            rows: height.div_ceil(tile_h),
        }
    }

    fn bounds(&self, tx: usize, ty: usize) -> TileBounds {
        TileBounds {
            x0: tx * self.tile_w,
            y0: ty * self.tile_h,
            x1: ((tx + 1) * self.tile_w).min(self.width),
            y1: ((ty + 1) * self.tile_h).min(self.height),
        }
    }

    /// Tiles whose centres bracket `pos` along one axis, and the weight of
    /// the second one.
    fn neighbours(&self, pos: usize, tile_len: usize, count: usize) -> (usize, usize, f64) {
        let f = (pos as f64 + 0.5) / tile_len as f64 - 0.5;
        if f <= 0.0 {
            return (0, 0, 0.0);
        }
        let t0 = f.floor() as usize;
        if t0 + 1 >= count {
            return (count - 1, count - 1, 0.0);
        }
        (t0, t0 + 1, f - t0 as f64)
    }
}

fn tile_lut(plane: &[u8], width: usize, b: &TileBounds, clip_limit: f64) -> [u8; BINS] {
    let mut hist = [0u32; BINS];
    for y in b.y0..b.y1 {
        for &v in &plane[y * width + b.x0..y * width + b.x1] {
            hist[v as usize] += 1;
        }
    }
    let pixels = ((b.x1 - b.x0) * (b.y1 - b.y0)) as u32;

    if clip_limit > 0.0 {
        let clip = ((clip_limit * pixels as f64 / BINS as f64) as u32).max(1);
        clip_histogram(&mut hist, clip);
    }

    let scale = 255.0 / pixels.max(1) as f64;
    let mut lut = [0u8; BINS];
    let mut cdf = 0u32;
    for (slot, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *slot = (cdf as f64 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Caps every bin at `clip` and spreads the excess evenly, handing the
/// remainder out at a regular stride so no intensity range is favoured.
fn clip_histogram(hist: &mut [u32; BINS], clip: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    if excess == 0 {
        return;
    }

    let per_bin = excess / BINS as u32;
    let residual = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if residual > 0 {
        let stride = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(stride).take(residual) {
            *bin += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(plane: &[u8]) -> u8 {
        plane.iter().max().unwrap() - plane.iter().min().unwrap()
    }

    #[test]
    fn test_uniform_plane_stays_uniform() {
        let plane = vec![90u8; 32 * 24];
        let out = equalize(&plane, 32, 24, 2.0, 8);
        assert!(out.iter().all(|&v| v == out[0]));
    }

    #[test]
    fn test_low_contrast_is_stretched() {
        // Horizontal ramp confined to 100..=163.
        let (w, h) = (256, 256);
        let plane: Vec<u8> = (0..w * h).map(|i| 100 + ((i % w) / 4) as u8).collect();
        let out = equalize(&plane, w, h, 2.0, 2);
        assert!(range(&out) > range(&plane));
    }

    #[test]
    fn test_preserves_ordering_within_a_tile() {
        // Single tile: equalization is a monotone remap.
        let plane: Vec<u8> = (0..16u8).map(|v| v * 10).collect();
        let out = equalize(&plane, 4, 4, 2.0, 1);
        for pair in out.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_plane_smaller_than_grid() {
        let plane = vec![10u8, 200, 30, 150, 90, 60];
        let out = equalize(&plane, 3, 2, 2.0, 8);
        assert_eq!(out.len(), plane.len());
    }

    #[test]
    fn test_empty_plane() {
        assert!(equalize(&[], 0, 0, 2.0, 8).is_empty());
    }

    #[test]
    fn test_clip_histogram_conserves_mass() {
        let mut hist = [0u32; BINS];
        hist[42] = 1000;
        hist[7] = 3;
        clip_histogram(&mut hist, 8);
        assert_eq!(hist.iter().sum::<u32>(), 1003);
        assert!(hist[42] <= 8 + 1000 / 256 + 1);
    }
}
