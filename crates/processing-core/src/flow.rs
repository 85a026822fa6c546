//! Dense optical flow: pyramidal, iterative Lucas–Kanade.
//!
//! Estimates one displacement vector per pixel between two intensity
//! frames.
//!
//! # Algorithm
//!
//! 1. **Pyramid**: downscale both frames by `pyramid_scale` per level.
//! 2. **Coarse to fine**: start with zero flow at the coarsest level. Before
//!    each finer level, upsample the flow and rescale it.
//! 3. **Refine**: per iteration, warp the next frame by the current flow and
//!    take the temporal difference. Solve the 2×2 Lucas–Kanade system over a
//!    `window`×`window` neighbourhood around every pixel. Window sums come
//!    from integral images, so each iteration is linear in the pixel count.
//!
//! Pixels whose structure tensor is near-singular (flat or purely 1-D
//! texture) keep their current estimate.

use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Minimum smaller eigenvalue of the per-pixel structure tensor, per window
/// pixel, below which the LK system is treated as unsolvable.
const MIN_EIGEN_PER_PIXEL: f64 = 1e-2;

/// Coarsest pyramid level keeps at least this many pixels per side.
const MIN_LEVEL_SIDE: u32 = 16;

/// A 3×3 Sobel response is eight times the central-difference derivative.
const SOBEL_NORM: f32 = 1.0 / 8.0;

/// Flow estimation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowParams {
    /// Scale between successive pyramid levels, in `(0, 1)`.
    pub pyramid_scale: f64,
    /// Number of pyramid levels including full resolution.
    pub levels: u32,
    /// Averaging window side length (odd).
    pub window: u32,
    /// Refinement iterations per level.
    pub iterations: u32,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            pyramid_scale: 0.5,
            levels: 3,
            window: 15,
            iterations: 3,
        }
    }
}

/// Per-pixel displacement field, in pixels.
#[derive(Debug, Clone)]
pub struct FlowField {
    width: u32,
    height: u32,
    dx: Vec<f32>,
    dy: Vec<f32>,
}

impl FlowField {
    pub fn zeros(width: u32, height: u32) -> Self {
        let n = (width as usize) * (height as usize);
        Self {
            width,
            height,
            dx: vec![0.0; n],
            dy: vec![0.0; n],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[cfg(test)]
    fn at(&self, x: u32, y: u32) -> Option<(f32, f32)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize) * (self.width as usize) + x as usize;
        Some((self.dx[i], self.dy[i]))
    }

    /// Euclidean length of every vector, row-major.
    pub fn magnitudes(&self) -> Vec<f64> {
        self.dx
            .iter()
            .zip(&self.dy)
            .map(|(u, v)| f64::from(u.hypot(*v)))
            .collect()
    }

    /// Bilinearly resample to `width`×`height`, scaling vectors to match.
    fn upsampled(&self, width: u32, height: u32) -> FlowField {
        let mut out = FlowField::zeros(width, height);
        if self.width == 0 || self.height == 0 {
            return out;
        }
        let sx = self.width as f32 / width as f32;
        let sy = self.height as f32 / height as f32;
        let du = Plane::from_vec(self.width, self.height, self.dx.clone());
        let dv = Plane::from_vec(self.width, self.height, self.dy.clone());
        for y in 0..height {
            for x in 0..width {
                let cx = (x as f32 + 0.5) * sx - 0.5;
                let cy = (y as f32 + 0.5) * sy - 0.5;
                let i = (y as usize) * (width as usize) + x as usize;
                out.dx[i] = du.sample(cx, cy) / sx;
                out.dy[i] = dv.sample(cx, cy) / sy;
            }
        }
        out
    }
}

/// Estimate dense flow from `prev` to `next`.
///
/// Both frames must share dimensions. Mismatched or empty frames yield a
/// zero field sized to `prev`.
pub fn dense_flow(prev: &GrayImage, next: &GrayImage, params: &FlowParams) -> FlowField {
    if prev.dimensions() != next.dimensions() || prev.width() == 0 || prev.height() == 0 {
        return FlowField::zeros(prev.width(), prev.height());
    }

    let prev_pyramid = build_pyramid(prev, params);
    let next_pyramid = build_pyramid(next, params);

    let mut flow: Option<FlowField> = None;
    for (prev_level, next_level) in prev_pyramid.iter().zip(&next_pyramid).rev() {
        let (w, h) = prev_level.dimensions();
        let mut level_flow = match flow.take() {
            Some(coarse) => coarse.upsampled(w, h),
            None => FlowField::zeros(w, h),
        };
        refine_level(prev_level, next_level, &mut level_flow, params);
        flow = Some(level_flow);
    }

    flow.unwrap_or_else(|| FlowField::zeros(prev.width(), prev.height()))
}

/// Level 0 is full resolution; later levels are progressively smaller.
fn build_pyramid(image: &GrayImage, params: &FlowParams) -> Vec<GrayImage> {
    let mut levels = vec![image.clone()];
    let scale = params.pyramid_scale.clamp(0.05, 0.95);
    for level in 1..params.levels.max(1) {
        let factor = scale.powi(level as i32);
        let w = (f64::from(image.width()) * factor).round() as u32;
        let h = (f64::from(image.height()) * factor).round() as u32;
        if w < MIN_LEVEL_SIDE || h < MIN_LEVEL_SIDE {
            break;
        }
        levels.push(imageops::resize(image, w, h, FilterType::Triangle));
    }
    levels
}

fn refine_level(prev: &GrayImage, next: &GrayImage, flow: &mut FlowField, params: &FlowParams) {
    let (w, h) = prev.dimensions();
    let width = w as usize;
    let radius = (params.window.max(3) / 2) as usize;

    let ix: Vec<f32> = horizontal_sobel(prev)
        .as_raw()
        .iter()
        .map(|g| f32::from(*g) * SOBEL_NORM)
        .collect();
    let iy: Vec<f32> = vertical_sobel(prev)
        .as_raw()
        .iter()
        .map(|g| f32::from(*g) * SOBEL_NORM)
        .collect();
    let base = Plane::from_image(prev);
    let target = Plane::from_image(next);

    // The structure tensor depends only on `prev`, so it is shared by all iterations.
    let ixx = Integral::from_fn(w, h, |i| f64::from(ix[i] * ix[i]));
    let ixy = Integral::from_fn(w, h, |i| f64::from(ix[i] * iy[i]));
    let iyy = Integral::from_fn(w, h, |i| f64::from(iy[i] * iy[i]));

    let mut it = vec![0.0f32; width * h as usize];
    for _ in 0..params.iterations.max(1) {
        for y in 0..h as usize {
            for x in 0..width {
                let i = y * width + x;
                let warped = target.sample(x as f32 + flow.dx[i], y as f32 + flow.dy[i]);
                it[i] = warped - base.data[i];
            }
        }
        let ixt = Integral::from_fn(w, h, |i| f64::from(ix[i] * it[i]));
        let iyt = Integral::from_fn(w, h, |i| f64::from(iy[i] * it[i]));

        for y in 0..h as usize {
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius + 1).min(h as usize);
            for x in 0..width {
                let x0 = x.saturating_sub(radius);
                let x1 = (x + radius + 1).min(width);
                let area = ((x1 - x0) * (y1 - y0)) as f64;

                let a = ixx.sum(x0, y0, x1, y1);
                let b = ixy.sum(x0, y0, x1, y1);
                let c = iyy.sum(x0, y0, x1, y1);
                let half_trace = (a + c) / 2.0;
                let spread = (((a - c) / 2.0).powi(2) + b * b).sqrt();
                if half_trace - spread < MIN_EIGEN_PER_PIXEL * area {
                    continue;
                }

                let det = a * c - b * b;
                let ex = ixt.sum(x0, y0, x1, y1);
                let ey = iyt.sum(x0, y0, x1, y1);
                let du = (-c * ex + b * ey) / det;
                let dv = (b * ex - a * ey) / det;

                let limit = radius as f64;
                let i = y * width + x;
                flow.dx[i] += du.clamp(-limit, limit) as f32;
                flow.dy[i] += dv.clamp(-limit, limit) as f32;
            }
        }
    }
}

/// Single-channel float image with clamped bilinear sampling.
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    fn from_image(image: &GrayImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            data: image.as_raw().iter().map(|p| f32::from(*p)).collect(),
        }
    }

    fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Self {
        Self {
            width: width as usize,
            height: height as usize,
            data,
        }
    }

    fn at(&self, x: isize, y: isize) -> f32 {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.data[y * self.width + x]
    }

    fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as isize, y0 as isize);
        let top = self.at(xi, yi) * (1.0 - fx) + self.at(xi + 1, yi) * fx;
        let bottom = self.at(xi, yi + 1) * (1.0 - fx) + self.at(xi + 1, yi + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Summed-area table for O(1) window sums.
struct Integral {
    stride: usize,
    data: Vec<f64>,
}

impl Integral {
    fn from_fn(width: u32, height: u32, value: impl Fn(usize) -> f64) -> Self {
        let (w, h) = (width as usize, height as usize);
        let stride = w + 1;
        let mut data = vec![0.0; stride * (h + 1)];
        for y in 0..h {
            let mut row = 0.0;
            for x in 0..w {
                row += value(y * w + x);
                data[(y + 1) * stride + x + 1] = data[y * stride + x + 1] + row;
            }
        }
        Self { stride, data }
    }

    /// Sum over `[x0, x1) × [y0, y1)`.
    fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let s = self.stride;
        self.data[y1 * s + x1] - self.data[y0 * s + x1] - self.data[y1 * s + x0]
            + self.data[y0 * s + x0]
    }
}
