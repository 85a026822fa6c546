//! Sharpness metric: variance of the Laplacian.
//!
//! In-focus frames have strong second-derivative edge responses, so the
//! Laplacian varies widely across the frame. Blurred or motion-smeared
//! frames have flat responses and a low variance.

use image::GrayImage;
use imageproc::filter::laplacian_filter;

/// Variance of the 3×3 Laplacian response over the whole frame.
///
/// Pure function of pixel data. Empty images score `0.0`.
///
/// Pixels outside the frame repeat the nearest edge pixel. OpenCV's
/// `Laplacian` reflects instead (`BORDER_REFLECT_101`), so scores near the
/// frame border differ slightly from OpenCV-calibrated blur thresholds.
pub fn laplacian_variance(image: &GrayImage) -> f64 {
    let response = laplacian_filter(image);
    let n = response.as_raw().len();
    if n == 0 {
        return 0.0;
    }

    let (sum, sum_sq) = response
        .as_raw()
        .iter()
        .fold((0.0f64, 0.0f64), |(s, sq), v| {
            let v = f64::from(*v);
            (s + v, sq + v * v)
        });
    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0)
}
