//! Frame-rate validation and time-base conversion.
//!
//! Every analysis stage works on a constant-frame-rate view of its input:
//! frame `i` sits at `i / fps` seconds. A rate that is missing, zero,
//! negative, non-finite, or above an optional ceiling is "undetermined".

use std::fmt;

/// A validated, strictly positive frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate(f64);

impl FrameRate {
    /// Validate a raw rate. `ceiling`, when set, rejects implausibly high rates.
    pub fn validate(raw: Option<f64>, ceiling: Option<f64>) -> Option<Self> {
        let fps = raw?;
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        if let Some(max) = ceiling {
            if fps > max {
                return None;
            }
        }
        Some(Self(fps))
    }

    /// Parse an ffprobe-style rational such as `30000/1001` or `25`.
    pub fn parse_rational(raw: &str) -> Option<f64> {
        let raw = raw.trim();
        match raw.split_once('/') {
            Some((num, den)) => {
                let num = num.trim().parse::<f64>().ok()?;
                let den = den.trim().parse::<f64>().ok()?;
                if den == 0.0 {
                    None
                } else {
                    Some(num / den)
                }
            }
            None => raw.parse::<f64>().ok(),
        }
    }

    pub fn fps(&self) -> f64 {
        self.0
    }

    /// Timestamp (seconds) of frame `index`.
    pub fn frame_time(&self, index: u64) -> f64 {
        index as f64 / self.0
    }

    /// Number of frames a clip of `duration_secs` is expected to hold.
    pub fn expected_frames(&self, duration_secs: f64) -> u64 {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return 0;
        }
        (duration_secs * self.0) as u64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} fps", self.0)
    }
}
