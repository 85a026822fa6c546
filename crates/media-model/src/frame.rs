//! Decoded frames.

use image::GrayImage;

/// A single decoded frame, reduced to one intensity channel.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Presentation time in the time base of the clip being read (seconds).
    pub timestamp: f64,
    /// Intensity samples.
    pub image: GrayImage,
}

impl Frame {
    pub fn new(timestamp: f64, image: GrayImage) -> Self {
        Self { timestamp, image }
    }

    /// Wrap raw `gray` bytes as produced by a rawvideo decoder.
    /// Returns `None` when the buffer length does not match the dimensions.
    pub fn from_gray_bytes(timestamp: f64, width: u32, height: u32, bytes: Vec<u8>) -> Option<Self> {
        GrayImage::from_raw(width, height, bytes).map(|image| Self { timestamp, image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
