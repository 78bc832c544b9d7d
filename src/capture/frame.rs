//! Raw capture buffers and their conversion to decodable images.

use anyhow::{ensure, Context, Result};
use image::RgbaImage;

/// One RGBA frame pulled from the capture sink.
///
/// Hardware alignment may pad each buffer row past the logical width, so
/// `row_stride` can exceed `width * pixel_stride`; conversion crops rows to
/// the true requested width. Frames are owned for a single loop iteration
/// and dropped immediately after OCR.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes per pixel (RGBA8888 => 4).
    pub pixel_stride: usize,
    /// Bytes per buffer row, including any alignment padding.
    pub row_stride: usize,
}

impl CaptureFrame {
    /// An unpadded frame, rows exactly `width * 4` bytes.
    pub fn tight(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            pixel_stride: 4,
            row_stride: width as usize * 4,
        }
    }

    /// Decode into an image of exactly `width x height`, cropping row-stride
    /// padding.
    pub fn to_image(&self) -> Result<RgbaImage> {
        ensure!(self.pixel_stride == 4, "expected RGBA8888 pixel stride of 4");
        let logical_row = self.width as usize * self.pixel_stride;
        ensure!(
            self.row_stride >= logical_row,
            "row stride {} smaller than logical row {}",
            self.row_stride,
            logical_row
        );
        ensure!(
            self.data.len() >= self.row_stride * self.height as usize,
            "frame buffer too small: {} bytes for {}x{} stride {}",
            self.data.len(),
            self.width,
            self.height,
            self.row_stride
        );

        let mut pixels = Vec::with_capacity(logical_row * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * self.row_stride;
            pixels.extend_from_slice(&self.data[start..start + logical_row]);
        }
        RgbaImage::from_raw(self.width, self.height, pixels)
            .context("failed to assemble image from frame buffer")
    }
}
