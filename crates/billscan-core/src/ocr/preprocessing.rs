//! Image preprocessing for receipt OCR.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use tracing::debug;

use crate::models::config::OcrConfig;

/// Prepares receipt photos for recognition: grayscale, bounded size and
/// optional binarization.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Longer side is scaled down to this.
    max_size: u32,
    /// Longer side is scaled up to this.
    min_size: u32,
    /// Apply adaptive thresholding.
    binarize: bool,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            max_size: 2500,
            min_size: 1000,
            binarize: false,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new()
            .with_max_size(config.max_image_size)
            .with_min_size(config.min_image_size)
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size.max(1);
        self
    }

    /// Set minimum image dimension.
    pub fn with_min_size(mut self, size: u32) -> Self {
        self.min_size = size;
        self
    }

    /// Enable adaptive thresholding.
    pub fn with_binarization(mut self, binarize: bool) -> Self {
        self.binarize = binarize;
        self
    }

    /// Produce the grayscale image handed to the OCR engine.
    pub fn prepare(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = self.calculate_resize_dimensions(width, height);

        let resized = if (new_width, new_height) == (width, height) {
            image.clone()
        } else {
            debug!(
                "Resizing receipt image {}x{} -> {}x{}",
                width, height, new_width, new_height
            );
            image.resize_exact(new_width, new_height, FilterType::Lanczos3)
        };

        let gray = resized.to_luma8();
        let gray = if self.binarize {
            adaptive_threshold(&gray, 31, 10)
        } else {
            gray
        };

        DynamicImage::ImageLuma8(gray)
    }

    fn calculate_resize_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let max_dim = width.max(height);
        if max_dim == 0 {
            return (width, height);
        }

        let target = if max_dim > self.max_size {
            self.max_size
        } else if max_dim < self.min_size {
            self.min_size.min(self.max_size)
        } else {
            return (width, height);
        };

        let scale = target as f32 / max_dim as f32;
        let new_width = (width as f32 * scale).round() as u32;
        let new_height = (height as f32 * scale).round() as u32;

        (new_width.max(1), new_height.max(1))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Local-mean thresholding using an integral image.
fn adaptive_threshold(image: &GrayImage, block_size: u32, c: i64) -> GrayImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * (w + 1) + x + 1] = integral[y * (w + 1) + x + 1] + row_sum;
        }
    }

    let half = (block_size / 2) as usize;
    let mut result = GrayImage::new(width, height);

    for y in 0..h {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half + 1).min(w);

            let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + x1]
                - integral[y1 * (w + 1) + x0];
            let count = ((y1 - y0) * (x1 - x0)) as u64;
            let threshold = (sum / count) as i64 - c;

            let pixel = image.get_pixel(x as u32, y as u32)[0] as i64;
            let output = if pixel > threshold { 255 } else { 0 };
            result.put_pixel(x as u32, y as u32, Luma([output]));
        }
    }

    result
}
