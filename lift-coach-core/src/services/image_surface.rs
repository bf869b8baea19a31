use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::services::skeleton_renderer::RenderSurface;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Overlay surface backed by an in-memory RGBA image
#[derive(Debug, Clone)]
pub struct ImageSurface {
    canvas: RgbaImage,
}

impl ImageSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Blend the overlay over a video frame resized to the surface
    pub fn composite_over(&self, frame: &RgbaImage) -> RgbaImage {
        let (width, height) = self.canvas.dimensions();
        let mut base = if frame.dimensions() == (width, height) {
            frame.clone()
        } else {
            imageops::resize(frame, width, height, imageops::FilterType::Triangle)
        };
        imageops::overlay(&mut base, &self.canvas, 0, 0);
        base
    }

    /// Write the overlay alone as PNG
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.canvas
            .save(path)
            .with_context(|| format!("Failed to write overlay {}", path.display()))
    }

    /// Write the overlay composited over a frame as PNG
    pub fn save_composite(&self, frame: &RgbaImage, path: &Path) -> Result<()> {
        self.composite_over(frame)
            .save(path)
            .with_context(|| format!("Failed to write overlay {}", path.display()))
    }

    /// Number of non-transparent pixels
    pub fn painted_pixels(&self) -> usize {
        self.canvas.pixels().filter(|p| p.0[3] > 0).count()
    }
}

impl RenderSurface for ImageSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.canvas = RgbaImage::from_pixel(width, height, TRANSPARENT);
    }

    fn size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba<u8>) {
        let center = (center.0.round() as i32, center.1.round() as i32);
        draw_filled_circle_mut(&mut self.canvas, center, radius.round() as i32, color);
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba<u8>) {
        // Thick lines as parallel one-pixel segments
        let half = (width / 2.0).floor() as i32;
        for offset in -half..=half.max(0) {
            let offset = offset as f32;
            draw_line_segment_mut(
                &mut self.canvas,
                (from.0 + offset, from.1),
                (to.0 + offset, to.1),
                color,
            );
            draw_line_segment_mut(
                &mut self.canvas,
                (from.0, from.1 + offset),
                (to.0, to.1 + offset),
                color,
            );
        }
    }
}
