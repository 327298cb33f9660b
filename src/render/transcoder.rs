use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::render::glyph::{self, GlyphCell, GlyphFrame};
use crate::render::palette::{ColorMode, ColorQuantizer};
use crate::video::types::Frame;

/// Turns raw decoded frames into glyph grids of a fixed size.
///
/// The grid dimensions are captured once per session from the terminal, and
/// every produced [`GlyphFrame`] matches them exactly: source frames of any
/// resolution are force-fit with a nearest-neighbor resize. Blurring filters
/// are deliberately avoided since block-shaped artifacts read better as
/// discrete glyphs than averaged gradients.
#[derive(Debug, Clone, Copy)]
pub struct FrameTranscoder {
    rows: u16,
    cols: u16,
    mode: ColorMode,
}

impl FrameTranscoder {
    pub fn new(rows: u16, cols: u16, mode: ColorMode) -> Self {
        Self { rows, cols, mode }
    }

    pub fn grid(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Transcode a raw frame: resize to the grid, then map every cell.
    pub fn transcode(&self, frame: &Frame, quantizer: &mut ColorQuantizer) -> GlyphFrame {
        let resized = imageops::resize(
            frame.as_image(),
            self.cols as u32,
            self.rows as u32,
            FilterType::Nearest,
        );
        self.map_cells(&resized, quantizer)
    }

    /// Transcode an image that was already resized at cache-build time.
    ///
    /// If the cached dimensions no longer match the grid (the terminal was
    /// resized between sessions) the image is force-fit again.
    pub fn transcode_preresized(
        &self,
        image: &RgbImage,
        quantizer: &mut ColorQuantizer,
    ) -> GlyphFrame {
        if image.dimensions() != (self.cols as u32, self.rows as u32) {
            let resized = imageops::resize(
                image,
                self.cols as u32,
                self.rows as u32,
                FilterType::Nearest,
            );
            return self.map_cells(&resized, quantizer);
        }
        self.map_cells(image, quantizer)
    }

    /// Character shape and color are chosen by two independent signals from
    /// the same pixel: luminance picks the glyph, the raw RGB picks the paint.
    fn map_cells(&self, image: &RgbImage, quantizer: &mut ColorQuantizer) -> GlyphFrame {
        let mut cells = Vec::with_capacity(self.rows as usize * self.cols as usize);

        for y in 0..self.rows as u32 {
            for x in 0..self.cols as u32 {
                let [r, g, b] = image.get_pixel(x, y).0;
                let ch = glyph::char_for(luminance(r, g, b));

                let paint = match self.mode {
                    ColorMode::Mono => None,
                    ColorMode::Extended | ColorMode::Basic => {
                        let key = quantizer.quantize(r, g, b);
                        Some(quantizer.paint_handle_for(key, None))
                    }
                };

                cells.push(GlyphCell { ch, paint });
            }
        }

        GlyphFrame::from_cells(self.rows, self.cols, cells)
    }
}

/// Weighted channel sum, the usual single-channel conversion.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}
