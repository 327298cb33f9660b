//! # Glyph Rendering Module
//!
//! Turns decoded video frames into terminal-displayable glyph grids and paints
//! them. Three cooperating pieces:
//!
//! - [`glyph`] - the luminance-to-character mapping and the grid data model
//! - [`palette`] - RGB quantization and the bounded paint cache
//! - [`transcoder`] - the per-frame resize + cell mapping pipeline
//!
//! The [`GridRenderer`] trait is the boundary the playback scheduler draws
//! through; [`TerminalRenderer`] is the crossterm-backed production
//! implementation.

pub mod glyph;
pub mod palette;
pub mod terminal;
pub mod transcoder;

pub use glyph::{GlyphCell, GlyphFrame};
pub use palette::{ColorMode, ColorQuantizer, PaintCache, PaintHandle, PalettePolicy};
pub use terminal::TerminalRenderer;
pub use transcoder::FrameTranscoder;

use crate::error::Result;

/// Paints glyph grids and overlay text onto some display surface.
pub trait GridRenderer {
    /// Current grid size as (rows, cols). Queried before each transcode batch
    /// since the terminal size may differ between sessions.
    fn grid_size(&self) -> Result<(u16, u16)>;

    /// Paint a full glyph grid.
    fn paint_grid(&mut self, frame: &GlyphFrame) -> Result<()>;

    /// Paint overlay text (debug counters, captions) at a grid position.
    fn paint_overlay(
        &mut self,
        row: u16,
        col: u16,
        text: &str,
        paint: Option<PaintHandle>,
    ) -> Result<()>;

    /// Flush everything queued since the last call to the display.
    fn present(&mut self) -> Result<()>;
}
