use std::cell::RefCell;
use std::io::{self, Stdout, Write};
use std::rc::Rc;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};

use crate::error::{RenderError, Result};
use crate::render::glyph::GlyphFrame;
use crate::render::palette::{PaintCache, PaintHandle};
use crate::render::GridRenderer;

/// Crossterm-backed renderer painting glyph grids to stdout.
///
/// Owns the terminal session: raw mode and the alternate screen are entered on
/// construction and restored on drop, so the terminal comes back even when an
/// error unwinds through playback.
pub struct TerminalRenderer {
    out: Stdout,
    paints: Rc<RefCell<PaintCache>>,
}

impl TerminalRenderer {
    pub fn new(paints: Rc<RefCell<PaintCache>>) -> Result<Self> {
        enable_raw_mode().map_err(|e| RenderError::TerminalInit {
            reason: e.to_string(),
        })?;

        let mut out = io::stdout();
        if let Err(e) = execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All)) {
            let _ = disable_raw_mode();
            return Err(RenderError::TerminalInit {
                reason: e.to_string(),
            }
            .into());
        }

        Ok(Self { out, paints })
    }

    fn apply_paint(&mut self, paint: Option<PaintHandle>) -> io::Result<()> {
        let spec = paint.and_then(|handle| self.paints.borrow().spec(handle));
        match spec {
            Some(spec) => {
                queue!(self.out, SetForegroundColor(Color::AnsiValue(spec.fg)))?;
                if let Some(bg) = spec.bg {
                    queue!(self.out, SetBackgroundColor(Color::AnsiValue(bg)))?;
                }
            }
            None => queue!(self.out, ResetColor)?,
        }
        Ok(())
    }
}

impl GridRenderer for TerminalRenderer {
    fn grid_size(&self) -> Result<(u16, u16)> {
        let (cols, rows) = terminal::size()?;
        Ok((rows, cols))
    }

    fn paint_grid(&mut self, frame: &GlyphFrame) -> Result<()> {
        // Runs of equally painted cells are printed in one go; colors persist
        // across moves, so the active paint is tracked for the whole grid.
        let mut active: Option<Option<PaintHandle>> = None;
        let mut run = String::with_capacity(frame.cols() as usize);

        for row in 0..frame.rows() {
            queue!(self.out, MoveTo(0, row))?;
            for cell in frame.row(row) {
                if active != Some(cell.paint) {
                    if !run.is_empty() {
                        queue!(self.out, Print(&run))?;
                        run.clear();
                    }
                    self.apply_paint(cell.paint)?;
                    active = Some(cell.paint);
                }
                run.push(cell.ch);
            }
            if !run.is_empty() {
                queue!(self.out, Print(&run))?;
                run.clear();
            }
        }
        Ok(())
    }

    fn paint_overlay(
        &mut self,
        row: u16,
        col: u16,
        text: &str,
        paint: Option<PaintHandle>,
    ) -> Result<()> {
        queue!(self.out, MoveTo(col, row))?;
        self.apply_paint(paint)?;
        queue!(self.out, Print(text), ResetColor)?;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = execute!(self.out, ResetColor, LeaveAlternateScreen, Show);
        let _ = disable_raw_mode();
    }
}
