use crate::field::FieldBuffer;
use crate::palette::Rgb;
use crate::view::ViewState;
use crossterm::{
    cursor,
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Upper half block: fg paints the top sample, bg the bottom one.
const HALF_BLOCK: char = '▀';

/// Rows reserved for the HUD line.
pub(crate) const HUD_ROWS: u16 = 1;

/// Per-axis cap on field pixels averaged into one terminal sample.
const MAX_TAPS: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Cell {
        self.cells[self.idx(x, y)]
    }
}

pub(crate) struct Terminal {
    out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    full_redraw: bool,
    enhanced: bool,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        // Release events make held keys exact; without them input falls back
        // to the hold window.
        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                out,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        log::info!("keyboard release events: {enhanced}");

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            full_redraw: true,
            enhanced,
        })
    }

    pub(crate) fn reports_release(&self) -> bool {
        self.enhanced
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        if self.enhanced {
            queue!(self.out, PopKeyboardEnhancementFlags)?;
        }
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self, force: bool) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if !force && c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        self.full_redraw = true;
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if !self.full_redraw && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        self.full_redraw = false;
        Ok(())
    }
}

fn to_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c[0].min(255) as u8,
        g: c[1].min(255) as u8,
        b: c[2].min(255) as u8,
    }
}

/// Box-filtered sample of the field pixels under grid cell `(sx, sy)` of a
/// `sw x sh` grid stretched over the whole buffer.
fn sample(field: &FieldBuffer, sx: u32, sy: u32, sw: u32, sh: u32) -> Rgb {
    let x0 = (sx as u64 * field.w as u64 / sw as u64) as u32;
    let x1 = ((sx as u64 + 1) * field.w as u64 / sw as u64).max(x0 as u64 + 1) as u32;
    let y0 = (sy as u64 * field.h as u64 / sh as u64) as u32;
    let y1 = ((sy as u64 + 1) * field.h as u64 / sh as u64).max(y0 as u64 + 1) as u32;
    let x1 = x1.min(field.w);
    let y1 = y1.min(field.h);

    let step_x = ((x1 - x0) / MAX_TAPS).max(1);
    let step_y = ((y1 - y0) / MAX_TAPS).max(1);

    let mut sum = [0u32; 3];
    let mut count = 0u32;
    for y in (y0..y1).step_by(step_y as usize) {
        for x in (x0..x1).step_by(step_x as usize) {
            let p = field.get(x, y);
            sum[0] += p[0];
            sum[1] += p[1];
            sum[2] += p[2];
            count += 1;
        }
    }
    let count = count.max(1);
    [sum[0] / count, sum[1] / count, sum[2] / count]
}

/// Copies the whole field into `out` below the HUD rows, two samples per cell.
pub(crate) fn blit(field: &FieldBuffer, out: &mut CellBuffer) {
    if out.h <= HUD_ROWS || out.w == 0 || field.w == 0 || field.h == 0 {
        return;
    }
    let sw = out.w as u32;
    let rows = (out.h - HUD_ROWS) as u32;
    let sh = rows * 2;

    for cy in 0..rows {
        for cx in 0..sw {
            let top = sample(field, cx, cy * 2, sw, sh);
            let bottom = sample(field, cx, cy * 2 + 1, sw, sh);
            out.set(
                cx as u16,
                cy as u16 + HUD_ROWS,
                Cell {
                    ch: HALF_BLOCK,
                    fg: to_color(top),
                    bg: to_color(bottom),
                },
            );
        }
    }
}

pub(crate) fn hud_line(view: &ViewState, fps: f64) -> String {
    format!(
        "FPS {:.0} | zoom {} | iter {} | center ({:+.12}, {:+.12}) | WASD pan  Up/Down zoom  Left/Right iter  R reset  Esc quit",
        fps, view.zoom, view.max_iterations, view.center_x, view.center_y
    )
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    let mut xx = x;
    for ch in s.chars() {
        if xx >= buf.w {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
        xx += 1;
    }
}

pub(crate) fn draw_hud(buf: &mut CellBuffer, view: &ViewState, fps: f64) {
    for x in 0..buf.w {
        buf.set(x, 0, Cell::default());
    }
    draw_text(buf, 0, 0, &hud_line(view, fps), Color::White, Color::Black);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(w: u32, h: u32) -> FieldBuffer {
        let mut f = FieldBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let i = f.idx(x, y);
                f.px[i] = if y < h / 2 { [255, 0, 0] } else { [0, 0, 255] };
            }
        }
        f
    }

    #[test]
    fn blit_fills_every_cell_below_hud() {
        let field = two_tone(64, 32);
        let mut out = CellBuffer::new(16, 9);
        blit(&field, &mut out);
        assert_eq!(out.get(0, 0), Cell::default());
        for y in HUD_ROWS..out.h {
            for x in 0..out.w {
                assert_eq!(out.get(x, y).ch, HALF_BLOCK);
            }
        }
        let red = Color::Rgb { r: 255, g: 0, b: 0 };
        let blue = Color::Rgb { r: 0, g: 0, b: 255 };
        assert_eq!(out.get(3, 1).fg, red);
        assert_eq!(out.get(3, 8).bg, blue);
    }

    #[test]
    fn samples_average_the_covered_pixels() {
        let mut field = FieldBuffer::new(2, 1);
        field.px = vec![[0, 100, 200], [200, 100, 0]];
        assert_eq!(sample(&field, 0, 0, 1, 1), [100, 100, 100]);
    }

    #[test]
    fn upsampling_small_field_repeats_pixels() {
        let mut field = FieldBuffer::new(1, 1);
        field.px[0] = [9, 8, 7];
        let mut out = CellBuffer::new(4, 3);
        blit(&field, &mut out);
        let c = Color::Rgb { r: 9, g: 8, b: 7 };
        assert_eq!(out.get(3, 2), Cell { ch: HALF_BLOCK, fg: c, bg: c });
    }

    #[test]
    fn hud_only_terminal_is_left_alone() {
        let field = two_tone(8, 8);
        let mut out = CellBuffer::new(10, 1);
        blit(&field, &mut out);
        assert!(out.cells.iter().all(|c| *c == Cell::default()));
    }

    #[test]
    fn hud_reports_view() {
        let view = ViewState {
            zoom: 42,
            max_iterations: 300,
            ..ViewState::default()
        };
        let line = hud_line(&view, 59.6);
        assert!(line.starts_with("FPS 60 | zoom 42 | iter 300"));
        assert!(line.contains("-0.300000000000"));

        let mut buf = CellBuffer::new(8, 2);
        draw_hud(&mut buf, &view, 59.6);
        let first: String = (0..8).map(|x| buf.get(x, 0).ch).collect();
        assert_eq!(first, "FPS 60 |");
    }
}
