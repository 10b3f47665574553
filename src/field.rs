//! Escape-time field evaluation.
//!
//! Every pixel is derived independently from the view and the color table,
//! so rows are handed to a rayon pool and written in place.

use crate::config::{AREA_X, AREA_Y};
use crate::error::ViewerResult;
use crate::palette::{ColorTable, Rgb};
use crate::view::ViewState;
use rayon::prelude::*;
use std::time::Instant;

/// Squared escape radius.
const ESCAPE_NORM_SQR: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Redraw {
    Clean,
    Dirty,
}

/// Row-major RGB pixels, fully rewritten on every recompute.
pub(crate) struct FieldBuffer {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Rgb>,
}

impl FieldBuffer {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![[0; 3]; (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn get(&self, x: u32, y: u32) -> Rgb {
        self.px[self.idx(x, y)]
    }
}

/// Pixel -> complex plane. x gets the aspect correction, both axes the zoom.
pub(crate) fn plane_coords(px: u32, py: u32, w: u32, h: u32, view: &ViewState) -> (f64, f64) {
    let aspect = w as f64 / h as f64;
    let zoom = view.zoom as f64;
    let nx = (px as f64 / w as f64) * AREA_X * 2.0 - AREA_X;
    let ny = (py as f64 / h as f64) * AREA_Y * 2.0 - AREA_Y;
    (nx * aspect / zoom + view.center_x, ny / zoom + view.center_y)
}

/// Number of completed iterations of z <- z^2 + c before |z|^2 > 4,
/// capped at `max_iterations`.
pub(crate) fn escape_iterations(cx: f64, cy: f64, max_iterations: i64) -> i64 {
    let (mut zx, mut zy) = (0.0_f64, 0.0_f64);
    let mut iterations = 0;
    while iterations < max_iterations {
        let next_x = zx * zx - zy * zy + cx;
        zy = 2.0 * zx * zy + cy;
        zx = next_x;
        if zx * zx + zy * zy > ESCAPE_NORM_SQR {
            break;
        }
        iterations += 1;
    }
    iterations
}

/// `floor(iterations / max_iterations * n)` before clamping; reaches `n`
/// exactly for interior points.
pub(crate) fn raw_palette_index(iterations: i64, max_iterations: i64, n: usize) -> usize {
    let max = max_iterations.max(1) as f64;
    let u = iterations.clamp(0, max_iterations.max(1)) as f64 / max * n as f64;
    u.floor() as usize
}

/// Interior points land on `n`; they get the last gradient entry instead.
pub(crate) fn palette_index(iterations: i64, max_iterations: i64, n: usize) -> usize {
    raw_palette_index(iterations, max_iterations, n).min(n.saturating_sub(1))
}

pub(crate) fn shade_pixel(
    px: u32,
    py: u32,
    w: u32,
    h: u32,
    view: &ViewState,
    table: &ColorTable,
) -> Rgb {
    let (cx, cy) = plane_coords(px, py, w, h, view);
    let iterations = escape_iterations(cx, cy, view.max_iterations);
    table.lookup(palette_index(iterations, view.max_iterations, table.len()))
}

/// Writes every pixel of `buf` exactly once. Returns after all rows finish.
pub(crate) fn recompute(buf: &mut FieldBuffer, view: &ViewState, table: &ColorTable) {
    let (w, h) = (buf.w, buf.h);
    buf.px
        .par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = shade_pixel(x as u32, y as u32, w, h, view, table);
            }
        });
}

/// Owns the view, the buffer and the worker pool.
pub(crate) struct Evaluator {
    view: ViewState,
    table: ColorTable,
    buffer: FieldBuffer,
    state: Redraw,
    pool: rayon::ThreadPool,
}

impl Evaluator {
    pub(crate) fn new(
        view: ViewState,
        table: ColorTable,
        w: u32,
        h: u32,
        threads: usize,
    ) -> ViewerResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("field-{i}"))
            .build()?;
        log::info!(
            "field {}x{}, {} gradient entries, {} workers",
            w,
            h,
            table.len(),
            pool.current_num_threads()
        );
        Ok(Self {
            view,
            table,
            buffer: FieldBuffer::new(w, h),
            state: Redraw::Dirty,
            pool,
        })
    }

    pub(crate) fn view(&self) -> &ViewState {
        &self.view
    }

    pub(crate) fn buffer(&self) -> &FieldBuffer {
        &self.buffer
    }

    pub(crate) fn state(&self) -> Redraw {
        self.state
    }

    pub(crate) fn pan(&mut self, dx: f64, dy: f64, dt: f64) {
        self.view.pan(dx, dy, dt);
        self.state = Redraw::Dirty;
    }

    pub(crate) fn zoom_by(&mut self, delta: i64) {
        if self.view.zoom_by(delta) {
            log::debug!("zoom level is {}", self.view.zoom);
        } else {
            log::trace!("zoom step {delta} rejected at {}", self.view.zoom);
        }
        self.state = Redraw::Dirty;
    }

    pub(crate) fn adjust_iteration_cap(&mut self, delta: i64) {
        self.view.adjust_iteration_cap(delta);
        self.state = Redraw::Dirty;
    }

    pub(crate) fn reset(&mut self) {
        self.view.reset();
        self.state = Redraw::Dirty;
    }

    /// Recomputes only when dirty. Returns whether a recompute happened.
    pub(crate) fn update(&mut self) -> bool {
        if self.state == Redraw::Clean {
            return false;
        }
        let t0 = Instant::now();
        let Self {
            view,
            table,
            buffer,
            pool,
            ..
        } = self;
        pool.install(|| recompute(buffer, view, table));
        self.state = Redraw::Clean;
        log::debug!(
            "redraw field in {:.1} ms (max_iter {})",
            t0.elapsed().as_secs_f64() * 1000.0,
            self.view.max_iterations
        );
        true
    }
}
