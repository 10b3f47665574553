use crate::view::{MAX_ITERATIONS_CEIL, MAX_ITERATIONS_FLOOR};
use clap::Parser;
use std::{path::PathBuf, time::Duration};

/// Half-extents of the unzoomed view in plane units.
pub(crate) const AREA_X: f64 = 2.0;
pub(crate) const AREA_Y: f64 = 2.0;

/// Largest frame time fed into panning, so a stalled terminal can't fling the view.
pub(crate) const MAX_FRAME_DT: f64 = 0.25;

#[derive(Parser, Debug, Clone)]
#[command(name = "mandelview")]
#[command(about = "Interactive Mandelbrot explorer for the terminal", long_about = None)]
pub(crate) struct Args {
    /// Gradient image used as the color table (its longer axis is sampled)
    #[arg(long, default_value = "assets/gradient.ppm")]
    pub(crate) gradient: PathBuf,

    /// Field buffer width in pixels
    #[arg(long, default_value_t = 1280, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) width: u32,

    /// Field buffer height in pixels
    #[arg(long, default_value_t = 720, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) height: u32,

    /// Initial iteration cap (clamped to 8..=2048)
    #[arg(long, default_value_t = 256)]
    pub(crate) max_iterations: i64,

    /// Initial center, real part
    #[arg(long, default_value_t = -0.3, allow_negative_numbers = true)]
    pub(crate) center_x: f64,

    /// Initial center, imaginary part
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub(crate) center_y: f64,

    /// Worker threads for the field kernel (0 = one per core)
    #[arg(long, default_value_t = 0)]
    pub(crate) threads: usize,

    /// FPS cap (0 = uncapped)
    #[arg(long, default_value_t = 60)]
    pub(crate) fps: u32,

    /// Pan speed in plane units per second at zoom 1
    #[arg(long, default_value_t = 5.0)]
    pub(crate) velocity: f64,

    /// How long a key counts as held after its last press/repeat event (ms)
    #[arg(long, default_value_t = 150)]
    pub(crate) hold_ms: u64,
}

impl Args {
    pub(crate) fn frame_budget(&self) -> Option<Duration> {
        if self.fps == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / self.fps.min(240) as f64))
        }
    }

    pub(crate) fn hold_window(&self) -> Duration {
        Duration::from_millis(self.hold_ms.max(1))
    }

    pub(crate) fn initial_iterations(&self) -> i64 {
        self.max_iterations
            .clamp(MAX_ITERATIONS_FLOOR, MAX_ITERATIONS_CEIL)
    }
}
