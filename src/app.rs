use crate::config::{Args, MAX_FRAME_DT};
use crate::field::{Evaluator, Redraw};
use crate::input::{collect_input_nonblocking, Command, Intent, KeyState};
use crate::palette::ColorTable;
use crate::render::{blit, draw_hud, Terminal};
use crate::view::ViewState;
use anyhow::Context;
use std::time::{Duration, Instant};

pub(crate) struct App {
    args: Args,
    field: Evaluator,
    keys: KeyState,
    term: Terminal,
    should_quit: bool,
    fps: FpsMeter,
}

impl App {
    fn init(args: Args) -> anyhow::Result<Self> {
        let table = ColorTable::load(&args.gradient).context("startup: color table")?;
        let view = ViewState::new(args.center_x, args.center_y, args.initial_iterations());
        let field = Evaluator::new(view, table, args.width, args.height, args.threads)
            .context("startup: field workers")?;

        let term = Terminal::begin()?;
        let keys = KeyState::new(args.hold_window(), term.reports_release());

        Ok(Self {
            args,
            field,
            keys,
            term,
            should_quit: false,
            fps: FpsMeter::new(),
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let budget = self.args.frame_budget();
        let mut last_frame = Instant::now();

        while !self.should_quit {
            let frame_start = Instant::now();
            let dt = frame_start
                .saturating_duration_since(last_frame)
                .as_secs_f64()
                .min(MAX_FRAME_DT);
            last_frame = frame_start;

            // input
            let polled =
                collect_input_nonblocking(&mut self.keys, budget.unwrap_or(Duration::ZERO))?;
            for cmd in polled.commands {
                match cmd {
                    Command::Quit => self.should_quit = true,
                    Command::Reset => self.field.reset(),
                }
            }
            if self.should_quit {
                break;
            }
            self.term.resize_if_needed(polled.resized)?;

            let intent = Intent::from_keys(&self.keys, Instant::now(), self.args.velocity);
            if !intent.is_idle() {
                intent.apply(&mut self.field, dt);
            }

            // recompute runs to completion before the blit reads the buffer
            if self.field.state() == Redraw::Dirty {
                self.field.update();
            }

            blit(self.field.buffer(), &mut self.term.cur);
            draw_hud(&mut self.term.cur, self.field.view(), self.fps.tick(frame_start));
            self.term.present()?;

            if let Some(target) = budget {
                spin_sleep(target, frame_start);
            }
        }
        Ok(())
    }
}

pub(crate) fn run(args: Args) -> anyhow::Result<()> {
    let mut app = App::init(args)?;
    let res = app.run();
    app.term.end()?;
    res
}

/// Exponentially smoothed frames per second.
struct FpsMeter {
    last: Option<Instant>,
    fps: f64,
}

impl FpsMeter {
    fn new() -> Self {
        Self { last: None, fps: 0.0 }
    }

    fn tick(&mut self, now: Instant) -> f64 {
        if let Some(prev) = self.last {
            let dt = now.saturating_duration_since(prev).as_secs_f64();
            if dt > 0.0 {
                let inst = 1.0 / dt;
                self.fps = if self.fps == 0.0 {
                    inst
                } else {
                    self.fps * 0.9 + inst * 0.1
                };
            }
        }
        self.last = Some(now);
        self.fps
    }
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, start: Instant) {
    let end = start + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_meter_settles_on_frame_rate() {
        let mut m = FpsMeter::new();
        let t0 = Instant::now();
        assert_eq!(m.tick(t0), 0.0);
        let mut fps = 0.0;
        for i in 1..=200 {
            fps = m.tick(t0 + Duration::from_millis(20 * i));
        }
        assert!((fps - 50.0).abs() < 0.5, "got {fps}");
    }
}
