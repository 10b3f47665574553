use crate::field::Evaluator;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Edge-triggered commands, fired once per key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Reset,
    Quit,
}

/// Level-triggered key state rebuilt from terminal key events.
///
/// Terminals without release reporting only send presses and autorepeats,
/// so a key counts as held until `hold` passes without another event.
pub(crate) struct KeyState {
    last_seen: HashMap<KeyCode, Instant>,
    hold: Duration,
    reports_release: bool,
}

impl KeyState {
    pub(crate) fn new(hold: Duration, reports_release: bool) -> Self {
        Self {
            last_seen: HashMap::new(),
            hold,
            reports_release,
        }
    }

    pub(crate) fn handle(&mut self, ev: KeyEvent, now: Instant) -> Option<Command> {
        let code = normalize(ev.code);
        match ev.kind {
            KeyEventKind::Release => {
                self.last_seen.remove(&code);
                None
            }
            KeyEventKind::Press | KeyEventKind::Repeat => {
                self.last_seen.insert(code, now);
                if ev.kind == KeyEventKind::Press {
                    map_command(code, ev.modifiers)
                } else {
                    None
                }
            }
        }
    }

    pub(crate) fn is_held(&self, code: KeyCode, now: Instant) -> bool {
        match self.last_seen.get(&normalize(code)) {
            Some(_) if self.reports_release => true,
            Some(t) => now.saturating_duration_since(*t) <= self.hold,
            None => false,
        }
    }

    /// Drops keys whose hold window ran out.
    pub(crate) fn expire(&mut self, now: Instant) {
        if self.reports_release {
            return;
        }
        let hold = self.hold;
        self.last_seen
            .retain(|_, t| now.saturating_duration_since(*t) <= hold);
    }
}

fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

fn map_command(code: KeyCode, mods: KeyModifiers) -> Option<Command> {
    match code {
        KeyCode::Char('c') if mods.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Esc | KeyCode::Char('q') => Some(Command::Quit),
        KeyCode::Char('r') => Some(Command::Reset),
        _ => None,
    }
}

/// What the held keys ask for this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Intent {
    /// +1 zoom in, -1 zoom out.
    pub(crate) zoom: i64,
    pub(crate) iterations: i64,
    pub(crate) dx: f64,
    pub(crate) dy: f64,
}

impl Intent {
    /// Within each opposing pair the first key wins.
    pub(crate) fn from_keys(keys: &KeyState, now: Instant, velocity: f64) -> Self {
        let held = |c: KeyCode| keys.is_held(c, now);
        let pick = |a: KeyCode, b: KeyCode| -> i64 {
            if held(a) {
                -1
            } else if held(b) {
                1
            } else {
                0
            }
        };
        Self {
            zoom: -pick(KeyCode::Up, KeyCode::Down),
            iterations: pick(KeyCode::Left, KeyCode::Right),
            dx: pick(KeyCode::Char('a'), KeyCode::Char('d')) as f64 * velocity,
            dy: pick(KeyCode::Char('w'), KeyCode::Char('s')) as f64 * velocity,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.zoom == 0 && self.iterations == 0 && self.dx == 0.0 && self.dy == 0.0
    }

    /// Each call that does something marks the field dirty.
    pub(crate) fn apply(&self, ev: &mut Evaluator, dt: f64) {
        if self.dx != 0.0 || self.dy != 0.0 {
            ev.pan(self.dx, self.dy, dt);
        }
        if self.zoom != 0 {
            let step = ev.view().zoom_step();
            ev.zoom_by(self.zoom * step);
        }
        if self.iterations != 0 {
            ev.adjust_iteration_cap(self.iterations);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Polled {
    pub(crate) commands: Vec<Command>,
    pub(crate) resized: bool,
}

/// Drains pending terminal events without blocking the frame.
pub(crate) fn collect_input_nonblocking(
    keys: &mut KeyState,
    max_frame_time: Duration,
) -> anyhow::Result<Polled> {
    let mut out = Polled::default();

    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) => {
                if let Some(cmd) = keys.handle(k, Instant::now()) {
                    out.commands.push(cmd);
                }
            }
            Event::Resize(_, _) => out.resized = true,
            _ => {}
        }
        if out.commands.len() >= 32 {
            break;
        }
    }
    keys.expire(Instant::now());
    Ok(out)
}
