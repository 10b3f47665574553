/// Guard against zoom levels the f64 coordinate math can no longer resolve.
pub(crate) const ZOOM_UPPER_BOUND: u64 = 23_357_547_167_344;

pub(crate) const MAX_ITERATIONS_FLOOR: i64 = 8;
pub(crate) const MAX_ITERATIONS_CEIL: i64 = 2048;
pub(crate) const BASELINE_ITERATIONS: i64 = 100;

/// Fraction of the current zoom applied per zoom step.
pub(crate) const ZOOM_STEP: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ViewState {
    pub(crate) center_x: f64,
    pub(crate) center_y: f64,
    /// Always >= 1.
    pub(crate) zoom: u64,
    /// Always within `MAX_ITERATIONS_FLOOR..=MAX_ITERATIONS_CEIL`.
    pub(crate) max_iterations: i64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center_x: -0.3,
            center_y: 0.0,
            zoom: 1,
            max_iterations: 256,
        }
    }
}

impl ViewState {
    pub(crate) fn new(center_x: f64, center_y: f64, max_iterations: i64) -> Self {
        Self {
            center_x,
            center_y,
            zoom: 1,
            max_iterations: max_iterations.clamp(MAX_ITERATIONS_FLOOR, MAX_ITERATIONS_CEIL),
        }
    }

    /// Pan speed shrinks with zoom, so on-screen speed stays constant.
    pub(crate) fn pan(&mut self, dx: f64, dy: f64, dt: f64) {
        let zoom = self.zoom as f64;
        self.center_x += dx / zoom * dt;
        self.center_y += dy / zoom * dt;
    }

    /// Returns whether the step was applied. Steps that would take zoom to
    /// zero or below, or grow it past `ZOOM_UPPER_BOUND`, are dropped.
    pub(crate) fn zoom_by(&mut self, delta: i64) -> bool {
        let next = self.zoom as i128 + delta as i128;
        if next <= 0 || (delta > 0 && next > ZOOM_UPPER_BOUND as i128) {
            return false;
        }
        self.zoom = next as u64;
        true
    }

    /// One zoom step at the current zoom level: 5% of it, never less than 1.
    pub(crate) fn zoom_step(&self) -> i64 {
        ((self.zoom as f64 * ZOOM_STEP).round() as i64).max(1)
    }

    pub(crate) fn adjust_iteration_cap(&mut self, delta: i64) {
        self.max_iterations = self
            .max_iterations
            .saturating_add(delta)
            .clamp(MAX_ITERATIONS_FLOOR, MAX_ITERATIONS_CEIL);
    }

    /// Restores the iteration cap only; position and zoom are kept.
    pub(crate) fn reset(&mut self) {
        self.max_iterations = BASELINE_ITERATIONS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_past_bound_is_rejected() {
        let mut v = ViewState::default();
        assert!(!v.zoom_by(ZOOM_UPPER_BOUND as i64));
        assert_eq!(v.zoom, 1);
    }

    #[test]
    fn zoom_to_zero_is_rejected_repeatedly() {
        let mut v = ViewState::default();
        for _ in 0..10 {
            assert!(!v.zoom_by(-1));
            assert!(!v.zoom_by(i64::MIN));
        }
        assert_eq!(v.zoom, 1);
    }

    #[test]
    fn zoom_can_back_out_above_bound() {
        let mut v = ViewState {
            zoom: ZOOM_UPPER_BOUND,
            ..ViewState::default()
        };
        assert!(!v.zoom_by(1));
        assert!(v.zoom_by(-(v.zoom_step())));
        assert!(v.zoom < ZOOM_UPPER_BOUND);
    }

    #[test]
    fn zoom_steps_are_proportional() {
        let mut v = ViewState::default();
        assert_eq!(v.zoom_step(), 1);
        v.zoom = 1000;
        assert_eq!(v.zoom_step(), 50);
        assert!(v.zoom_by(v.zoom_step()));
        assert_eq!(v.zoom, 1050);
    }

    #[test]
    fn repeated_zoom_in_stops_at_bound() {
        let mut v = ViewState::default();
        while v.zoom_by(v.zoom_step()) {}
        assert!(v.zoom <= ZOOM_UPPER_BOUND);
        assert!(v.zoom > ZOOM_UPPER_BOUND / 2);
    }

    #[test]
    fn iteration_cap_saturates() {
        let mut v = ViewState::default();
        for _ in 0..5 {
            v.adjust_iteration_cap(-1000);
        }
        assert_eq!(v.max_iterations, 8);
        for _ in 0..5 {
            v.adjust_iteration_cap(1000);
        }
        assert_eq!(v.max_iterations, 2048);
        v.adjust_iteration_cap(i64::MAX);
        assert_eq!(v.max_iterations, 2048);
    }

    #[test]
    fn pan_there_and_back() {
        let mut v = ViewState {
            zoom: 37,
            ..ViewState::default()
        };
        let before = v;
        v.pan(5.0, -5.0, 0.016);
        assert_ne!(v.center_x, before.center_x);
        v.pan(-5.0, 5.0, 0.016);
        assert!((v.center_x - before.center_x).abs() < 1e-12);
        assert!((v.center_y - before.center_y).abs() < 1e-12);
    }

    #[test]
    fn pan_scales_with_zoom() {
        let mut near = ViewState::default();
        let mut far = ViewState {
            zoom: 10,
            ..ViewState::default()
        };
        near.pan(1.0, 0.0, 1.0);
        far.pan(1.0, 0.0, 1.0);
        assert!((near.center_x - (-0.3 + 1.0)).abs() < 1e-12);
        assert!((far.center_x - (-0.3 + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn reset_keeps_position() {
        let mut v = ViewState::new(0.25, -0.1, 900);
        v.zoom = 64;
        v.reset();
        assert_eq!(v.max_iterations, BASELINE_ITERATIONS);
        assert_eq!((v.center_x, v.center_y, v.zoom), (0.25, -0.1, 64));
    }
}
