//! The easing curve shared by every animated transition, and the timer that
//! drives a discrete 0/1 setting through it.

/// `t² / (2(t² − t) + 1)`: symmetric, `ease(0)=0`, `ease(0.5)=0.5`, `ease(1)=1`.
#[inline]
pub fn ease(t: f32) -> f32 {
    let t2 = t * t;
    t2 / (2.0 * (t2 - t) + 1.0)
}

/// Animates a raw parameter toward 0.0 or 1.0 at a fixed rate per second.
///
/// Consumers read `eased()`; `raw()` is what decides whether a transition is
/// still in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    t: f32,
    target: f32,
    speed: f32,
}

impl Transition {
    pub fn new(settled_at_one: bool, speed: f32) -> Self {
        let t = if settled_at_one { 1.0 } else { 0.0 };
        Self { t, target: t, speed }
    }

    /// Sets the discrete end point; the value keeps animating from where it is.
    pub fn set_target(&mut self, at_one: bool) {
        self.target = if at_one { 1.0 } else { 0.0 };
    }

    pub fn target_is_one(&self) -> bool {
        self.target == 1.0
    }

    /// Advances by `elapsed` seconds. Returns true when the value moved.
    pub fn advance(&mut self, elapsed: f32) -> bool {
        if self.t == self.target {
            return false;
        }
        let step = self.speed * elapsed.max(0.0);
        self.t = if self.target > self.t {
            (self.t + step).min(self.target)
        } else {
            (self.t - step).max(self.target)
        };
        true
    }

    pub fn raw(&self) -> f32 {
        self.t
    }

    pub fn eased(&self) -> f32 {
        ease(self.t)
    }

    /// True while strictly between 0 and 1.
    pub fn in_flight(&self) -> bool {
        self.t > 0.0 && self.t < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_fixed_points_and_symmetry() {
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(1.0), 1.0);
        assert_eq!(ease(0.5), 0.5);
        for i in 0..=100 {
            let t = i as f32 / 100.0;
            assert!((ease(t) + ease(1.0 - t) - 1.0).abs() < 1e-5, "asymmetric at {t}");
        }
    }

    #[test]
    fn ease_is_monotonic() {
        let mut prev = ease(0.0);
        for i in 1..=1000 {
            let v = ease(i as f32 / 1000.0);
            assert!(v >= prev, "ease decreased at step {i}");
            prev = v;
        }
    }

    #[test]
    fn transition_runs_both_ways_and_settles() {
        let mut tr = Transition::new(false, 2.0);
        assert!(!tr.advance(0.1));

        tr.set_target(true);
        assert!(tr.advance(0.25));
        assert!(tr.in_flight());
        assert!((tr.raw() - 0.5).abs() < 1e-6);
        assert_eq!(tr.eased(), 0.5);

        tr.advance(10.0);
        assert_eq!(tr.raw(), 1.0);
        assert!(!tr.in_flight());

        // Reversing mid-flight continues from the current value.
        tr.set_target(false);
        tr.advance(0.1);
        assert!((tr.raw() - 0.8).abs() < 1e-6);
    }
}
