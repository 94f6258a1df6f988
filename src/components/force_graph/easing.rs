//! CSS-style cubic Bézier easing curves.
//!
//! A curve is defined by two control points; the end points are fixed at
//! (0, 0) and (1, 1). [`CubicBezier::ease`] maps progress on the x axis to
//! the eased value on the y axis.

/// Fades presence overlays out as a session goes idle.
pub const FADE: CubicBezier = CubicBezier::new(0.0, 0.9, 1.0, 1.0);

/// Shapes the colored flash behind a newly arrived avatar.
pub const FLASH: CubicBezier = CubicBezier::new(0.25, 0.1, 0.0, 1.0);

const EPSILON: f64 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
	x1: f64,
	y1: f64,
	x2: f64,
	y2: f64,
}

impl CubicBezier {
	/// Control point x coordinates must lie in `[0, 1]`.
	pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
		Self { x1, y1, x2, y2 }
	}

	/// Eased value at progress `x`, clamped to `[0, 1]`.
	pub fn ease(&self, x: f64) -> f64 {
		if x <= 0.0 {
			return 0.0;
		}
		if x >= 1.0 {
			return 1.0;
		}
		if self.x1 == self.y1 && self.x2 == self.y2 {
			return x;
		}
		sample(self.y1, self.y2, self.solve(x))
	}

	/// Curve parameter `t` whose x coordinate is `x`.
	fn solve(&self, x: f64) -> f64 {
		// Newton's method converges in a few steps for most curves.
		let mut t = x;
		for _ in 0..8 {
			let err = sample(self.x1, self.x2, t) - x;
			if err.abs() < EPSILON {
				return t;
			}
			let d = slope(self.x1, self.x2, t);
			if d.abs() < 1e-6 {
				break;
			}
			t -= err / d;
		}

		// Flat spots stall Newton; fall back to bisection.
		let (mut lo, mut hi) = (0.0, 1.0);
		t = x;
		for _ in 0..64 {
			let value = sample(self.x1, self.x2, t);
			if (value - x).abs() < EPSILON {
				break;
			}
			if value < x {
				lo = t;
			} else {
				hi = t;
			}
			t = (lo + hi) / 2.0;
		}
		t
	}
}

/// One coordinate of the curve at `t`, given that coordinate of both control points.
fn sample(a1: f64, a2: f64, t: f64) -> f64 {
	let u = 1.0 - t;
	3.0 * u * u * t * a1 + 3.0 * u * t * t * a2 + t * t * t
}

fn slope(a1: f64, a2: f64, t: f64) -> f64 {
	let u = 1.0 - t;
	3.0 * u * u * a1 + 6.0 * u * t * (a2 - a1) + 3.0 * t * t * (1.0 - a2)
}
