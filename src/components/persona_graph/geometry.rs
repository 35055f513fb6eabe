//! Plane geometry shared by placement, hit testing and rendering.

use std::f64::consts::{PI, TAU};
use std::ops::{Add, Mul, Sub};

/// A point (or displacement) in graph space. The canvas origin is the layout center.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate, growing downwards like the canvas.
	pub y: f64,
}

impl Point {
	/// The layout center.
	pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

	/// Creates a point from cartesian coordinates.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Creates a point at `radius` from the origin along `angle` (radians).
	pub fn polar(angle: f64, radius: f64) -> Self {
		Self::new(radius * angle.cos(), radius * angle.sin())
	}

	/// Distance from the origin.
	pub fn length(self) -> f64 {
		self.x.hypot(self.y)
	}

	/// Angle from the origin in (-π, π].
	pub fn angle(self) -> f64 {
		self.y.atan2(self.x)
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		(self - other).length()
	}

	/// Unit vector in the same direction, or `None` for a (near) zero vector.
	pub fn normalized(self) -> Option<Point> {
		let len = self.length();
		(len > f64::EPSILON).then(|| self * (1.0 / len))
	}

	/// The vector rotated a quarter turn counter-clockwise in math orientation.
	pub fn perpendicular(self) -> Point {
		Point::new(-self.y, self.x)
	}
}

impl Add for Point {
	type Output = Point;

	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Point {
	type Output = Point;

	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl Mul<f64> for Point {
	type Output = Point;

	fn mul(self, rhs: f64) -> Point {
		Point::new(self.x * rhs, self.y * rhs)
	}
}

/// Normalises an angle into (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
	let wrapped = (angle + PI).rem_euclid(TAU) - PI;
	if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Angle subtended at the center by a chord of `length` on a circle of `radius`.
pub fn chord_angle(length: f64, radius: f64) -> f64 {
	if radius <= f64::EPSILON {
		return TAU;
	}
	let half = (length / (2.0 * radius)).clamp(0.0, 1.0);
	2.0 * half.asin()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_polar_round_trip() {
		let p = Point::polar(PI / 3.0, 10.0);
		assert!((p.length() - 10.0).abs() < 1e-9);
		assert!((p.angle() - PI / 3.0).abs() < 1e-9);
	}

	#[test]
	fn test_wrap_angle_range() {
		assert!((wrap_angle(2.5 * PI) - 0.5 * PI).abs() < 1e-9);
		assert!((wrap_angle(-PI) - PI).abs() < 1e-9);
		assert!((wrap_angle(TAU + 0.5) - 0.5).abs() < 1e-9);
		assert!((wrap_angle(-0.25) + 0.25).abs() < 1e-9);
	}

	#[test]
	fn test_chord_angle_matches_chord_length() {
		let theta = chord_angle(30.0, 100.0);
		let a = Point::polar(0.0, 100.0);
		let b = Point::polar(theta, 100.0);
		assert!((a.distance(b) - 30.0).abs() < 1e-9);
	}

	#[test]
	fn test_normalized_zero_vector() {
		assert!(Point::ORIGIN.normalized().is_none());
		let n = Point::new(3.0, 4.0).normalized().unwrap();
		assert!((n.length() - 1.0).abs() < 1e-12);
	}
}
