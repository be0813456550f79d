// Planar geometry for the swerve core: wrapping angles and 2D poses.

use std::f64::consts::{PI, TAU};
use std::ops::{Add, Neg, Sub};

use nalgebra::{Rotation2, Vector2};

/// A planar rotation stored in radians. Arithmetic does not wrap; call
/// [`Angle::wrapped`] or use [`Angle::distance_to`] where shortest-path
/// semantics matter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Self = Angle(0.0);

    pub fn from_radians(radians: f64) -> Self {
        Self(radians)
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees.to_radians())
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn degrees(self) -> f64 {
        self.0.to_degrees()
    }

    /// Equivalent angle in (-PI, PI].
    pub fn wrapped(self) -> Self {
        let r = self.0.rem_euclid(TAU);
        Self(if r > PI { r - TAU } else { r })
    }

    /// Shortest signed angular distance from `self` to `other`, radians.
    /// Never raw subtraction: distance_to(350deg, 10deg) is +20deg.
    pub fn distance_to(self, other: Angle) -> f64 {
        Angle(other.0 - self.0).wrapped().0
    }

    pub fn sin(self) -> f64 {
        self.0.sin()
    }

    pub fn cos(self) -> f64 {
        self.0.cos()
    }

    /// Rotate a vector by this angle.
    pub fn rotate(self, v: Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(self.0) * v
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0 - rhs.0)
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle(-self.0)
    }
}

/// Robot pose on the field: translation in meters, heading in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub translation: Vector2<f64>,
    pub heading: Angle,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading: Angle) -> Self {
        Self {
            translation: Vector2::new(x, y),
            heading,
        }
    }

    pub fn x(&self) -> f64 {
        self.translation.x
    }

    pub fn y(&self) -> f64 {
        self.translation.y
    }

    /// Field-frame direction from this pose's position to the target's.
    pub fn angle_to(&self, target: &Pose) -> Angle {
        let d = target.translation - self.translation;
        Angle::from_radians(d.y.atan2(d.x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_wrap_into_half_open_range() {
        assert!((Angle::from_degrees(350.0).wrapped().degrees() - (-10.0)).abs() < EPS);
        assert!((Angle::from_degrees(-190.0).wrapped().degrees() - 170.0).abs() < EPS);
        assert!((Angle::from_degrees(180.0).wrapped().degrees() - 180.0).abs() < EPS);
    }

    #[test]
    fn test_shortest_distance_wraps() {
        let from = Angle::from_degrees(350.0);
        let to = Angle::from_degrees(10.0);
        assert!((from.distance_to(to).to_degrees() - 20.0).abs() < EPS);
        assert!((to.distance_to(from).to_degrees() + 20.0).abs() < EPS);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = Angle::from_degrees(90.0).rotate(Vector2::new(1.0, 0.0));
        assert!(v.x.abs() < EPS);
        assert!((v.y - 1.0).abs() < EPS);
    }

    #[test]
    fn test_angle_between_poses() {
        let a = Pose::new(0.0, 0.0, Angle::ZERO);
        let b = Pose::new(1.0, 1.0, Angle::ZERO);
        assert!((a.angle_to(&b).degrees() - 45.0).abs() < EPS);
    }
}
