use crate::error::Error;
use ordered_float::NotNan;
use std::ops::{Add, Mul, Sub};

/// A position in normalized frame coordinates.
///
/// `x` grows to the right and `y` grows downward, both nominally in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Point {
    x: f32,
    y: f32,
}

/// A direction in the same coordinate system as [`Point`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Result<Self, Error> {
        Ok(Self {
            x: NotNan::new(x)
                .map_err(|e| Error::ConstructNotNan(e, x))?
                .into_inner(),
            y: NotNan::new(y)
                .map_err(|e| Error::ConstructNotNan(e, y))?
                .into_inner(),
        })
    }

    #[inline]
    pub fn x(self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(self) -> f32 {
        self.y
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Scale a normalized position into pixel coordinates of a `width` x `height` surface.
    pub fn denormalize(self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn magnitude(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Rotate clockwise (on screen, where y points down) by `degrees`.
    pub fn rotated(self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }
}

impl Sub for Point {
    type Output = Vector2;

    fn sub(self, rhs: Self) -> Self::Output {
        Vector2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Mul<f32> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::Output {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Point, Vector2};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn nan_coordinates_are_rejected() {
        assert!(Point::new(f32::NAN, 0.5).is_err());
        assert!(Point::new(0.5, f32::NAN).is_err());
    }

    #[test]
    fn points_subtract_into_vectors() {
        let a = Point::new(0.5, 0.25).unwrap();
        let b = Point::new(1.0, 1.0).unwrap();
        assert_eq!(b - a, Vector2::new(0.5, 0.75));
    }

    #[test]
    fn midpoint_and_denormalize() {
        let mid = Point::new(0.2, 0.4)
            .unwrap()
            .midpoint(Point::new(0.6, 0.8).unwrap());
        let (x, y) = mid.denormalize(100, 50);
        assert_approx_eq!(x, 40.0, 1e-4);
        assert_approx_eq!(y, 30.0, 1e-4);
    }

    #[test]
    fn rotating_up_by_ninety_points_right() {
        let right = Vector2::new(0.0, -1.0).rotated(90.0);
        assert_approx_eq!(right.x, 1.0);
        assert_approx_eq!(right.y, 0.0);
        assert_approx_eq!(right.magnitude(), 1.0);
    }
}
