use emvs_core::nalgebra::{Point2, Vector2};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Maximum number of fixed-point iterations used by [`RadialTangential::undistort`].
const UNDISTORT_ITERATIONS: usize = 20;
/// Iteration stops once a step moves the point by less than this (normalized units).
const UNDISTORT_TOLERANCE: f64 = 1e-12;

/// Radial-tangential (plumb bob) lens distortion in normalized image coordinates.
///
/// $$
/// x_d = x (1 + k_1 r^2 + k_2 r^4 + k_3 r^6) + 2 p_1 x y + p_2 (r^2 + 2 x^2)
/// $$
/// $$
/// y_d = y (1 + k_1 r^2 + k_2 r^4 + k_3 r^6) + p_1 (r^2 + 2 y^2) + 2 p_2 x y
/// $$
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RadialTangential {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl RadialTangential {
    /// Builds the model from coefficients in the usual `[k1, k2, p1, p2, k3]` order.
    pub fn from_coefficients(coefficients: [f64; 5]) -> Self {
        let [k1, k2, p1, p2, k3] = coefficients;
        Self { k1, k2, p1, p2, k3 }
    }

    pub fn coefficients(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// `true` when every coefficient is zero.
    pub fn is_identity(&self) -> bool {
        self.coefficients().iter().all(|&c| c == 0.0)
    }

    /// Radial gain `1 + k1 r² + k2 r⁴ + k3 r⁶`, evaluated with Horner's scheme in `r²`.
    fn radial(&self, r2: f64) -> f64 {
        1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3))
    }

    fn tangential(&self, point: Point2<f64>, r2: f64) -> Vector2<f64> {
        let (x, y) = (point.x, point.y);
        Vector2::new(
            2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        )
    }

    /// Applies the distortion to an ideal normalized point.
    pub fn distort(&self, point: Point2<f64>) -> Point2<f64> {
        let r2 = point.coords.norm_squared();
        point * self.radial(r2) + self.tangential(point, r2)
    }

    /// Removes the distortion from a normalized point.
    ///
    /// There is no closed form inverse, so this runs a fixed-point iteration starting from
    /// the distorted point itself.
    pub fn undistort(&self, distorted: Point2<f64>) -> Point2<f64> {
        if self.is_identity() {
            return distorted;
        }
        let mut point = distorted;
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = point.coords.norm_squared();
            let gain = self.radial(r2);
            if gain.abs() < f64::EPSILON {
                break;
            }
            let next = (distorted - self.tangential(point, r2)) / gain;
            let step = (next - point).norm();
            point = next;
            if step < UNDISTORT_TOLERANCE {
                break;
            }
        }
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lens() -> RadialTangential {
        RadialTangential::from_coefficients([-0.37, 0.16, 0.0011, -0.0007, -0.02])
    }

    #[test]
    fn undistort_inverts_distort() {
        let lens = lens();
        for &(x, y) in &[(0.0, 0.0), (0.1, -0.2), (-0.35, 0.25), (0.3, 0.3)] {
            let ideal = Point2::new(x, y);
            let back = lens.undistort(lens.distort(ideal));
            assert_relative_eq!(back, ideal, epsilon = 1e-6);
        }
    }

    #[test]
    fn identity_leaves_points_alone() {
        let lens = RadialTangential::default();
        let point = Point2::new(0.4, -0.1);
        assert_eq!(lens.distort(point), point);
        assert_eq!(lens.undistort(point), point);
    }

    #[test]
    fn barrel_distortion_pulls_points_inwards() {
        let lens = RadialTangential {
            k1: -0.2,
            ..Default::default()
        };
        let distorted = lens.distort(Point2::new(0.5, 0.0));
        assert!(distorted.x < 0.5);
        assert_eq!(distorted.y, 0.0);
    }
}
