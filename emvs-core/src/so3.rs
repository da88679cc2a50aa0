use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use num_traits::Float;
#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Contains a member of the lie algebra so(3), a representation of the tangent space
/// of 3d rotation. This is also known as the lie algebra of the 3d rotation group SO(3).
///
/// Trajectory interpolation walks along the geodesic between two rotations by scaling
/// the [`Skew3`] of their relative rotation.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Skew3(pub Vector3<f64>);

impl Skew3 {
    /// Converts the Skew3 to a Rotation3 matrix.
    pub fn rotation(self) -> Rotation3<f64> {
        self.into()
    }

    /// Converts the Skew3 into a Rotation3 matrix quickly, but only works when the rotation
    /// is very small.
    pub fn rotation_small(self) -> Rotation3<f64> {
        Rotation3::from_matrix(&(Matrix3::identity() + self.hat()))
    }

    /// This converts the Skew3 into its skew-symmetric matrix form.
    pub fn hat(self) -> Matrix3<f64> {
        self.0.cross_matrix()
    }

    /// The rotation angle in radians.
    pub fn angle(self) -> f64 {
        self.0.norm()
    }

    /// Scales the rotation angle while keeping the axis.
    #[must_use]
    pub fn scale(self, scale: f64) -> Self {
        Self(self.0 * scale)
    }
}

/// This is the exponential map.
impl From<Skew3> for Rotation3<f64> {
    fn from(w: Skew3) -> Self {
        // This check is done to avoid the degenerate case where the angle is near zero.
        let theta2 = w.0.norm_squared();
        if theta2 <= f64::epsilon() {
            w.rotation_small()
        } else {
            let theta = theta2.sqrt();
            let axis = Unit::new_unchecked(w.0 / theta);
            Self::from_axis_angle(&axis, theta)
        }
    }
}

/// This is the log map.
impl From<Rotation3<f64>> for Skew3 {
    fn from(r: Rotation3<f64>) -> Self {
        let skew3 = r.scaled_axis();
        // `scaled_axis` can produce NaN for rotations numerically at identity.
        let skew3 = if skew3.iter().any(|n| n.is_nan()) {
            Vector3::zeros()
        } else {
            skew3
        };
        Self(skew3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exp_log_round_trip() {
        let rotation = Rotation3::from_euler_angles(0.4, -0.1, 0.25);
        let skew: Skew3 = rotation.into();
        let back: Rotation3<f64> = skew.into();
        assert_relative_eq!(rotation, back, epsilon = 1e-12);
    }

    #[test]
    fn small_rotation_matches_exponential() {
        let skew = Skew3(Vector3::new(1e-9, -2e-9, 3e-9));
        assert_relative_eq!(skew.rotation_small(), skew.rotation(), epsilon = 1e-15);
        let v = Vector3::new(0.5, 1.0, -2.0);
        assert_relative_eq!(skew.hat() * v, skew.0.cross(&v), epsilon = 1e-15);
    }

    #[test]
    fn identity_log_is_zero() {
        let skew: Skew3 = Rotation3::identity().into();
        assert_eq!(skew.angle(), 0.0);
    }
}
