//! Euler angles with an explicit rotation order

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{MathError, Matrix4, Quaternion, Vector3};

/// Gimbal-lock threshold on the sine of the middle rotation
const GIMBAL_THRESHOLD: f64 = 0.999_999_9;

/// Axis order in which Euler rotations are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EulerOrder {
    /// X, then Y, then Z (matrix `Rx * Ry * Rz`)
    #[default]
    Xyz,
    /// Y, then X, then Z
    Yxz,
    /// Z, then X, then Y
    Zxy,
    /// Z, then Y, then X
    Zyx,
    /// Y, then Z, then X
    Yzx,
    /// X, then Z, then Y
    Xzy,
}

impl EulerOrder {
    /// Every supported order
    pub const ALL: [Self; 6] = [Self::Xyz, Self::Yxz, Self::Zxy, Self::Zyx, Self::Yzx, Self::Xzy];

    /// Canonical upper-case name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xyz => "XYZ",
            Self::Yxz => "YXZ",
            Self::Zxy => "ZXY",
            Self::Zyx => "ZYX",
            Self::Yzx => "YZX",
            Self::Xzy => "XZY",
        }
    }
}

impl fmt::Display for EulerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EulerOrder {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MathError::InvalidFormat(format!("unknown Euler order '{s}'")))
    }
}

/// Rotation expressed as three angles (radians) applied in `order`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Euler {
    /// Angle about X
    pub x: f64,
    /// Angle about Y
    pub y: f64,
    /// Angle about Z
    pub z: f64,
    /// Application order
    pub order: EulerOrder,
}

impl approx::AbsDiffEq for Euler {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.order == other.order
            && <Vector3 as approx::AbsDiffEq>::abs_diff_eq(
                &self.to_vector3(),
                &other.to_vector3(),
                epsilon,
            )
    }
}

impl approx::RelativeEq for Euler {
    fn default_max_relative() -> f64 {
        f64::EPSILON
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.order == other.order
            && <Vector3 as approx::RelativeEq>::relative_eq(
                &self.to_vector3(),
                &other.to_vector3(),
                epsilon,
                max_relative,
            )
    }
}

impl Euler {
    /// Create from angles and order
    pub const fn new(x: f64, y: f64, z: f64, order: EulerOrder) -> Self {
        Self { x, y, z, order }
    }

    /// Extract angles from the rotation part of `m` (must be unscaled)
    ///
    /// When the middle rotation is within the gimbal-lock threshold the last
    /// angle is pinned to zero and the remaining one absorbs the rotation.
    pub fn from_rotation_matrix(m: &Matrix4, order: EulerOrder) -> Self {
        let te = &m.elements;
        let (m11, m12, m13) = (te[0], te[4], te[8]);
        let (m21, m22, m23) = (te[1], te[5], te[9]);
        let (m31, m32, m33) = (te[2], te[6], te[10]);
        let clamp = |v: f64| v.clamp(-1.0, 1.0);

        let (x, y, z) = match order {
            EulerOrder::Xyz => {
                let y = clamp(m13).asin();
                if m13.abs() < GIMBAL_THRESHOLD {
                    ((-m23).atan2(m33), y, (-m12).atan2(m11))
                } else {
                    (m32.atan2(m22), y, 0.0)
                }
            }
            EulerOrder::Yxz => {
                let x = (-clamp(m23)).asin();
                if m23.abs() < GIMBAL_THRESHOLD {
                    (x, m13.atan2(m33), m21.atan2(m22))
                } else {
                    (x, (-m31).atan2(m11), 0.0)
                }
            }
            EulerOrder::Zxy => {
                let x = clamp(m32).asin();
                if m32.abs() < GIMBAL_THRESHOLD {
                    (x, (-m31).atan2(m33), (-m12).atan2(m22))
                } else {
                    (x, 0.0, m21.atan2(m11))
                }
            }
            EulerOrder::Zyx => {
                let y = (-clamp(m31)).asin();
                if m31.abs() < GIMBAL_THRESHOLD {
                    (m32.atan2(m33), y, m21.atan2(m11))
                } else {
                    (0.0, y, (-m12).atan2(m22))
                }
            }
            EulerOrder::Yzx => {
                let z = clamp(m21).asin();
                if m21.abs() < GIMBAL_THRESHOLD {
                    ((-m23).atan2(m22), (-m31).atan2(m11), z)
                } else {
                    (0.0, m13.atan2(m33), z)
                }
            }
            EulerOrder::Xzy => {
                let z = (-clamp(m12)).asin();
                if m12.abs() < GIMBAL_THRESHOLD {
                    (m32.atan2(m22), m13.atan2(m11), z)
                } else {
                    ((-m23).atan2(m33), 0.0, z)
                }
            }
        };

        Self::new(x, y, z, order)
    }

    /// Angles equivalent to a unit quaternion in `order`
    pub fn from_quaternion(q: &Quaternion, order: EulerOrder) -> Self {
        Self::from_rotation_matrix(&Matrix4::make_rotation_from_quaternion(q), order)
    }

    /// Same rotation expressed in another order
    #[must_use]
    pub fn reorder(&self, order: EulerOrder) -> Self {
        Self::from_quaternion(&Quaternion::from_euler(self), order)
    }

    /// Angles as a vector (order dropped)
    pub const fn to_vector3(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_quaternion_roundtrip_every_order() {
        let angles = [(0.1, -0.4, 0.9), (-1.2, 0.7, 1.5), (0.0, 0.0, 0.0), (1.4, -1.1, -0.3)];
        for order in EulerOrder::ALL {
            for (x, y, z) in angles {
                let euler = Euler::new(x, y, z, order);
                let back = Euler::from_quaternion(&Quaternion::from_euler(&euler), order);
                assert_relative_eq!(back, euler, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_matrix_matches_quaternion_every_order() {
        for order in EulerOrder::ALL {
            let euler = Euler::new(0.3, -0.6, 1.4, order);
            let from_euler = Matrix4::make_rotation_from_euler(&euler);
            let from_quat = Matrix4::make_rotation_from_quaternion(&Quaternion::from_euler(&euler));
            assert_relative_eq!(from_euler, from_quat, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gimbal_lock_preserves_composite_rotation() {
        for order in EulerOrder::ALL {
            // put the middle axis at a quarter turn
            let euler = match order {
                EulerOrder::Xyz | EulerOrder::Zyx => Euler::new(0.4, FRAC_PI_2, 0.3, order),
                EulerOrder::Yxz | EulerOrder::Zxy => Euler::new(FRAC_PI_2, 0.4, 0.3, order),
                EulerOrder::Yzx | EulerOrder::Xzy => Euler::new(0.4, 0.3, FRAC_PI_2, order),
            };
            let q = Quaternion::from_euler(&euler);
            let back = Euler::from_quaternion(&q, order);
            let recomposed = Quaternion::from_euler(&back);
            assert!(back.to_vector3().is_finite());
            assert_relative_eq!(recomposed.dot(&q).abs(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_reorder_keeps_rotation() {
        let euler = Euler::new(0.2, 0.5, -0.8, EulerOrder::Xyz);
        let reordered = euler.reorder(EulerOrder::Zyx);
        assert_eq!(reordered.order, EulerOrder::Zyx);
        let a = Quaternion::from_euler(&euler);
        let b = Quaternion::from_euler(&reordered);
        assert_relative_eq!(a.dot(&b).abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_order_parse() {
        assert_eq!("zxy".parse::<EulerOrder>(), Ok(EulerOrder::Zxy));
        assert_eq!(EulerOrder::Yzx.to_string(), "YZX");
        assert!(matches!("XXY".parse::<EulerOrder>(), Err(MathError::InvalidFormat(_))));
    }
}
