//! Math utilities and types
//!
//! Value types for 3D graphics: vectors, matrices, quaternions, Euler angles,
//! colors and the bounding/culling primitives built on them.
//!
//! All types are `Copy` and operate on `f64`. Matrices store their elements in
//! column-major order. Degenerate inputs resolve to defined sentinels instead of
//! propagating NaN: normalizing a zero vector yields the zero vector and
//! inverting a singular matrix yields the zero matrix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Implements `approx` comparison traits component-wise for a struct of `f64` fields.
macro_rules! impl_approx_fields {
    ($ty:ty, $($field:ident),+) => {
        impl approx::AbsDiffEq for $ty {
            type Epsilon = f64;

            fn default_epsilon() -> f64 {
                f64::EPSILON
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
                $(approx::AbsDiffEq::abs_diff_eq(&self.$field, &other.$field, epsilon))&&+
            }
        }

        impl approx::RelativeEq for $ty {
            fn default_max_relative() -> f64 {
                f64::EPSILON
            }

            fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
                $(approx::RelativeEq::relative_eq(&self.$field, &other.$field, epsilon, max_relative))&&+
            }
        }
    };
}

/// Implements `approx` comparison traits for a type with an `elements` array.
macro_rules! impl_approx_elements {
    ($ty:ty) => {
        impl approx::AbsDiffEq for $ty {
            type Epsilon = f64;

            fn default_epsilon() -> f64 {
                f64::EPSILON
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
                self.elements
                    .iter()
                    .zip(other.elements.iter())
                    .all(|(a, b)| <f64 as approx::AbsDiffEq>::abs_diff_eq(a, b, epsilon))
            }
        }

        impl approx::RelativeEq for $ty {
            fn default_max_relative() -> f64 {
                f64::EPSILON
            }

            fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
                self.elements
                    .iter()
                    .zip(other.elements.iter())
                    .all(|(a, b)| <f64 as approx::RelativeEq>::relative_eq(a, b, epsilon, max_relative))
            }
        }
    };
}

mod vector2;
mod vector3;
mod vector4;
mod matrix3;
mod matrix4;
mod quaternion;
mod euler;
mod color;
mod bounds;
mod plane;
mod frustum;
mod interop;

pub use vector2::Vector2;
pub use vector3::Vector3;
pub use vector4::Vector4;
pub use matrix3::Matrix3;
pub use matrix4::Matrix4;
pub use quaternion::Quaternion;
pub use euler::{Euler, EulerOrder};
pub use color::{linear_to_srgb, srgb_to_linear, Color, ColorSpace, Hsl};
pub use bounds::{Box3, Sphere};
pub use plane::Plane;
pub use frustum::Frustum;

/// Errors raised by math kernel operations
///
/// These are programming-error class violations (bad indices, unsupported
/// formats), not recoverable runtime conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// A component or element index was outside the valid range
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of addressable components
        len: usize,
    },

    /// A value could not be interpreted in the requested format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// An unknown clip-space coordinate system was requested
    #[error("Invalid coordinate system: {0}")]
    InvalidCoordinateSystem(String),
}

/// Result type for math operations
pub type MathResult<T> = Result<T, MathError>;

/// Clip-space depth convention used when building projection matrices and frustums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Normalized device depth in `[-1, 1]`
    #[default]
    OpenGl,
    /// Normalized device depth in `[0, 1]`
    WebGpu,
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenGl => write!(f, "opengl"),
            Self::WebGpu => write!(f, "webgpu"),
        }
    }
}

impl FromStr for CoordinateSystem {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opengl" | "webgl" | "gl" => Ok(Self::OpenGl),
            "webgpu" | "vulkan" | "wgpu" => Ok(Self::WebGpu),
            other => Err(MathError::InvalidCoordinateSystem(other.to_string())),
        }
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f64 = std::f64::consts::PI;

    /// 2 * Pi
    pub const TAU: f64 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f64 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f64 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f64 = 180.0 / PI;

    /// Tolerance used by the kernel when detecting near-degenerate inputs
    pub const EPSILON: f64 = f64::EPSILON;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * constants::RAD_TO_DEG
    }

    /// Clamp a value between min and max
    pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    /// Linear interpolation
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }

    /// Modulo that always returns a value with the sign of the divisor
    pub fn euclidean_modulo(n: f64, m: f64) -> f64 {
        ((n % m) + m) % m
    }

    /// Map `value` from range `[a1, a2]` to `[b1, b2]`
    pub fn map_linear(value: f64, a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
        b1 + (value - a1) * (b2 - b1) / (a2 - a1)
    }

    /// Hermite smoothstep between `min` and `max`
    pub fn smoothstep(x: f64, min: f64, max: f64) -> f64 {
        if x <= min {
            return 0.0;
        }
        if x >= max {
            return 1.0;
        }
        let t = (x - min) / (max - min);
        t * t * (3.0 - 2.0 * t)
    }

    /// True when `value` is a power of two
    pub fn is_power_of_two(value: u32) -> bool {
        value != 0 && (value & (value - 1)) == 0
    }

    /// Smallest power of two greater than or equal to `value`
    pub fn ceil_power_of_two(value: u32) -> u32 {
        value.max(1).next_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_coordinate_system_parse() {
        assert_eq!("opengl".parse::<CoordinateSystem>(), Ok(CoordinateSystem::OpenGl));
        assert_eq!("WebGPU".parse::<CoordinateSystem>(), Ok(CoordinateSystem::WebGpu));
        assert_eq!(
            "directx".parse::<CoordinateSystem>(),
            Err(MathError::InvalidCoordinateSystem("directx".to_string()))
        );
    }

    #[test]
    fn test_utils() {
        assert_relative_eq!(utils::deg_to_rad(180.0), constants::PI);
        assert_relative_eq!(utils::euclidean_modulo(-0.25, 1.0), 0.75);
        assert_relative_eq!(utils::smoothstep(0.5, 0.0, 1.0), 0.5);
        assert_eq!(utils::ceil_power_of_two(300), 512);
        assert!(utils::is_power_of_two(64));
        assert!(!utils::is_power_of_two(0));
    }
}
