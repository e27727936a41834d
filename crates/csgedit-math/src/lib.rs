#![warn(missing_docs)]

//! Math types for the csgedit object database.
//!
//! Thin wrappers around nalgebra providing the 4x4 homogeneous transforms
//! stored on combination leaves, plus the tolerance used to decide whether
//! two transforms are "the same placement".

use nalgebra::{Matrix4, Rotation3, Unit, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Position in model space.
pub type Point3 = nalgebra::Point3<f64>;

/// Displacement or axis in model space.
pub type Vec3 = Vector3<f64>;

/// Unit-length axis.
pub type Dir3 = Unit<Vector3<f64>>;

/// Homogeneous placement matrix carried on a combination leaf.
///
/// Serialized as 16 numbers in row-major order, translation in elements
/// 3, 7 and 11.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 16]", into = "[f64; 16]")]
pub struct Transform {
    /// Column-major storage; element `(row, col)`.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// The transform that leaves every point where it is.
    pub fn identity() -> Self {
        Self::from_matrix(Matrix4::identity())
    }

    /// Wrap a raw homogeneous matrix.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Move by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self::from_matrix(Matrix4::new_translation(&Vec3::new(dx, dy, dz)))
    }

    /// Stretch each axis independently.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self::from_matrix(Matrix4::new_nonuniform_scaling(&Vec3::new(sx, sy, sz)))
    }

    /// Turn `angle` radians about the world X axis.
    pub fn rotation_x(angle: f64) -> Self {
        Self::about(Vec3::x_axis(), angle)
    }

    /// Turn `angle` radians about the world Y axis.
    pub fn rotation_y(angle: f64) -> Self {
        Self::about(Vec3::y_axis(), angle)
    }

    /// Turn `angle` radians about the world Z axis.
    pub fn rotation_z(angle: f64) -> Self {
        Self::about(Vec3::z_axis(), angle)
    }

    fn about(axis: Dir3, angle: f64) -> Self {
        Self::from_matrix(Rotation3::from_axis_angle(&axis, angle).to_homogeneous())
    }

    /// Frame transform whose columns are the given axes, placed at `origin`.
    ///
    /// Maps the local unit axes onto `x`, `y`, `z` and the local origin onto
    /// `origin`. The axes are used as given; callers pass orthonormal axes to
    /// get a rigid frame.
    pub fn from_frame(origin: &Point3, x: &Vec3, y: &Vec3, z: &Vec3) -> Self {
        let mut m = Matrix4::identity();
        for row in 0..3 {
            m[(row, 0)] = x[row];
            m[(row, 1)] = y[row];
            m[(row, 2)] = z[row];
            m[(row, 3)] = origin[row];
        }
        Self { matrix: m }
    }

    /// Build from 16 values in row-major order.
    pub fn from_row_major(values: [f64; 16]) -> Self {
        Self {
            matrix: Matrix4::from_row_slice(&values),
        }
    }

    /// The 16 values in row-major order.
    pub fn to_row_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = self.matrix[(row, col)];
            }
        }
        out
    }

    /// Matrix product `self * other`.
    ///
    /// Applying the result to a point applies `other` first, then `self`,
    /// which is how a parent's accumulated matrix composes with a leaf
    /// matrix below it.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Map a point, dividing through by `w` when it is not 1.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        if v.w != 0.0 && v.w != 1.0 {
            Point3::new(v.x / v.w, v.y / v.w, v.z / v.w)
        } else {
            Point3::new(v.x, v.y, v.z)
        }
    }

    /// Map a vector. Translation has no effect on vectors.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Undo this placement. `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    /// Lengths of the images of the three unit axes.
    pub fn axis_scales(&self) -> Vec3 {
        Vec3::new(
            self.apply_vec(&Vec3::x()).norm(),
            self.apply_vec(&Vec3::y()).norm(),
            self.apply_vec(&Vec3::z()).norm(),
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f64; 16]> for Transform {
    fn from(values: [f64; 16]) -> Self {
        Self::from_row_major(values)
    }
}

impl From<Transform> for [f64; 16] {
    fn from(t: Transform) -> Self {
        t.to_row_major()
    }
}

/// Tolerances for geometric and matrix comparisons.
///
/// `dist` bounds the translation elements of a matrix, `perp` bounds the
/// rotation/scale and homogeneous elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Bound on translation terms and point distances, in model units.
    pub dist: f64,
    /// Dimensionless tolerance for direction cosines and scale factors.
    pub perp: f64,
}

impl Tolerance {
    /// Default modeling tolerances (0.0005 mm, 1e-6).
    pub const DEFAULT: Self = Self {
        dist: 0.0005,
        perp: 1e-6,
    };

    /// Element-wise comparison, `dist` for translation terms and `perp` elsewhere.
    pub fn matrices_equal(&self, a: &Transform, b: &Transform) -> bool {
        for row in 0..4 {
            for col in 0..4 {
                let diff = (a.matrix[(row, col)] - b.matrix[(row, col)]).abs();
                let limit = if col == 3 && row < 3 {
                    self.dist
                } else {
                    self.perp
                };
                if diff > limit {
                    return false;
                }
            }
        }
        true
    }

    /// Whether `t` places nothing anywhere new.
    pub fn is_identity(&self, t: &Transform) -> bool {
        self.matrices_equal(t, &Transform::identity())
    }

    /// Points closer than `dist`.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.dist
    }

    /// Vectors whose difference is shorter than `dist`.
    pub fn vecs_equal(&self, a: &Vec3, b: &Vec3) -> bool {
        (a - b).norm() < self.dist
    }

    /// A length shorter than `dist`.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.dist
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
