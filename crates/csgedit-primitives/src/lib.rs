#![warn(missing_docs)]

//! Primitive solids for the csgedit object database.
//!
//! Each primitive stores its own placement in its parameters (a vertex and
//! a set of axis vectors), so moving a solid means rewriting those
//! parameters. [`Primitive::transform`] bakes a matrix into the parameters
//! and [`Primitive::natural_frame`] recovers the rigid placement a
//! parameter set implies.

pub mod error;

pub use error::{PrimitiveError, Result};

use csgedit_math::{Point3, Tolerance, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// Relative slack allowed between axis scales before a torus transform is
/// considered non-uniform.
const UNIFORM_SCALE_EPS: f64 = 1e-6;

/// A primitive solid's internal representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Primitive {
    /// Ellipsoid with center `v` and semi-axes `a`, `b`, `c`.
    Ell {
        /// Center.
        v: Point3,
        /// First semi-axis.
        a: Vec3,
        /// Second semi-axis.
        b: Vec3,
        /// Third semi-axis.
        c: Vec3,
    },
    /// Truncated general cone: base vertex `v`, height vector `h`,
    /// base ellipse axes `a`, `b` and top ellipse axes `c`, `d`.
    Tgc {
        /// Base center.
        v: Point3,
        /// Height vector from base to top.
        h: Vec3,
        /// Base ellipse first axis.
        a: Vec3,
        /// Base ellipse second axis.
        b: Vec3,
        /// Top ellipse first axis.
        c: Vec3,
        /// Top ellipse second axis.
        d: Vec3,
    },
    /// Convex solid with eight vertices (box, wedge).
    ///
    /// Vertices 0..4 form the bottom face, 4..8 the top face.
    Arb8 {
        /// The eight vertices.
        pts: [Point3; 8],
    },
    /// Torus with center `v` and unit normal `h`.
    Tor {
        /// Center.
        v: Point3,
        /// Unit normal of the torus plane.
        h: Vec3,
        /// Radius from the center to the tube center.
        r_a: f64,
        /// Tube radius.
        r_h: f64,
    },
}

/// Sphere of radius `r` centered at `center`.
pub fn make_sphere(center: Point3, r: f64) -> Primitive {
    make_ellipsoid(center, Vec3::new(r, r, r))
}

/// Axis-aligned ellipsoid with the given semi-axis lengths.
pub fn make_ellipsoid(center: Point3, radii: Vec3) -> Primitive {
    Primitive::Ell {
        v: center,
        a: Vec3::x() * radii.x,
        b: Vec3::y() * radii.y,
        c: Vec3::z() * radii.z,
    }
}

/// Right circular cylinder from `base` along `height`.
pub fn make_rcc(base: Point3, height: Vec3, r: f64) -> Primitive {
    make_trc(base, height, r, r)
}

/// Truncated right cone from `base` along `height`, radius `r1` at the base
/// and `r2` at the top.
pub fn make_trc(base: Point3, height: Vec3, r1: f64, r2: f64) -> Primitive {
    let axis = height.normalize();
    let x = perpendicular(&axis);
    let y = axis.cross(&x);
    Primitive::Tgc {
        v: base,
        h: height,
        a: x * r1,
        b: y * r1,
        c: x * r2,
        d: y * r2,
    }
}

/// Axis-aligned box spanning `min` to `max`.
///
/// Vertex layout (corner 0 at `min`):
/// ```text
///     p4----p5
///    /|    /|
///   p7----p6|    z
///   | p0--|-p1   | y
///   |/    |/     |/
///   p3----p2     +---x
/// ```
pub fn make_rpp(min: Point3, max: Point3) -> Primitive {
    Primitive::Arb8 {
        pts: [
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ],
    }
}

/// Torus centered at `center` in the plane normal to `normal`.
pub fn make_torus(center: Point3, normal: Vec3, r_a: f64, r_h: f64) -> Primitive {
    Primitive::Tor {
        v: center,
        h: normal.normalize(),
        r_a,
        r_h,
    }
}

impl Primitive {
    /// Short kind name ("ell", "tgc", "arb8", "tor").
    pub fn kind_name(&self) -> &'static str {
        match self {
            Primitive::Ell { .. } => "ell",
            Primitive::Tgc { .. } => "tgc",
            Primitive::Arb8 { .. } => "arb8",
            Primitive::Tor { .. } => "tor",
        }
    }

    /// The primitive's reference vertex.
    pub fn vertex(&self) -> Point3 {
        match self {
            Primitive::Ell { v, .. } | Primitive::Tgc { v, .. } | Primitive::Tor { v, .. } => *v,
            Primitive::Arb8 { pts } => pts[0],
        }
    }

    /// Bake `xform` into the primitive's parameters.
    ///
    /// Points map as points and axis vectors as vectors, so any invertible
    /// affine matrix is representable except for the torus, whose circular
    /// cross-section only survives a uniform scale.
    pub fn transform(&self, xform: &Transform) -> Result<Primitive> {
        if xform.inverse().is_none() {
            return Err(PrimitiveError::Singular);
        }
        let out = match self {
            Primitive::Ell { v, a, b, c } => Primitive::Ell {
                v: xform.apply_point(v),
                a: xform.apply_vec(a),
                b: xform.apply_vec(b),
                c: xform.apply_vec(c),
            },
            Primitive::Tgc { v, h, a, b, c, d } => Primitive::Tgc {
                v: xform.apply_point(v),
                h: xform.apply_vec(h),
                a: xform.apply_vec(a),
                b: xform.apply_vec(b),
                c: xform.apply_vec(c),
                d: xform.apply_vec(d),
            },
            Primitive::Arb8 { pts } => Primitive::Arb8 {
                pts: pts.map(|p| xform.apply_point(&p)),
            },
            Primitive::Tor { v, h, r_a, r_h } => {
                let s = xform.axis_scales();
                let max = s.x.max(s.y).max(s.z);
                let min = s.x.min(s.y).min(s.z);
                if max - min > UNIFORM_SCALE_EPS * max {
                    return Err(PrimitiveError::NonUniformScale {
                        kind: "tor",
                        sx: s.x,
                        sy: s.y,
                        sz: s.z,
                    });
                }
                let normal = xform.apply_vec(h);
                if normal.norm() == 0.0 {
                    return Err(PrimitiveError::Degenerate("tor"));
                }
                Primitive::Tor {
                    v: xform.apply_point(v),
                    h: normal.normalize(),
                    r_a: r_a * max,
                    r_h: r_h * max,
                }
            }
        };
        Ok(out)
    }

    /// The rigid placement implied by the primitive's parameters.
    ///
    /// The frame's origin is the primitive's vertex and its axes follow the
    /// primitive's leading axis vectors, orthonormalized. Applying the
    /// inverse of the frame leaves the primitive at the origin and axis
    /// aligned; a primitive already in that state has the identity frame.
    pub fn natural_frame(&self) -> Transform {
        let (origin, x, z) = match self {
            Primitive::Ell { v, a, c, .. } => {
                let (x, z) = orthonormal_pair(a, c, &Vec3::x(), &Vec3::z());
                (*v, x, z)
            }
            Primitive::Tgc { v, h, a, .. } => {
                let (z, x) = orthonormal_pair(h, a, &Vec3::z(), &Vec3::x());
                (*v, x, z)
            }
            Primitive::Arb8 { pts } => {
                let (x, z) = orthonormal_pair(
                    &(pts[1] - pts[0]),
                    &(pts[4] - pts[0]),
                    &Vec3::x(),
                    &Vec3::z(),
                );
                (pts[0], x, z)
            }
            Primitive::Tor { v, h, .. } => {
                let z = if h.norm() > 0.0 { h.normalize() } else { Vec3::z() };
                (*v, perpendicular(&z), z)
            }
        };
        let y = z.cross(&x);
        Transform::from_frame(&origin, &x, &y, &z)
    }

    /// Move the primitive into its natural frame.
    ///
    /// Returns the canonical primitive together with the frame that places
    /// it back where it was.
    pub fn canonicalize(&self) -> Result<(Primitive, Transform)> {
        let frame = self.natural_frame();
        let inverse = frame.inverse().ok_or(PrimitiveError::Singular)?;
        Ok((self.transform(&inverse)?, frame))
    }

    /// Parameter-wise comparison within `tol`.
    pub fn approx_eq(&self, other: &Primitive, tol: &Tolerance) -> bool {
        match (self, other) {
            (
                Primitive::Ell { v, a, b, c },
                Primitive::Ell {
                    v: v2,
                    a: a2,
                    b: b2,
                    c: c2,
                },
            ) => {
                tol.points_equal(v, v2)
                    && tol.vecs_equal(a, a2)
                    && tol.vecs_equal(b, b2)
                    && tol.vecs_equal(c, c2)
            }
            (
                Primitive::Tgc { v, h, a, b, c, d },
                Primitive::Tgc {
                    v: v2,
                    h: h2,
                    a: a2,
                    b: b2,
                    c: c2,
                    d: d2,
                },
            ) => {
                tol.points_equal(v, v2)
                    && tol.vecs_equal(h, h2)
                    && tol.vecs_equal(a, a2)
                    && tol.vecs_equal(b, b2)
                    && tol.vecs_equal(c, c2)
                    && tol.vecs_equal(d, d2)
            }
            (Primitive::Arb8 { pts }, Primitive::Arb8 { pts: pts2 }) => pts
                .iter()
                .zip(pts2.iter())
                .all(|(p, q)| tol.points_equal(p, q)),
            (
                Primitive::Tor { v, h, r_a, r_h },
                Primitive::Tor {
                    v: v2,
                    h: h2,
                    r_a: ra2,
                    r_h: rh2,
                },
            ) => {
                tol.points_equal(v, v2)
                    && (h - h2).norm() < tol.perp.max(1e-9) * 10.0
                    && tol.is_zero(r_a - ra2)
                    && tol.is_zero(r_h - rh2)
            }
            _ => false,
        }
    }
}

/// A unit vector perpendicular to the unit vector `n`.
fn perpendicular(n: &Vec3) -> Vec3 {
    let seed = if n.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    (seed - n * seed.dot(n)).normalize()
}

/// Orthonormalize `first` and `second` (Gram-Schmidt), falling back to the
/// given defaults when either is zero or the two are parallel.
fn orthonormal_pair(first: &Vec3, second: &Vec3, first_default: &Vec3, second_default: &Vec3) -> (Vec3, Vec3) {
    let len = first.norm();
    if len == 0.0 {
        return (*first_default, *second_default);
    }
    let u = first / len;
    let w = second - u * second.dot(&u);
    let w_len = w.norm();
    if w_len <= 1e-12 * second.norm().max(1.0) {
        return (u, perpendicular(&u));
    }
    (u, w / w_len)
}
