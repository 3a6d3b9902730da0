// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::{Vec3, EPSILON};

/// Rotation quaternion stored as `(x, y, z, w)`; angles are radians.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "[f32; 4]", into = "[f32; 4]")
)]
pub struct Quat {
    data: [f32; 4],
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Creates a quaternion from raw components (not normalised).
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { data: [x, y, z, w] }
    }

    /// Returns the identity rotation.
    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    /// Returns `(x, y, z, w)`.
    pub const fn to_array(self) -> [f32; 4] {
        self.data
    }

    fn vector(self) -> Vec3 {
        Vec3::new(self.data[0], self.data[1], self.data[2])
    }

    const fn w(self) -> f32 {
        self.data[3]
    }

    /// Rotation of `angle` radians about `axis`; identity for a degenerate axis.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalize();
        if axis == Vec3::ZERO {
            return Self::IDENTITY;
        }
        let (s, c) = (angle * 0.5).sin_cos();
        let v = axis * s;
        Self::new(v.x(), v.y(), v.z(), c)
    }

    /// Shortest-arc rotation taking direction `from` onto direction `to`.
    ///
    /// Anti-parallel inputs rotate half a turn about any axis orthogonal to
    /// `from`. Degenerate inputs yield identity.
    pub fn from_to(from: Vec3, to: Vec3) -> Self {
        let a = from.normalize();
        let b = to.normalize();
        if a == Vec3::ZERO || b == Vec3::ZERO {
            return Self::IDENTITY;
        }
        let d = a.dot(b);
        if d >= 1.0 - EPSILON {
            return Self::IDENTITY;
        }
        if d <= -1.0 + EPSILON {
            let mut ortho = Vec3::UNIT_X.cross(a);
            if ortho.length_squared() <= EPSILON {
                ortho = Vec3::UNIT_Y.cross(a);
            }
            return Self::from_axis_angle(ortho, core::f32::consts::PI);
        }
        let c = a.cross(b);
        Self::new(c.x(), c.y(), c.z(), 1.0 + d).normalize()
    }

    /// Hamilton product `self * other` (apply `other`, then `self`).
    pub fn multiply(self, other: Self) -> Self {
        let [ax, ay, az, aw] = self.data;
        let [bx, by, bz, bw] = other.data;
        Self::new(
            aw * bx + ax * bw + ay * bz - az * by,
            aw * by - ax * bz + ay * bw + az * bx,
            aw * bz + ax * by - ay * bx + az * bw,
            aw * bw - ax * bx - ay * by - az * bz,
        )
    }

    /// Conjugate; the inverse rotation for unit quaternions.
    pub fn conjugate(self) -> Self {
        let [x, y, z, w] = self.data;
        Self::new(-x, -y, -z, w)
    }

    /// Four-component dot product.
    pub fn dot(self, other: Self) -> f32 {
        let [ax, ay, az, aw] = self.data;
        let [bx, by, bz, bw] = other.data;
        ax * bx + ay * by + az * bz + aw * bw
    }

    /// Unit quaternion; identity when the norm is ~0.
    pub fn normalize(self) -> Self {
        let len = self.dot(self).sqrt();
        if len <= EPSILON {
            return Self::IDENTITY;
        }
        let inv = 1.0 / len;
        let [x, y, z, w] = self.data;
        Self::new(x * inv, y * inv, z * inv, w * inv)
    }

    /// Rotates `v` by this (unit) quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w(q × v) + 2 q × (q × v)
        let q = self.vector();
        let t = q.cross(v) * 2.0;
        v + t * self.w() + q.cross(t)
    }

    /// Normalised linear blend along the shorter arc.
    pub fn nlerp(self, other: Self, t: f32) -> Self {
        let other = if self.dot(other) < 0.0 {
            Self::new(-other.data[0], -other.data[1], -other.data[2], -other.data[3])
        } else {
            other
        };
        let mut out = [0.0f32; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.data[i] + (other.data[i] - self.data[i]) * t;
        }
        Self::from(out).normalize()
    }

    /// Angle in radians between two unit rotations.
    pub fn angle_to(self, other: Self) -> f32 {
        let d = self.dot(other).abs().min(1.0);
        2.0 * d.acos()
    }
}

impl From<[f32; 4]> for Quat {
    fn from(value: [f32; 4]) -> Self {
        Self { data: value }
    }
}

impl From<Quat> for [f32; 4] {
    fn from(value: Quat) -> Self {
        value.data
    }
}
