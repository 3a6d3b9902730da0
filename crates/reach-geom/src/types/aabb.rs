// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::Vec3;

/// Axis-aligned bounding box in world coordinates.
///
/// Invariant: `min` components are less than or equal to `max` components.
/// Constructors order their inputs component-wise so the invariant always holds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    /// Builds a box from two opposite corners (in any order).
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Box centred at `center` with half-extents `he` (absolute values used).
    pub fn from_center_half_extents(center: Vec3, he: Vec3) -> Self {
        let he = he.abs();
        Self {
            min: center - he,
            max: center + he,
        }
    }

    /// Cube bounding a sphere.
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self::from_center_half_extents(center, Vec3::splat(radius))
    }

    /// Minimal box containing all `points`; `None` when empty.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut out = Self {
            min: *first,
            max: *first,
        };
        for p in rest {
            out.min = out.min.min(*p);
            out.max = out.max.max(*p);
        }
        Some(out)
    }

    /// Minimum corner.
    pub const fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner.
    pub const fn max(&self) -> Vec3 {
        self.max
    }

    /// Centre point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-extents.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// `true` if this box overlaps `other` (inclusive on faces).
    pub fn overlaps(&self, other: &Self) -> bool {
        let (a0, a1) = (self.min.to_array(), self.max.to_array());
        let (b0, b1) = (other.min.to_array(), other.max.to_array());
        (0..3).all(|i| a1[i] >= b0[i] && a0[i] <= b1[i])
    }

    /// `true` if `p` lies inside or on the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.clamp(self.min, self.max) == p
    }

    /// Closest point on or inside the box to `p`.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    /// Squared distance from `p` to the box (zero inside).
    pub fn distance_squared_to(&self, p: Vec3) -> f32 {
        (self.closest_point(p) - p).length_squared()
    }

    /// `true` if the sphere touches the box.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.distance_squared_to(center) <= radius * radius
    }

    /// Union of two boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grows the box by `m` in every direction.
    pub fn inflate(&self, m: f32) -> Self {
        let d = Vec3::splat(m);
        Self::new(self.min - d, self.max + d)
    }
}
