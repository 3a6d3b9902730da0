// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::{Quat, Vec3};

/// Rigid pose: rotation followed by translation, no scale.
///
/// Tracked controllers, contact bones and interaction objects are all placed
/// with a `Pose`. Composition follows the usual parent-child rule:
/// `parent.compose(&child)` maps child-local points into the parent's space.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// World-space position in metres.
    pub position: Vec3,
    /// Orientation (unit quaternion).
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: Quat,
}

impl Pose {
    /// Identity pose at the origin.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Pose from components.
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Unrotated pose at `position`.
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Maps a local point into world space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.rotation.rotate(local) + self.position
    }

    /// Maps a world point into this pose's local space.
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.conjugate().rotate(world - self.position)
    }

    /// Inverse pose.
    pub fn inverse(&self) -> Self {
        let inv = self.rotation.conjugate();
        Self::new(inv.rotate(-self.position), inv)
    }

    /// `self ∘ child`: the child pose expressed in this pose's parent space.
    pub fn compose(&self, child: &Self) -> Self {
        Self::new(
            self.transform_point(child.position),
            self.rotation.multiply(child.rotation).normalize(),
        )
    }

    /// Pose of `other` relative to `self` (`self⁻¹ ∘ other`).
    pub fn relative(&self, other: &Self) -> Self {
        self.inverse().compose(other)
    }

    /// Interpolates position linearly and rotation by normalised blend.
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self::new(
            self.position.lerp(other.position, t),
            self.rotation.nlerp(other.rotation, t),
        )
    }
}
