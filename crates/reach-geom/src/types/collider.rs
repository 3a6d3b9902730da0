// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::Vec3;
use crate::types::{aabb::Aabb, pose::Pose};

/// Primitive collider shape in body-local space.
///
/// The shape is placed in the world by a [`Pose`]. Closest-point queries treat
/// the shape as solid: any point inside reports itself as the closest point and
/// a distance of zero.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Collider {
    /// Sphere centred on the body origin.
    Sphere {
        /// Radius in metres.
        radius: f32,
    },
    /// Oriented box centred on the body origin.
    Box {
        /// Half-extents along local X/Y/Z.
        half_extents: Vec3,
    },
    /// Capsule whose core segment runs along local Y from `-half_height` to
    /// `+half_height`.
    Capsule {
        /// Radius in metres.
        radius: f32,
        /// Half the length of the core segment.
        half_height: f32,
    },
}

impl Collider {
    /// Closest point on or inside the placed shape to world point `p`.
    pub fn closest_point(&self, pose: &Pose, p: Vec3) -> Vec3 {
        match *self {
            Self::Sphere { radius } => {
                let d = p - pose.position;
                let len = d.length();
                if len <= radius {
                    p
                } else {
                    pose.position + d * (radius / len)
                }
            }
            Self::Box { half_extents } => {
                let local = pose.inverse_transform_point(p);
                let he = half_extents.abs();
                pose.transform_point(local.clamp(-he, he))
            }
            Self::Capsule {
                radius,
                half_height,
            } => {
                let local = pose.inverse_transform_point(p);
                let h = half_height.abs();
                let core = Vec3::new(0.0, local.y().clamp(-h, h), 0.0);
                let d = local - core;
                let len = d.length();
                if len <= radius {
                    p
                } else {
                    pose.transform_point(core + d * (radius / len))
                }
            }
        }
    }

    /// Distance from `p` to the placed shape (zero inside).
    pub fn distance(&self, pose: &Pose, p: Vec3) -> f32 {
        self.closest_point(pose, p).distance(p)
    }

    /// Tight world-space AABB for the placed shape.
    pub fn world_aabb(&self, pose: &Pose) -> Aabb {
        match *self {
            Self::Sphere { radius } => Aabb::from_sphere(pose.position, radius),
            Self::Box { half_extents } => {
                Aabb::from_center_half_extents(pose.position, rotated_extent(pose, half_extents))
            }
            Self::Capsule {
                radius,
                half_height,
            } => {
                let axis = pose.rotation.rotate(Vec3::new(0.0, half_height, 0.0)).abs();
                Aabb::from_center_half_extents(pose.position, axis + Vec3::splat(radius))
            }
        }
    }

    /// Radius of a sphere about the body origin that encloses the shape.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Self::Sphere { radius } => radius,
            Self::Box { half_extents } => half_extents.length(),
            Self::Capsule {
                radius,
                half_height,
            } => radius + half_height.abs(),
        }
    }
}

/// Half-extents of the world AABB enclosing an oriented box.
fn rotated_extent(pose: &Pose, he: Vec3) -> Vec3 {
    let ax = pose.rotation.rotate(Vec3::new(he.x(), 0.0, 0.0)).abs();
    let ay = pose.rotation.rotate(Vec3::new(0.0, he.y(), 0.0)).abs();
    let az = pose.rotation.rotate(Vec3::new(0.0, 0.0, he.z())).abs();
    ax + ay + az
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;

    #[test]
    fn capsule_closest_point_clamps_to_core_segment() {
        let c = Collider::Capsule {
            radius: 0.5,
            half_height: 1.0,
        };
        let pose = Pose::IDENTITY;
        let q = c.closest_point(&pose, Vec3::new(0.0, 3.0, 0.0));
        assert!((q.y() - 1.5).abs() < 1e-6, "got {q:?}");
        assert!(c.distance(&pose, Vec3::new(0.25, 0.5, 0.0)) == 0.0);
    }

    #[test]
    fn rotated_box_aabb_grows() {
        let c = Collider::Box {
            half_extents: Vec3::new(1.0, 0.1, 0.1),
        };
        let pose = Pose::new(
            Vec3::ZERO,
            Quat::from_axis_angle(Vec3::UNIT_Z, core::f32::consts::FRAC_PI_2),
        );
        let bb = c.world_aabb(&pose);
        assert!((bb.max().y() - 1.0).abs() < 1e-5);
        assert!((bb.max().x() - 0.1).abs() < 1e-5);
    }
}
