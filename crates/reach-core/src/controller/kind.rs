// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-kind controller geometry.
//!
//! Hands and VR controllers differ in where they hover from, which points
//! compete for the primary hover, what their contact skeleton looks like and
//! which grasp thresholds apply. Each difference is one `match` here.

use reach_geom::{Collider, Pose, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::ports::{ControllerFrame, INDEX, MIDDLE, THUMB};
use crate::settings::{ContactSettings, GraspSettings};

/// Closed set of controller variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Tracked hand, optionally with joint data.
    Hand,
    /// 6-DoF tracked device with a trigger.
    VrController,
}

impl ControllerKind {
    /// Primary-hover priority; lower wins.
    pub const fn priority(self) -> u8 {
        match self {
            Self::VrController => 0,
            Self::Hand => 1,
        }
    }

    /// Point hover distances are measured from.
    pub fn hover_point(self, frame: &ControllerFrame) -> Vec3 {
        match (self, frame.joints) {
            (Self::Hand, Some(j)) => j.palm.position,
            _ => frame.pose.position,
        }
    }

    /// Points competing for the primary hover: thumb, index and middle tips
    /// for articulated hands, the device tip otherwise.
    pub fn primary_hover_points(self, frame: &ControllerFrame) -> Vec<Vec3> {
        match (self, frame.joints) {
            (Self::Hand, Some(j)) => [THUMB, INDEX, MIDDLE]
                .iter()
                .filter_map(|f| j.tip(*f))
                .collect(),
            _ => vec![frame.pose.position],
        }
    }

    /// `(grasp, release)` thresholds for this kind.
    pub const fn grasp_thresholds(self, settings: &GraspSettings) -> (f32, f32) {
        match self {
            Self::Hand => (
                settings.hand_grasp_threshold,
                settings.hand_release_threshold,
            ),
            Self::VrController => (settings.vr_grasp_threshold, settings.vr_release_threshold),
        }
    }

    /// Bone colliders for a skeleton built from `frame`.
    ///
    /// Articulated hands get a palm box plus three capsules per finger; hands
    /// without joints get the palm box; devices get one tip sphere.
    pub fn bone_layout(self, frame: &ControllerFrame, settings: &ContactSettings) -> Vec<Collider> {
        match (self, frame.joints) {
            (Self::Hand, Some(j)) => {
                let mut out = vec![Collider::Box {
                    half_extents: settings.palm_half_extents,
                }];
                for finger in &j.fingers {
                    for seg in finger.windows(2) {
                        let half = seg[0].distance(seg[1]) * 0.5;
                        out.push(Collider::Capsule {
                            radius: settings.finger_radius,
                            half_height: (half - settings.finger_radius).max(0.0),
                        });
                    }
                }
                out
            }
            (Self::Hand, None) => vec![Collider::Box {
                half_extents: settings.palm_half_extents,
            }],
            (Self::VrController, _) => vec![Collider::Sphere {
                radius: settings.vr_tip_radius,
            }],
        }
    }

    /// Target poses for `bones` bones, in layout order.
    ///
    /// When joints disappear after an articulated skeleton was built, finger
    /// bones collapse onto the palm.
    pub fn bone_targets(self, frame: &ControllerFrame, bones: usize) -> Vec<Pose> {
        let palm = match (self, frame.joints) {
            (Self::Hand, Some(j)) => j.palm,
            _ => frame.pose,
        };
        let mut out = Vec::with_capacity(bones);
        out.push(palm);
        if let (Self::Hand, Some(j)) = (self, frame.joints) {
            for finger in &j.fingers {
                for seg in finger.windows(2) {
                    out.push(segment_pose(seg[0], seg[1]));
                }
            }
        }
        out.resize(bones, palm);
        out
    }
}

/// Pose of a capsule spanning `a → b` (capsules run along local Y).
fn segment_pose(a: Vec3, b: Vec3) -> Pose {
    let d = b - a;
    let rotation = if d.length_squared() > reach_geom::math::EPSILON {
        Quat::from_to(Vec3::UNIT_Y, d.normalize())
    } else {
        Quat::IDENTITY
    };
    Pose::new(a.lerp(b, 0.5), rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ControllerId;
    use crate::ports::HandJoints;

    fn hand_frame() -> ControllerFrame {
        let mut fingers = [[Vec3::ZERO; 4]; 5];
        for (i, f) in fingers.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f32 * 0.02;
            for (j, p) in f.iter_mut().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let y = 0.03 * j as f32;
                *p = Vec3::new(x, y, 0.0);
            }
        }
        let mut frame = ControllerFrame::tracked(ControllerId(1), Pose::IDENTITY);
        frame.joints = Some(HandJoints {
            palm: Pose::IDENTITY,
            fingers,
        });
        frame
    }

    #[test]
    fn articulated_hand_has_palm_and_fifteen_capsules() {
        let frame = hand_frame();
        let layout = ControllerKind::Hand.bone_layout(&frame, &ContactSettings::default());
        assert_eq!(layout.len(), 16);
        assert!(matches!(layout[0], Collider::Box { .. }));
        assert!(layout[1..]
            .iter()
            .all(|c| matches!(c, Collider::Capsule { .. })));
        assert_eq!(ControllerKind::Hand.bone_targets(&frame, 16).len(), 16);
    }

    #[test]
    fn finger_targets_collapse_without_joints() {
        let mut frame = hand_frame();
        frame.joints = None;
        frame.pose = Pose::from_position(Vec3::UNIT_Z);
        let targets = ControllerKind::Hand.bone_targets(&frame, 16);
        assert!(targets.iter().all(|p| p.position == Vec3::UNIT_Z));
    }

    #[test]
    fn primary_points_are_fingertips_for_hands_and_tip_for_devices() {
        let frame = hand_frame();
        let pts = ControllerKind::Hand.primary_hover_points(&frame);
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[1], frame.joints.unwrap().fingers[INDEX][3]);
        assert_eq!(
            ControllerKind::VrController.primary_hover_points(&frame),
            vec![frame.pose.position]
        );
        assert!(ControllerKind::VrController.priority() < ControllerKind::Hand.priority());
    }
}
