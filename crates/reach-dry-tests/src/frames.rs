// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Controller frame builders for tests.

use reach_core::{Chirality, ControllerFrame, ControllerId, HandJoints};
use reach_geom::{Pose, Vec3};

/// Lateral spacing between finger knuckles.
const FINGER_SPACING: f32 = 0.02;
/// Knuckle offset from the palm centre along +Z.
const KNUCKLE_OFFSET: f32 = 0.04;
/// Joint spacing along each finger.
const JOINT_SPACING: f32 = 0.025;

/// Builder for [`ControllerFrame`]s.
///
/// Articulated hands are laid out flat: the palm at the frame position,
/// fingers pointing along +Z, thumb at −X.
///
/// # Example
///
/// ```
/// use reach_dry_tests::FrameBuilder;
///
/// let frame = FrameBuilder::hand(2).at(0.0, 1.0, 0.0).grasp(1.0).build();
///
/// assert!(frame.is_tracked);
/// assert!(frame.joints.is_some());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FrameBuilder {
    id: ControllerId,
    chirality: Chirality,
    position: Vec3,
    tracked: bool,
    strength: f32,
    articulated: bool,
}

impl FrameBuilder {
    fn with(id: u32, articulated: bool) -> Self {
        Self {
            id: ControllerId(id),
            chirality: Chirality::None,
            position: Vec3::ZERO,
            tracked: true,
            strength: 0.0,
            articulated,
        }
    }

    /// A VR controller frame (no joints).
    pub fn vr(id: u32) -> Self {
        Self::with(id, false)
    }

    /// An articulated hand frame.
    pub fn hand(id: u32) -> Self {
        Self::with(id, true)
    }

    /// A hand frame without joint data.
    pub fn flat_hand(id: u32) -> Self {
        Self::with(id, false)
    }

    /// Place the frame at `(x, y, z)`.
    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    /// Place the frame at `position`.
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the grasp strength.
    pub fn grasp(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    /// Set the handedness.
    pub fn chirality(mut self, chirality: Chirality) -> Self {
        self.chirality = chirality;
        self
    }

    /// Mark the frame untracked.
    pub fn untracked(mut self) -> Self {
        self.tracked = false;
        self
    }

    /// Build the frame.
    pub fn build(self) -> ControllerFrame {
        let pose = Pose::from_position(self.position);
        let joints = self.articulated.then(|| {
            let mut fingers = [[Vec3::ZERO; 4]; 5];
            for (f, finger) in fingers.iter_mut().enumerate() {
                let x = (f as f32 - 2.0) * FINGER_SPACING;
                for (j, joint) in finger.iter_mut().enumerate() {
                    let z = KNUCKLE_OFFSET + j as f32 * JOINT_SPACING;
                    *joint = self.position + Vec3::new(x, 0.0, z);
                }
            }
            HandJoints {
                palm: pose,
                fingers,
            }
        });
        ControllerFrame {
            id: self.id,
            chirality: self.chirality,
            pose,
            is_tracked: self.tracked,
            grasp_strength: self.strength,
            joints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_core::{INDEX, THUMB};

    #[test]
    fn hand_joints_follow_the_palm() {
        let frame = FrameBuilder::hand(1).at(1.0, 2.0, 3.0).build();
        let joints = frame.joints.unwrap();
        let tip = joints.tip(INDEX).unwrap();
        assert!((tip.x() - 0.98).abs() < 1e-5);
        assert!((tip.y() - 2.0).abs() < 1e-5);
        assert!((tip.z() - 3.115).abs() < 1e-5);
        assert!(joints.tip(THUMB).unwrap().x() < tip.x());
    }

    #[test]
    fn vr_and_flat_frames_carry_no_joints() {
        assert!(FrameBuilder::vr(1).build().joints.is_none());
        let flat = FrameBuilder::flat_hand(1).untracked().build();
        assert!(flat.joints.is_none());
        assert!(!flat.is_tracked);
    }
}
