// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Interaction controllers: tracked hands and devices.
//!
//! A controller keeps its side of every relation (hovered, primary hovered,
//! contacted, grasped). The manager updates both sides together; validation
//! checks they agree.

mod kind;

use std::collections::{BTreeMap, BTreeSet};

use reach_geom::Pose;
use serde::{Deserialize, Serialize};

pub use kind::ControllerKind;

use crate::ids::{BehaviourId, ControllerId};
use crate::ports::{Chirality, ControllerFrame};
use crate::settings::GraspSettings;
use crate::skeleton::ContactSkeleton;

/// Per-controller interaction switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerFlags {
    /// Hover detection.
    pub hover: bool,
    /// Contact skeleton.
    pub contact: bool,
    /// Grasping.
    pub grasp: bool,
}

impl Default for ControllerFlags {
    fn default() -> Self {
        Self {
            hover: true,
            contact: true,
            grasp: true,
        }
    }
}

/// One registered controller.
#[derive(Debug, Clone)]
pub struct InteractionController {
    id: ControllerId,
    kind: ControllerKind,
    chirality: Chirality,
    order: u64,
    flags: ControllerFlags,

    frame: Option<ControllerFrame>,
    is_tracked: bool,
    grasp_intent: bool,

    hovered: BTreeMap<BehaviourId, f32>,
    primary_hovered: Option<BehaviourId>,
    contacted: BTreeSet<BehaviourId>,
    grasped: Option<BehaviourId>,
    grasp_offset: Pose,

    pub(crate) skeleton: Option<ContactSkeleton>,
}

impl InteractionController {
    pub(crate) fn new(id: ControllerId, kind: ControllerKind, chirality: Chirality, order: u64) -> Self {
        Self {
            id,
            kind,
            chirality,
            order,
            flags: ControllerFlags::default(),
            frame: None,
            is_tracked: false,
            grasp_intent: false,
            hovered: BTreeMap::new(),
            primary_hovered: None,
            contacted: BTreeSet::new(),
            grasped: None,
            grasp_offset: Pose::IDENTITY,
            skeleton: None,
        }
    }

    /// Controller id.
    pub const fn id(&self) -> ControllerId {
        self.id
    }

    /// Hand or device.
    pub const fn kind(&self) -> ControllerKind {
        self.kind
    }

    /// Handedness.
    pub const fn chirality(&self) -> Chirality {
        self.chirality
    }

    /// Position in registration order.
    pub const fn order(&self) -> u64 {
        self.order
    }

    /// Interaction switches.
    pub const fn flags(&self) -> ControllerFlags {
        self.flags
    }

    /// Sort key for priority-ordered stages.
    pub(crate) const fn priority_key(&self) -> (u8, u64) {
        (self.kind.priority(), self.order)
    }

    /// Tracked this tick.
    pub const fn is_tracked(&self) -> bool {
        self.is_tracked
    }

    /// Last tracked frame.
    pub const fn frame(&self) -> Option<&ControllerFrame> {
        self.frame.as_ref()
    }

    /// Last tracked pose.
    pub fn pose(&self) -> Option<Pose> {
        self.frame.map(|f| f.pose)
    }

    /// Grasp intent after hysteresis.
    pub const fn grasp_intent(&self) -> bool {
        self.grasp_intent
    }

    /// Hovered behaviours, by id.
    pub fn hovered_behaviours(&self) -> impl Iterator<Item = BehaviourId> + '_ {
        self.hovered.keys().copied()
    }

    /// Hovered behaviours with their distances.
    pub fn hover_distances(&self) -> impl Iterator<Item = (BehaviourId, f32)> + '_ {
        self.hovered.iter().map(|(b, d)| (*b, *d))
    }

    /// `behaviour` is in the hover set.
    pub fn is_hovering(&self, behaviour: BehaviourId) -> bool {
        self.hovered.contains_key(&behaviour)
    }

    /// Primary hover.
    pub const fn primary_hovered(&self) -> Option<BehaviourId> {
        self.primary_hovered
    }

    /// Contacted behaviours, by id.
    pub fn contacted_behaviours(&self) -> impl Iterator<Item = BehaviourId> + '_ {
        self.contacted.iter().copied()
    }

    /// `behaviour` is in the contact set.
    pub fn is_contacting(&self, behaviour: BehaviourId) -> bool {
        self.contacted.contains(&behaviour)
    }

    /// Grasped behaviour.
    pub const fn grasped(&self) -> Option<BehaviourId> {
        self.grasped
    }

    /// Object pose relative to the controller, captured at grasp begin.
    pub const fn grasp_offset(&self) -> Pose {
        self.grasp_offset
    }

    /// Contact skeleton, once built.
    pub const fn skeleton(&self) -> Option<&ContactSkeleton> {
        self.skeleton.as_ref()
    }

    /// Where the grasped object should be, given the current pose.
    pub fn hold_target(&self) -> Option<Pose> {
        self.pose().map(|p| p.compose(&self.grasp_offset))
    }

    pub(crate) fn set_flags(&mut self, flags: ControllerFlags) {
        self.flags = flags;
    }

    /// Applies a tracked frame, updating grasp intent with hysteresis.
    pub(crate) fn apply_frame(&mut self, frame: ControllerFrame, grasp: &GraspSettings) {
        let (begin, end) = self.kind.grasp_thresholds(grasp);
        self.grasp_intent = if self.grasp_intent {
            frame.grasp_strength >= end
        } else {
            frame.grasp_strength >= begin
        };
        self.chirality = frame.chirality;
        self.frame = Some(frame);
    }

    pub(crate) fn set_tracked(&mut self, tracked: bool) -> bool {
        std::mem::replace(&mut self.is_tracked, tracked) != tracked
    }

    pub(crate) fn insert_hover(&mut self, behaviour: BehaviourId, distance: f32) {
        self.hovered.insert(behaviour, distance);
    }

    pub(crate) fn remove_hover(&mut self, behaviour: BehaviourId) {
        self.hovered.remove(&behaviour);
        if self.primary_hovered == Some(behaviour) {
            self.primary_hovered = None;
        }
    }

    pub(crate) fn set_primary(&mut self, behaviour: Option<BehaviourId>) {
        self.primary_hovered = behaviour;
    }

    pub(crate) fn insert_contact(&mut self, behaviour: BehaviourId) {
        self.contacted.insert(behaviour);
    }

    pub(crate) fn remove_contact(&mut self, behaviour: BehaviourId) {
        self.contacted.remove(&behaviour);
    }

    pub(crate) fn set_grasped(&mut self, behaviour: Option<BehaviourId>) {
        self.grasped = behaviour;
    }

    /// Captures the object's pose relative to the current controller pose.
    pub(crate) fn capture_grasp_offset(&mut self, object: Pose) {
        if let Some(pose) = self.pose() {
            self.grasp_offset = pose.relative(&object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_geom::Vec3;

    #[test]
    fn grasp_intent_uses_hysteresis() {
        let s = GraspSettings::default();
        let mut c = InteractionController::new(ControllerId(1), ControllerKind::Hand, Chirality::Left, 0);
        let mut frame = ControllerFrame::tracked(ControllerId(1), Pose::IDENTITY);
        for (strength, expected) in [(0.7, false), (0.85, true), (0.7, true), (0.5, false), (0.7, false)] {
            frame.grasp_strength = strength;
            c.apply_frame(frame, &s);
            assert_eq!(c.grasp_intent(), expected, "strength {strength}");
        }
    }

    #[test]
    fn hold_target_reproduces_object_pose_at_capture() {
        let mut c = InteractionController::new(ControllerId(1), ControllerKind::VrController, Chirality::None, 0);
        let pose = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        c.apply_frame(ControllerFrame::tracked(ControllerId(1), pose), &GraspSettings::default());
        let object = Pose::from_position(Vec3::new(1.0, 0.5, 0.0));
        c.capture_grasp_offset(object);
        let target = c.hold_target().unwrap();
        assert!(target.position.distance(object.position) < 1e-5);
    }
}
