// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-object interaction state.
//!
//! An [`InteractionBehaviour`] aggregates every controller's relation to one
//! rigid body along five independent axes (hover, primary hover, contact,
//! grasp, suspension) and caches the body's "shadow" physics flags so they can
//! be restored after a grasp or suspension overrides them.
//!
//! Transition methods are idempotent: a duplicate begin or end is a no-op that
//! returns `false` and emits nothing. Per-controller events are pushed first,
//! object-level events (first begin, last end) follow.

use std::collections::{BTreeMap, BTreeSet};

use reach_geom::{Collider, Pose, Vec3};
use serde::{Deserialize, Serialize};

use crate::events::{GraspEndReason, InteractionEvent, SuspensionOutcome};
use crate::ids::{BehaviourId, BodyHandle, ControllerId, GroupId};
use crate::motion::ThrowHistory;
use crate::ports::PhysicsPort;
use crate::validate::ViolationKind;

/// How contact with the object is weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactForceMode {
    /// Ordinary physical object.
    #[default]
    Object,
    /// UI element: lighter effective mass.
    Ui,
}

/// Registration parameters for a behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviourDesc {
    /// Host-owned rigid body the behaviour drives.
    pub body: BodyHandle,
    /// Shape used for hover distance and activity bounds.
    pub collider: Collider,
    /// Accept more than one grasping controller at a time.
    pub allow_multi_grasp: bool,
    /// Never hovered.
    pub ignore_hover: bool,
    /// Never chosen as a primary hover.
    pub ignore_primary_hover: bool,
    /// Never contacted.
    pub ignore_contact: bool,
    /// Never grasped.
    pub ignore_grasping: bool,
    /// Effective-mass policy for contact.
    pub contact_force_mode: ContactForceMode,
    /// Follow grasping controllers while grasped.
    pub move_when_grasped: bool,
}

impl BehaviourDesc {
    /// Default flags for `body` with shape `collider`.
    pub const fn new(body: BodyHandle, collider: Collider) -> Self {
        Self {
            body,
            collider,
            allow_multi_grasp: false,
            ignore_hover: false,
            ignore_primary_hover: false,
            ignore_contact: false,
            ignore_grasping: false,
            contact_force_mode: ContactForceMode::Object,
            move_when_grasped: true,
        }
    }

    /// Sets [`Self::allow_multi_grasp`].
    #[must_use]
    pub const fn multi_grasp(mut self, allow: bool) -> Self {
        self.allow_multi_grasp = allow;
        self
    }

    /// Sets [`Self::contact_force_mode`].
    #[must_use]
    pub const fn contact_mode(mut self, mode: ContactForceMode) -> Self {
        self.contact_force_mode = mode;
        self
    }

    /// Sets [`Self::move_when_grasped`].
    #[must_use]
    pub const fn moves_when_grasped(mut self, moves: bool) -> Self {
        self.move_when_grasped = moves;
        self
    }
}

/// Interaction state of one object.
#[derive(Debug, Clone)]
pub struct InteractionBehaviour {
    id: BehaviourId,
    desc: BehaviourDesc,
    group: Option<GroupId>,
    started: bool,
    pose: Pose,

    hovered: bool,
    hovering: BTreeMap<ControllerId, f32>,
    primary_hovering: Option<ControllerId>,
    contacted: bool,
    contacting: BTreeSet<ControllerId>,
    grasped: bool,
    grasping: BTreeSet<ControllerId>,
    untracked: BTreeMap<ControllerId, f64>,
    suspended: bool,
    soft_contact: bool,

    shadow_kinematic: bool,
    shadow_gravity: bool,
    throw: ThrowHistory,
}

impl InteractionBehaviour {
    /// Creates a detached behaviour, capturing the body's current flags as
    /// the shadow state.
    pub(crate) fn new(id: BehaviourId, desc: BehaviourDesc, physics: &impl PhysicsPort) -> Self {
        let pose = physics.body_pose(desc.body).unwrap_or_default();
        let shadow_kinematic = physics.is_kinematic(desc.body).unwrap_or(false);
        let shadow_gravity = physics.uses_gravity(desc.body).unwrap_or(true);
        Self {
            id,
            desc,
            group: None,
            started: false,
            pose,
            hovered: false,
            hovering: BTreeMap::new(),
            primary_hovering: None,
            contacted: false,
            contacting: BTreeSet::new(),
            grasped: false,
            grasping: BTreeSet::new(),
            untracked: BTreeMap::new(),
            suspended: false,
            soft_contact: false,
            shadow_kinematic,
            shadow_gravity,
            throw: ThrowHistory::default(),
        }
    }

    /// Behaviour id.
    pub const fn id(&self) -> BehaviourId {
        self.id
    }

    /// Registration parameters.
    pub const fn desc(&self) -> &BehaviourDesc {
        &self.desc
    }

    /// Backing rigid body.
    pub const fn body(&self) -> BodyHandle {
        self.desc.body
    }

    /// Group the behaviour is attached to.
    pub const fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// Attached to a group.
    pub const fn is_attached(&self) -> bool {
        self.group.is_some()
    }

    /// Pose read from physics at the start of the current tick.
    pub const fn pose(&self) -> Pose {
        self.pose
    }

    /// Distance from `point` to the collider surface (0 inside).
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.desc.collider.distance(&self.pose, point)
    }

    pub(crate) fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }

    pub(crate) fn mark_started(&mut self) -> bool {
        !std::mem::replace(&mut self.started, true)
    }

    pub(crate) fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub(crate) fn set_soft_contact(&mut self, soft: bool) {
        self.soft_contact = soft;
    }

    pub(crate) fn throw_history_mut(&mut self) -> &mut ThrowHistory {
        &mut self.throw
    }

    /// Mean velocity over the recorded grasped motion.
    pub fn release_velocity(&self) -> Option<Vec3> {
        self.throw.velocity()
    }

    // ── queries ────────────────────────────────────────────────────────────

    /// Hovered by at least one controller.
    pub const fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Some controller's primary hover.
    pub const fn is_primary_hovered(&self) -> bool {
        self.primary_hovering.is_some()
    }

    /// Touched by at least one skeleton.
    pub const fn is_contacted(&self) -> bool {
        self.contacted
    }

    /// Grasped by at least one controller.
    pub const fn is_grasped(&self) -> bool {
        self.grasped
    }

    /// Held in place while every grasper is untracked.
    pub const fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// A touching skeleton is in soft-contact mode.
    pub const fn is_soft_contact(&self) -> bool {
        self.soft_contact
    }

    /// Cached kinematic flag restored after grasp/suspension.
    pub const fn shadow_kinematic(&self) -> bool {
        self.shadow_kinematic
    }

    /// Cached gravity flag restored after grasp/suspension.
    pub const fn shadow_gravity(&self) -> bool {
        self.shadow_gravity
    }

    /// Smallest hover distance among hovering controllers.
    pub fn closest_hovering_controller_distance(&self) -> Option<f32> {
        self.hovering.values().copied().reduce(f32::min)
    }

    /// Controller at [`Self::closest_hovering_controller_distance`]; ties go
    /// to the lower id.
    pub fn closest_hovering_controller(&self) -> Option<ControllerId> {
        let mut best: Option<(ControllerId, f32)> = None;
        for (c, d) in &self.hovering {
            if best.map_or(true, |(_, bd)| *d < bd) {
                best = Some((*c, *d));
            }
        }
        best.map(|(c, _)| c)
    }

    /// Hovering controllers, by id.
    pub fn hovering_controllers(&self) -> impl Iterator<Item = ControllerId> + '_ {
        self.hovering.keys().copied()
    }

    /// Hover distance for `controller`.
    pub fn hover_distance(&self, controller: ControllerId) -> Option<f32> {
        self.hovering.get(&controller).copied()
    }

    /// Controller whose primary hover this is.
    pub const fn primary_hovering_controller(&self) -> Option<ControllerId> {
        self.primary_hovering
    }

    /// Contacting controllers, by id.
    pub fn contacting_controllers(&self) -> impl Iterator<Item = ControllerId> + '_ {
        self.contacting.iter().copied()
    }

    /// Grasping controllers, by id.
    pub fn grasping_controllers(&self) -> impl Iterator<Item = ControllerId> + '_ {
        self.grasping.iter().copied()
    }

    /// Number of grasping controllers.
    pub fn grasp_count(&self) -> usize {
        self.grasping.len()
    }

    /// Grasping controllers that have lost tracking, with the time they did.
    pub fn untracked_controllers(&self) -> impl Iterator<Item = (ControllerId, f64)> + '_ {
        self.untracked.iter().map(|(c, t)| (*c, *t))
    }

    /// `controller` grasps this object but is untracked.
    pub fn is_untracked_grasper(&self, controller: ControllerId) -> bool {
        self.untracked.contains_key(&controller)
    }

    /// Every grasping controller is untracked (false when not grasped).
    pub fn all_graspers_untracked(&self) -> bool {
        !self.grasping.is_empty() && self.grasping.iter().all(|c| self.untracked.contains_key(c))
    }

    // ── hover ──────────────────────────────────────────────────────────────

    /// Adds `controller` to the hover set.
    pub fn begin_hover(
        &mut self,
        controller: ControllerId,
        distance: f32,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if self.hovering.contains_key(&controller) {
            return false;
        }
        self.hovering.insert(controller, distance);
        events.push(InteractionEvent::HoverBegin {
            behaviour: self.id,
            controller,
        });
        if !self.hovered {
            self.hovered = true;
            events.push(InteractionEvent::ObjectHoverBegin { behaviour: self.id });
        }
        true
    }

    /// Updates the distance of an existing hover; `false` if not hovering.
    pub fn update_hover(&mut self, controller: ControllerId, distance: f32) -> bool {
        self.hovering
            .get_mut(&controller)
            .map(|d| *d = distance)
            .is_some()
    }

    /// Removes `controller` from the hover set, ending its primary hover first.
    pub fn end_hover(&mut self, controller: ControllerId, events: &mut Vec<InteractionEvent>) -> bool {
        if !self.hovering.contains_key(&controller) {
            return false;
        }
        self.end_primary_hover(controller, events);
        self.hovering.remove(&controller);
        events.push(InteractionEvent::HoverEnd {
            behaviour: self.id,
            controller,
        });
        if self.hovering.is_empty() {
            self.hovered = false;
            events.push(InteractionEvent::ObjectHoverEnd { behaviour: self.id });
        }
        true
    }

    // ── primary hover ──────────────────────────────────────────────────────

    /// Makes this the primary hover of `controller`.
    ///
    /// Refused when `controller` is not hovering or another controller already
    /// holds the primary hover.
    pub fn begin_primary_hover(
        &mut self,
        controller: ControllerId,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if self.primary_hovering.is_some() || !self.hovering.contains_key(&controller) {
            return false;
        }
        self.primary_hovering = Some(controller);
        events.push(InteractionEvent::PrimaryHoverBegin {
            behaviour: self.id,
            controller,
        });
        true
    }

    /// Ends `controller`'s primary hover of this object.
    pub fn end_primary_hover(
        &mut self,
        controller: ControllerId,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if self.primary_hovering != Some(controller) {
            return false;
        }
        self.primary_hovering = None;
        events.push(InteractionEvent::PrimaryHoverEnd {
            behaviour: self.id,
            controller,
        });
        true
    }

    // ── contact ────────────────────────────────────────────────────────────

    /// Adds `controller` to the contact set.
    pub fn begin_contact(
        &mut self,
        controller: ControllerId,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if !self.contacting.insert(controller) {
            return false;
        }
        events.push(InteractionEvent::ContactBegin {
            behaviour: self.id,
            controller,
        });
        if !self.contacted {
            self.contacted = true;
            events.push(InteractionEvent::ObjectContactBegin { behaviour: self.id });
        }
        true
    }

    /// Removes `controller` from the contact set.
    pub fn end_contact(
        &mut self,
        controller: ControllerId,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if !self.contacting.remove(&controller) {
            return false;
        }
        events.push(InteractionEvent::ContactEnd {
            behaviour: self.id,
            controller,
        });
        if self.contacting.is_empty() {
            self.contacted = false;
            self.soft_contact = false;
            events.push(InteractionEvent::ObjectContactEnd { behaviour: self.id });
        }
        true
    }

    // ── grasp ──────────────────────────────────────────────────────────────

    /// Adds `controller` to the grasping set.
    ///
    /// Refused when already grasping, or when another controller holds an
    /// object that forbids multi-grasp.
    pub fn begin_grasp(
        &mut self,
        controller: ControllerId,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if self.grasping.contains(&controller)
            || (!self.desc.allow_multi_grasp && !self.grasping.is_empty())
        {
            return false;
        }
        self.grasping.insert(controller);
        events.push(InteractionEvent::GraspBegin {
            behaviour: self.id,
            controller,
        });
        if !self.grasped {
            self.grasped = true;
            self.throw.clear();
            events.push(InteractionEvent::ObjectGraspBegin { behaviour: self.id });
        }
        true
    }

    /// Removes `controller` from the grasping set.
    ///
    /// `release_velocity` is reported on the object-level end event when this
    /// was the last grasper. A suspension left without graspers ends too.
    pub fn end_grasp(
        &mut self,
        controller: ControllerId,
        reason: GraspEndReason,
        release_velocity: Option<Vec3>,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if !self.grasping.remove(&controller) {
            return false;
        }
        self.untracked.remove(&controller);
        events.push(InteractionEvent::GraspEnd {
            behaviour: self.id,
            controller,
            reason,
        });
        if self.suspended && self.grasping.is_empty() {
            self.suspended = false;
            let outcome = if reason == GraspEndReason::TimedOut {
                SuspensionOutcome::TimedOut
            } else {
                SuspensionOutcome::Released
            };
            events.push(InteractionEvent::SuspensionEnd {
                behaviour: self.id,
                outcome,
            });
        }
        if self.grasping.is_empty() {
            self.grasped = false;
            events.push(InteractionEvent::ObjectGraspEnd {
                behaviour: self.id,
                release_velocity,
            });
        }
        true
    }

    /// Records that a grasping controller lost tracking at `now`.
    pub fn mark_untracked(&mut self, controller: ControllerId, now: f64) -> bool {
        if !self.grasping.contains(&controller) || self.untracked.contains_key(&controller) {
            return false;
        }
        self.untracked.insert(controller, now);
        true
    }

    /// Records that a grasping controller is tracked again.
    pub fn mark_tracked(&mut self, controller: ControllerId) -> bool {
        self.untracked.remove(&controller).is_some()
    }

    // ── suspension ─────────────────────────────────────────────────────────

    /// Enters suspension because `controller` lost tracking.
    ///
    /// Only valid while grasped and every grasper is untracked.
    pub fn suspend_by_controller(
        &mut self,
        controller: ControllerId,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if self.suspended || !self.all_graspers_untracked() {
            return false;
        }
        self.suspended = true;
        events.push(InteractionEvent::SuspensionBegin {
            behaviour: self.id,
            controller,
        });
        true
    }

    /// Leaves suspension because a grasper is tracked again.
    pub fn resume_from_suspension(&mut self, events: &mut Vec<InteractionEvent>) -> bool {
        if !self.suspended || self.all_graspers_untracked() {
            return false;
        }
        self.suspended = false;
        events.push(InteractionEvent::SuspensionEnd {
            behaviour: self.id,
            outcome: SuspensionOutcome::Resumed,
        });
        true
    }

    /// Force-ends an untracked grasp whose tracking loss outlived the limit.
    pub fn timeout_suspension(
        &mut self,
        controller: ControllerId,
        events: &mut Vec<InteractionEvent>,
    ) -> bool {
        if !self.untracked.contains_key(&controller) {
            return false;
        }
        self.end_grasp(controller, GraspEndReason::TimedOut, None, events)
    }

    // ── physics policy ─────────────────────────────────────────────────────

    /// Held in place by the engine rather than by physics.
    pub const fn is_held(&self) -> bool {
        self.suspended || (self.grasped && self.desc.move_when_grasped)
    }

    /// Kinematic flag the body should have right now.
    pub const fn desired_kinematic(&self) -> bool {
        if self.is_held() {
            true
        } else {
            self.shadow_kinematic
        }
    }

    /// Gravity flag the body should have right now.
    pub const fn desired_gravity(&self) -> bool {
        if self.is_held() {
            false
        } else {
            self.shadow_gravity
        }
    }

    /// Writes the desired flags to physics.
    pub(crate) fn apply_physics_policy(&self, physics: &mut impl PhysicsPort) {
        let body = self.desc.body;
        let kinematic = self.desired_kinematic();
        if physics.is_kinematic(body) != Some(kinematic) {
            physics.set_kinematic(body, kinematic);
        }
        let gravity = self.desired_gravity();
        if physics.uses_gravity(body) != Some(gravity) {
            physics.set_gravity(body, gravity);
        }
    }

    /// Updates the shadow kinematic flag; physics follows unless held.
    pub(crate) fn set_shadow_kinematic(&mut self, value: bool, physics: &mut impl PhysicsPort) {
        self.shadow_kinematic = value;
        self.apply_physics_policy(physics);
    }

    /// Updates the shadow gravity flag; physics follows unless held.
    pub(crate) fn set_shadow_gravity(&mut self, value: bool, physics: &mut impl PhysicsPort) {
        self.shadow_gravity = value;
        self.apply_physics_policy(physics);
    }

    /// Re-reads the shadow flags from physics. Ignored while held.
    pub(crate) fn resync_shadow(&mut self, physics: &impl PhysicsPort) -> bool {
        if self.is_held() || self.soft_contact {
            return false;
        }
        if let Some(k) = physics.is_kinematic(self.desc.body) {
            self.shadow_kinematic = k;
        }
        if let Some(g) = physics.uses_gravity(self.desc.body) {
            self.shadow_gravity = g;
        }
        true
    }

    // ── validation ─────────────────────────────────────────────────────────

    /// Checks the behaviour's own invariants.
    pub fn validate(&self, physics: &impl PhysicsPort) -> Vec<ViolationKind> {
        let mut out = Vec::new();
        if self.hovered != !self.hovering.is_empty() {
            out.push(ViolationKind::HoverFlagMismatch);
        }
        if self.contacted != !self.contacting.is_empty() {
            out.push(ViolationKind::ContactFlagMismatch);
        }
        if self.grasped != !self.grasping.is_empty() {
            out.push(ViolationKind::GraspFlagMismatch);
        }
        if let Some(c) = self.primary_hovering {
            if !self.hovering.contains_key(&c) {
                out.push(ViolationKind::PrimaryNotHovering(c));
            }
        }
        for c in self.untracked.keys() {
            if !self.grasping.contains(c) {
                out.push(ViolationKind::UntrackedNotGrasping(*c));
            }
        }
        if !self.desc.allow_multi_grasp && self.grasping.len() > 1 {
            out.push(ViolationKind::MultiGraspNotAllowed(self.grasping.len()));
        }
        if self.suspended {
            if self.grasping.is_empty() {
                out.push(ViolationKind::SuspendedNotGrasped);
            }
            if let Some(c) = self.grasping.iter().find(|c| !self.untracked.contains_key(*c)) {
                out.push(ViolationKind::SuspendedWithTrackedGrasper(*c));
            }
        } else if self.grasping.len() == 1 && self.all_graspers_untracked() {
            out.push(ViolationKind::UntrackedGraspNotSuspended);
        }
        if !self.grasped && !self.suspended && !self.soft_contact {
            let physical = physics.is_kinematic(self.desc.body);
            if physical != Some(self.shadow_kinematic) {
                out.push(ViolationKind::ShadowKinematicMismatch {
                    shadow: self.shadow_kinematic,
                    physical,
                });
            }
            let physical = physics.uses_gravity(self.desc.body);
            if physical != Some(self.shadow_gravity) {
                out.push(ViolationKind::ShadowGravityMismatch {
                    shadow: self.shadow_gravity,
                    physical,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessPhysics;
    use crate::ports::BodyDesc;

    fn fixture(multi: bool) -> (HeadlessPhysics, InteractionBehaviour) {
        let mut physics = HeadlessPhysics::new();
        let collider = Collider::Sphere { radius: 0.05 };
        let body = physics.create_body(&BodyDesc {
            pose: Pose::IDENTITY,
            collider,
            kinematic: false,
            gravity: true,
            trigger: false,
            mass: 1.0,
        });
        let desc = BehaviourDesc::new(body, collider).multi_grasp(multi);
        let b = InteractionBehaviour::new(BehaviourId(1), desc, &physics);
        (physics, b)
    }

    const C1: ControllerId = ControllerId(1);
    const C2: ControllerId = ControllerId(2);

    #[test]
    fn hover_is_idempotent_and_emits_object_events_once() {
        let (_, mut b) = fixture(false);
        let mut ev = Vec::new();
        assert!(b.begin_hover(C1, 0.1, &mut ev));
        assert!(!b.begin_hover(C1, 0.05, &mut ev));
        assert!(b.begin_hover(C2, 0.2, &mut ev));
        assert_eq!(ev.len(), 3);
        assert_eq!(b.closest_hovering_controller_distance(), Some(0.1));
        assert_eq!(b.closest_hovering_controller(), Some(C1));

        ev.clear();
        assert!(b.end_hover(C1, &mut ev));
        assert!(!b.end_hover(C1, &mut ev));
        assert!(b.end_hover(C2, &mut ev));
        assert_eq!(
            ev.last(),
            Some(&InteractionEvent::ObjectHoverEnd { behaviour: BehaviourId(1) })
        );
        assert!(!b.is_hovered());
    }

    #[test]
    fn ending_hover_ends_primary_hover_first() {
        let (_, mut b) = fixture(false);
        let mut ev = Vec::new();
        assert!(!b.begin_primary_hover(C1, &mut ev), "primary requires hover");
        b.begin_hover(C1, 0.0, &mut ev);
        assert!(b.begin_primary_hover(C1, &mut ev));
        assert!(!b.begin_primary_hover(C2, &mut ev));
        ev.clear();
        b.end_hover(C1, &mut ev);
        assert_eq!(ev[0].name(), "primary_hover_end");
        assert!(!b.is_primary_hovered());
    }

    #[test]
    fn single_grasp_refuses_second_controller() {
        let (_, mut b) = fixture(false);
        let mut ev = Vec::new();
        assert!(b.begin_grasp(C1, &mut ev));
        assert!(!b.begin_grasp(C2, &mut ev));
        assert_eq!(b.grasp_count(), 1);
    }

    #[test]
    fn multi_grasp_ends_object_grasp_with_last_controller() {
        let (_, mut b) = fixture(true);
        let mut ev = Vec::new();
        b.begin_grasp(C1, &mut ev);
        b.begin_grasp(C2, &mut ev);
        ev.clear();
        b.end_grasp(C1, GraspEndReason::Released, None, &mut ev);
        assert!(b.is_grasped());
        assert_eq!(ev.len(), 1);
        b.end_grasp(C2, GraspEndReason::Released, Some(Vec3::UNIT_X), &mut ev);
        assert!(!b.is_grasped());
        assert_eq!(
            ev.last(),
            Some(&InteractionEvent::ObjectGraspEnd {
                behaviour: BehaviourId(1),
                release_velocity: Some(Vec3::UNIT_X),
            })
        );
    }

    #[test]
    fn suspension_requires_every_grasper_untracked() {
        let (physics, mut b) = fixture(true);
        let mut ev = Vec::new();
        b.begin_grasp(C1, &mut ev);
        b.begin_grasp(C2, &mut ev);
        b.mark_untracked(C1, 0.0);
        assert!(!b.suspend_by_controller(C1, &mut ev));
        b.mark_untracked(C2, 0.5);
        assert!(b.suspend_by_controller(C2, &mut ev));
        assert!(b.is_suspended());
        assert!(b.desired_kinematic());
        assert!(!b.desired_gravity());

        b.mark_tracked(C1);
        assert!(b.resume_from_suspension(&mut ev));
        assert!(b.validate(&physics).iter().all(|k| !matches!(
            k,
            ViolationKind::SuspendedWithTrackedGrasper(_)
        )));
    }

    #[test]
    fn timeout_of_last_untracked_grasper_ends_suspension() {
        let (_, mut b) = fixture(false);
        let mut ev = Vec::new();
        b.begin_grasp(C1, &mut ev);
        b.mark_untracked(C1, 1.0);
        b.suspend_by_controller(C1, &mut ev);
        ev.clear();
        assert!(b.timeout_suspension(C1, &mut ev));
        let names: Vec<_> = ev.iter().map(InteractionEvent::name).collect();
        assert_eq!(names, ["grasp_end", "suspension_end", "object_grasp_end"]);
        assert!(matches!(
            ev[1],
            InteractionEvent::SuspensionEnd {
                outcome: SuspensionOutcome::TimedOut,
                ..
            }
        ));
        assert!(!b.is_suspended());
    }

    #[test]
    fn validate_flags_shadow_drift_only_when_not_held() {
        let (mut physics, mut b) = fixture(false);
        assert!(b.validate(&physics).is_empty());
        physics.set_kinematic(b.body(), true);
        assert!(matches!(
            b.validate(&physics).as_slice(),
            [ViolationKind::ShadowKinematicMismatch { shadow: false, .. }]
        ));
        let mut ev = Vec::new();
        b.begin_grasp(C1, &mut ev);
        assert!(b.validate(&physics).is_empty());
    }

    #[test]
    fn validate_flags_lone_untracked_grasp_without_suspension() {
        let (physics, mut b) = fixture(false);
        let mut ev = Vec::new();
        b.begin_grasp(C1, &mut ev);
        b.mark_untracked(C1, 0.0);
        assert_eq!(
            b.validate(&physics),
            vec![ViolationKind::UntrackedGraspNotSuspended]
        );
    }
}
