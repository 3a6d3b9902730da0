// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-tick stages.
//!
//! Each relation stage first decides (immutable pass over the registry), then
//! applies: ends, then begins, then stays. Ending first keeps exclusive axes
//! (primary hover, single grasp) from ever holding two relations at once.

use std::collections::{BTreeMap, BTreeSet};

use reach_geom::{Pose, Vec3};
use tracing::{debug, info, trace, warn};

use super::InteractionManager;
use crate::behaviour::ContactForceMode;
use crate::events::{GraspEndReason, InteractionEvent};
use crate::ids::{BehaviourId, ControllerId};
use crate::motion::grasp_target;
use crate::ports::{CollisionEvent, ContactPhase, ControllerFrame, PhysicsPort, PoseSource};
use crate::registry::Registry;
use crate::skeleton::{ContactMode, ContactSkeleton};
use crate::validate::ViolationKind;

pub(super) fn end_hover_pair(
    registry: &mut Registry,
    events: &mut Vec<InteractionEvent>,
    cid: ControllerId,
    bid: BehaviourId,
) {
    if let Some(b) = registry.behaviours.get_mut(&bid) {
        b.end_hover(cid, events);
    }
    if let Some(c) = registry.controllers.get_mut(&cid) {
        c.remove_hover(bid);
    }
}

pub(super) fn end_contact_pair(
    registry: &mut Registry,
    events: &mut Vec<InteractionEvent>,
    cid: ControllerId,
    bid: BehaviourId,
) {
    if let Some(b) = registry.behaviours.get_mut(&bid) {
        b.end_contact(cid, events);
    }
    if let Some(c) = registry.controllers.get_mut(&cid) {
        c.remove_contact(bid);
    }
}

fn end_primary_pair(
    registry: &mut Registry,
    events: &mut Vec<InteractionEvent>,
    cid: ControllerId,
    bid: BehaviourId,
) {
    if let Some(b) = registry.behaviours.get_mut(&bid) {
        b.end_primary_hover(cid, events);
    }
    if let Some(c) = registry.controllers.get_mut(&cid) {
        if c.primary_hovered() == Some(bid) {
            c.set_primary(None);
        }
    }
}

impl<S: PoseSource, P: PhysicsPort> InteractionManager<S, P> {
    /// Reads frames and applies tracking transitions.
    pub(super) fn stage_intake(&mut self) {
        let mut frames: BTreeMap<ControllerId, ControllerFrame> = BTreeMap::new();
        for f in self.source.tracked_controllers() {
            frames.insert(f.id, f);
        }
        let Registry {
            controllers,
            behaviours,
            ..
        } = &mut self.registry;
        for (cid, ctrl) in controllers.iter_mut() {
            let frame = frames
                .remove(cid)
                .filter(|f| f.is_tracked && f.pose.position.is_finite());
            let had_frame = ctrl.frame().is_some();
            let tracked = frame.is_some();
            if let Some(frame) = frame {
                ctrl.apply_frame(frame, &self.settings.grasp);
            }
            if !ctrl.set_tracked(tracked) {
                continue;
            }
            let grasped = ctrl.grasped();
            if tracked {
                if had_frame {
                    info!(controller = %cid, "tracking regained");
                    self.events
                        .push(InteractionEvent::TrackingRegained { controller: *cid });
                }
                if let Some(b) = grasped.and_then(|bid| behaviours.get_mut(&bid)) {
                    b.mark_tracked(*cid);
                }
                if let Some(s) = ctrl.skeleton.as_mut() {
                    s.enable(&mut self.physics);
                }
            } else {
                info!(controller = %cid, "tracking lost");
                self.events
                    .push(InteractionEvent::TrackingLost { controller: *cid });
                if let Some(b) = grasped.and_then(|bid| behaviours.get_mut(&bid)) {
                    b.mark_untracked(*cid, self.time);
                }
                if let Some(s) = ctrl.skeleton.as_mut() {
                    s.disable(&mut self.physics);
                }
            }
        }
        for id in frames.keys() {
            trace!(controller = %id, "frame for unregistered controller ignored");
        }
    }

    /// Refreshes bounds and the active set.
    pub(super) fn stage_activity(&mut self) {
        for b in self.registry.behaviours.values_mut() {
            if !b.is_attached() {
                continue;
            }
            match self.physics.body_pose(b.body()) {
                Some(pose) => b.set_pose(pose),
                None => debug!(behaviour = %b.id(), body = %b.body(), "body pose unavailable"),
            }
            self.activity
                .register(b.id(), b.desc().collider.world_aabb(&b.pose()));
        }

        let points: Vec<Vec3> = self
            .registry
            .controllers
            .values()
            .filter(|c| c.is_tracked())
            .filter_map(|c| c.frame().map(|f| c.kind().hover_point(f)))
            .collect();
        let keep_alive: BTreeSet<BehaviourId> = self
            .registry
            .behaviours
            .values()
            .filter(|b| b.is_grasped() || b.is_suspended() || b.is_contacted())
            .map(|b| b.id())
            .collect();
        let delta = self.activity.refresh(&points, &keep_alive, self.tick);

        for id in delta.deactivated {
            self.end_all_relations(id, GraspEndReason::Forced);
            debug!(behaviour = %id, "deactivated");
            self.events
                .push(InteractionEvent::Deactivated { behaviour: id });
        }
        for (id, depth) in delta.activated {
            debug!(behaviour = %id, depth, "activated");
            self.events.push(InteractionEvent::Activated {
                behaviour: id,
                depth,
            });
        }
    }

    /// Hover: collider distance from each controller's hover point.
    pub(super) fn stage_hover(&mut self) {
        let radius = self.settings.hover.hover_radius;
        let mut ends = Vec::new();
        let mut begins = Vec::new();
        let mut stays = Vec::new();
        for (cid, ctrl) in &self.registry.controllers {
            let mut desired: BTreeMap<BehaviourId, f32> = BTreeMap::new();
            if let Some(frame) = ctrl.frame().filter(|_| ctrl.is_tracked() && ctrl.flags().hover) {
                let point = ctrl.kind().hover_point(frame);
                for bid in self.activity.active() {
                    let Some(b) = self.registry.behaviours.get(bid) else {
                        continue;
                    };
                    let enabled = self
                        .registry
                        .group_of(*bid)
                        .is_some_and(|g| g.hover_enabled);
                    if !enabled || b.desc().ignore_hover {
                        continue;
                    }
                    let d = b.distance_to(point);
                    if d <= radius {
                        desired.insert(*bid, d);
                    }
                }
            }
            for bid in ctrl.hovered_behaviours() {
                if !desired.contains_key(&bid) {
                    ends.push((*cid, bid));
                }
            }
            for (bid, d) in desired {
                if ctrl.is_hovering(bid) {
                    stays.push((*cid, bid, d));
                } else {
                    begins.push((*cid, bid, d));
                }
            }
        }

        for (cid, bid) in ends {
            end_hover_pair(&mut self.registry, &mut self.events, cid, bid);
        }
        for (cid, bid, d) in begins {
            let Registry {
                behaviours,
                controllers,
                ..
            } = &mut self.registry;
            if let (Some(b), Some(c)) = (behaviours.get_mut(&bid), controllers.get_mut(&cid)) {
                if b.begin_hover(cid, d, &mut self.events) {
                    c.insert_hover(bid, d);
                }
            }
        }
        let emit = self.settings.events.emit_stay_events;
        for (cid, bid, d) in stays {
            let Registry {
                behaviours,
                controllers,
                ..
            } = &mut self.registry;
            if let Some(b) = behaviours.get_mut(&bid) {
                b.update_hover(cid, d);
            }
            if let Some(c) = controllers.get_mut(&cid) {
                c.insert_hover(bid, d);
            }
            if emit {
                self.events.push(InteractionEvent::HoverStay {
                    behaviour: bid,
                    controller: cid,
                    distance: d,
                });
            }
        }
    }

    /// Primary hover: closest primary-hover point, claimed in priority order.
    ///
    /// A controller whose best candidate was already claimed by a
    /// higher-priority controller gets no primary hover this tick.
    pub(super) fn stage_primary_hover(&mut self) {
        let mut claimed: BTreeSet<BehaviourId> = BTreeSet::new();
        let mut assignment: Vec<(ControllerId, Option<BehaviourId>)> = Vec::new();
        for cid in self.registry.controllers_by_priority() {
            let Some(ctrl) = self.registry.controllers.get(&cid) else {
                continue;
            };
            let mut best: Option<(BehaviourId, f32)> = None;
            if let Some(frame) = ctrl.frame().filter(|_| ctrl.is_tracked() && ctrl.flags().hover) {
                let points = ctrl.kind().primary_hover_points(frame);
                for bid in ctrl.hovered_behaviours() {
                    let Some(b) = self.registry.behaviours.get(&bid) else {
                        continue;
                    };
                    if b.desc().ignore_primary_hover {
                        continue;
                    }
                    let d = points
                        .iter()
                        .map(|p| b.distance_to(*p))
                        .fold(f32::INFINITY, f32::min);
                    if best.is_none_or(|(_, bd)| d < bd) {
                        best = Some((bid, d));
                    }
                }
            }
            let pick = best.map(|(bid, _)| bid).filter(|bid| claimed.insert(*bid));
            assignment.push((cid, pick));
        }

        for (cid, pick) in &assignment {
            let current = self
                .registry
                .controllers
                .get(cid)
                .and_then(|c| c.primary_hovered());
            if let Some(bid) = current.filter(|cur| Some(*cur) != *pick) {
                end_primary_pair(&mut self.registry, &mut self.events, *cid, bid);
            }
        }
        for (cid, pick) in assignment {
            let Some(bid) = pick else {
                continue;
            };
            let Registry {
                behaviours,
                controllers,
                ..
            } = &mut self.registry;
            let (Some(b), Some(c)) = (behaviours.get_mut(&bid), controllers.get_mut(&cid)) else {
                continue;
            };
            if c.primary_hovered() == Some(bid) {
                continue;
            }
            if b.begin_primary_hover(cid, &mut self.events) {
                c.set_primary(Some(bid));
            }
        }
    }

    /// Routes buffered collisions into skeletons, then diffs contact sets.
    pub(super) fn stage_contact(&mut self) {
        for event in std::mem::take(&mut self.collisions) {
            self.route_collision(event);
        }

        let emit = self.settings.events.emit_stay_events;
        let mut ends = Vec::new();
        let mut begins = Vec::new();
        let mut stays = Vec::new();
        for (cid, ctrl) in &self.registry.controllers {
            let mut desired: BTreeSet<BehaviourId> = BTreeSet::new();
            if ctrl.is_tracked() && ctrl.flags().contact {
                if let Some(s) = ctrl.skeleton().filter(|s| s.is_enabled()) {
                    for bid in s.contacted() {
                        let Some(b) = self.registry.behaviours.get(&bid) else {
                            continue;
                        };
                        let enabled = self
                            .registry
                            .group_of(bid)
                            .is_some_and(|g| g.contact_enabled);
                        let admitted = ctrl.is_contacting(bid) || !self.activity.is_misbehaving(bid);
                        if enabled
                            && admitted
                            && !b.desc().ignore_contact
                            && self.activity.is_active(bid)
                        {
                            desired.insert(bid);
                        }
                    }
                }
            }
            for bid in ctrl.contacted_behaviours() {
                if desired.contains(&bid) {
                    stays.push((*cid, bid));
                } else {
                    ends.push((*cid, bid));
                }
            }
            for bid in desired {
                if !ctrl.is_contacting(bid) {
                    begins.push((*cid, bid));
                }
            }
        }

        for (cid, bid) in ends {
            end_contact_pair(&mut self.registry, &mut self.events, cid, bid);
        }
        for (cid, bid) in begins {
            let Registry {
                behaviours,
                controllers,
                ..
            } = &mut self.registry;
            if let (Some(b), Some(c)) = (behaviours.get_mut(&bid), controllers.get_mut(&cid)) {
                if b.begin_contact(cid, &mut self.events) {
                    c.insert_contact(bid);
                }
            }
        }
        if emit {
            for (cid, bid) in stays {
                self.events.push(InteractionEvent::ContactStay {
                    behaviour: bid,
                    controller: cid,
                });
            }
        }
    }

    fn route_collision(&mut self, event: CollisionEvent) {
        let bone_a = self.registry.bones.get(&event.a).copied();
        let bone_b = self.registry.bones.get(&event.b).copied();
        let ((cid, bone), other) = match (bone_a, bone_b) {
            (Some(bone), None) => (bone, event.b),
            (None, Some(bone)) => (bone, event.a),
            (Some(_), Some(_)) => {
                trace!(a = %event.a, b = %event.b, "bone-bone collision ignored");
                return;
            }
            (None, None) => {
                trace!(a = %event.a, b = %event.b, "collision without bones ignored");
                return;
            }
        };
        let Some(bid) = self.registry.bodies.get(&other).copied() else {
            warn!(body = %other, controller = %cid, "collision with unregistered body skipped");
            return;
        };
        let Some(b) = self.registry.behaviours.get(&bid) else {
            return;
        };
        let contact = &self.settings.contact;
        let multiplier = match b.desc().contact_force_mode {
            ContactForceMode::Object => contact.object_mass_multiplier,
            ContactForceMode::Ui => contact.ui_mass_multiplier,
        };
        let mass = self
            .physics
            .mass(other)
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(contact.default_partner_mass);
        let revive = event.phase == ContactPhase::Enter
            && b.is_attached()
            && !b.desc().ignore_contact
            && !self.activity.is_active(bid);
        let Some(skeleton) = self
            .registry
            .controllers
            .get_mut(&cid)
            .and_then(|c| c.skeleton.as_mut())
        else {
            return;
        };
        skeleton.on_collision(bone, bid, mass * multiplier, event.phase);
        if revive && skeleton.is_enabled() && self.activity.activate(bid, self.tick) {
            self.events.push(InteractionEvent::Activated {
                behaviour: bid,
                depth: 1,
            });
        }
    }

    /// Grasp: releases, then begins in priority order, then stays.
    pub(super) fn stage_grasp(&mut self) {
        for cid in std::mem::take(&mut self.pending.grasp_releases) {
            if let Some(bid) = self.registry.controllers.get(&cid).and_then(|c| c.grasped()) {
                self.end_grasp_now(cid, bid, GraspEndReason::Forced);
            }
        }
        for bid in std::mem::take(&mut self.pending.object_releases) {
            let graspers: Vec<_> = self
                .registry
                .behaviours
                .get(&bid)
                .map(|b| b.grasping_controllers().collect())
                .unwrap_or_default();
            for cid in graspers {
                self.end_grasp_now(cid, bid, GraspEndReason::Forced);
            }
        }

        let order = self.registry.controllers_by_priority();
        let mut releases = Vec::new();
        let mut stays = Vec::new();
        for cid in &order {
            let Some(ctrl) = self.registry.controllers.get(cid) else {
                continue;
            };
            let Some(bid) = ctrl.grasped() else {
                continue;
            };
            if !ctrl.is_tracked() {
                continue;
            }
            let allowed = ctrl.flags().grasp
                && self
                    .registry
                    .group_of(bid)
                    .is_some_and(|g| g.grasp_enabled)
                && self
                    .registry
                    .behaviours
                    .get(&bid)
                    .is_some_and(|b| !b.desc().ignore_grasping);
            if !ctrl.grasp_intent() {
                releases.push((*cid, bid, GraspEndReason::Released));
            } else if !allowed {
                releases.push((*cid, bid, GraspEndReason::Forced));
            } else {
                stays.push((*cid, bid));
            }
        }
        for (cid, bid, reason) in releases {
            self.end_grasp_now(cid, bid, reason);
        }

        for cid in order {
            let Some(ctrl) = self.registry.controllers.get(&cid) else {
                continue;
            };
            if !ctrl.is_tracked()
                || ctrl.grasped().is_some()
                || !ctrl.grasp_intent()
                || !ctrl.flags().grasp
            {
                continue;
            }
            let Some(bid) = self.grasp_candidate(cid) else {
                continue;
            };
            let Registry {
                behaviours,
                controllers,
                ..
            } = &mut self.registry;
            let (Some(b), Some(c)) = (behaviours.get_mut(&bid), controllers.get_mut(&cid)) else {
                continue;
            };
            if b.begin_grasp(cid, &mut self.events) {
                c.set_grasped(Some(bid));
                c.capture_grasp_offset(b.pose());
                b.apply_physics_policy(&mut self.physics);
                debug!(controller = %cid, behaviour = %bid, "grasp began");
            } else {
                trace!(controller = %cid, behaviour = %bid, "grasp refused; held by another controller");
            }
        }

        if self.settings.events.emit_stay_events {
            for (cid, bid) in stays {
                self.events.push(InteractionEvent::GraspStay {
                    behaviour: bid,
                    controller: cid,
                });
            }
        }
    }

    /// Primary hover, else lowest-id contact, else nearest hover.
    fn grasp_candidate(&self, cid: ControllerId) -> Option<BehaviourId> {
        let ctrl = self.registry.controllers.get(&cid)?;
        let graspable = |bid: BehaviourId| {
            self.registry.behaviours.get(&bid).is_some_and(|b| {
                !b.desc().ignore_grasping
                    && self
                        .registry
                        .group_of(bid)
                        .is_some_and(|g| g.grasp_enabled)
                    && self.activity.is_active(bid)
                    && !self.activity.is_misbehaving(bid)
            })
        };
        if let Some(bid) = ctrl.primary_hovered().filter(|b| graspable(*b)) {
            return Some(bid);
        }
        if let Some(bid) = ctrl.contacted_behaviours().find(|b| graspable(*b)) {
            return Some(bid);
        }
        let mut best: Option<(BehaviourId, f32)> = None;
        for (bid, d) in ctrl.hover_distances() {
            if graspable(bid) && best.is_none_or(|(_, bd)| d < bd) {
                best = Some((bid, d));
            }
        }
        best.map(|(bid, _)| bid)
    }

    /// Suspension: resume, time out, or enter.
    pub(super) fn stage_suspension(&mut self) {
        let limit = f64::from(self.settings.suspension.max_suspension_time);
        let grasped: Vec<BehaviourId> = self
            .registry
            .behaviours
            .values()
            .filter(|b| b.is_grasped())
            .map(|b| b.id())
            .collect();
        for bid in grasped {
            let Registry {
                behaviours,
                controllers,
                ..
            } = &mut self.registry;
            let Some(b) = behaviours.get_mut(&bid) else {
                continue;
            };

            if b.resume_from_suspension(&mut self.events) {
                let pose = b.pose();
                for cid in b.grasping_controllers() {
                    if let Some(c) = controllers.get_mut(&cid).filter(|c| c.is_tracked()) {
                        c.capture_grasp_offset(pose);
                    }
                }
                b.apply_physics_policy(&mut self.physics);
                info!(behaviour = %bid, "suspension resumed");
            }

            let expired: Vec<ControllerId> = b
                .untracked_controllers()
                .filter(|(_, since)| self.time - since > limit)
                .map(|(cid, _)| cid)
                .collect();
            for cid in expired {
                if b.timeout_suspension(cid, &mut self.events) {
                    if let Some(c) = controllers.get_mut(&cid) {
                        c.set_grasped(None);
                    }
                    b.apply_physics_policy(&mut self.physics);
                    info!(behaviour = %bid, controller = %cid, "untracked grasp timed out");
                }
            }

            if b.is_grasped() && !b.is_suspended() && b.all_graspers_untracked() {
                let mut culprit: Option<(ControllerId, f64)> = None;
                for (cid, since) in b.untracked_controllers() {
                    if culprit.is_none_or(|(_, t)| since > t) {
                        culprit = Some((cid, since));
                    }
                }
                if let Some((cid, _)) = culprit {
                    if b.suspend_by_controller(cid, &mut self.events) {
                        b.apply_physics_policy(&mut self.physics);
                        self.physics.set_linear_velocity(b.body(), Vec3::ZERO);
                        info!(behaviour = %bid, controller = %cid, "grasp suspended");
                    }
                }
            }
        }
    }

    /// Moves held objects toward their graspers and records throw history.
    pub(super) fn stage_motion(&mut self, dt: f32) {
        let window = self.settings.throw.window;
        let Registry {
            behaviours,
            controllers,
            ..
        } = &mut self.registry;
        for b in behaviours.values_mut() {
            if !b.is_grasped() || b.is_suspended() || !b.desc().move_when_grasped {
                continue;
            }
            let holds: Vec<Pose> = b
                .grasping_controllers()
                .filter_map(|cid| controllers.get(&cid))
                .filter(|c| c.is_tracked())
                .filter_map(|c| c.hold_target())
                .collect();
            let Some(target) = grasp_target(&holds) else {
                continue;
            };
            self.physics.drive_to(b.body(), target, dt);
            let pose = self.physics.body_pose(b.body()).unwrap_or(target);
            b.set_pose(pose);
            b.throw_history_mut().record(self.time, pose.position, window);
            self.activity
                .register(b.id(), b.desc().collider.world_aabb(&pose));
        }
    }

    /// Builds, drives or destroys contact skeletons.
    pub(super) fn stage_skeleton(&mut self, dt: f32) {
        let contact = &self.settings.contact;
        let Registry {
            controllers,
            behaviours,
            bones,
            ..
        } = &mut self.registry;
        for (cid, ctrl) in controllers.iter_mut() {
            if !ctrl.flags().contact {
                if let Some(s) = ctrl.skeleton.take() {
                    for body in s.destroy(&mut self.physics) {
                        bones.remove(&body);
                    }
                    debug!(controller = %cid, "contact skeleton destroyed");
                }
                continue;
            }
            let Some(frame) = ctrl.frame().copied().filter(|_| ctrl.is_tracked()) else {
                continue;
            };
            let kind = ctrl.kind();
            let grasping = ctrl.grasped().is_some();
            match ctrl.skeleton.as_mut() {
                Some(s) => {
                    let targets = kind.bone_targets(&frame, s.bones().len());
                    s.sync_to_pose(&targets, grasping, contact, dt, &mut self.physics);
                }
                None => {
                    let layout = kind.bone_layout(&frame, contact);
                    let targets = kind.bone_targets(&frame, layout.len());
                    let s = ContactSkeleton::build(*cid, &layout, &targets, &mut self.physics);
                    for (i, bone) in s.bones().iter().enumerate() {
                        bones.insert(bone.body(), (*cid, i));
                    }
                    ctrl.skeleton = Some(s);
                }
            }
        }

        for b in behaviours.values_mut() {
            let soft = b.contacting_controllers().any(|cid| {
                controllers
                    .get(&cid)
                    .and_then(|c| c.skeleton())
                    .is_some_and(|s| s.mode() == ContactMode::Soft)
            });
            b.set_soft_contact(soft);
        }
    }

    /// Marks violators misbehaving and recovers those that pass.
    pub(super) fn stage_validation(&mut self) {
        let mut found: BTreeMap<BehaviourId, Vec<ViolationKind>> = BTreeMap::new();
        for v in self.validate() {
            found.entry(v.behaviour).or_default().push(v.kind);
        }
        let recovered: Vec<_> = self
            .activity
            .misbehaving()
            .iter()
            .filter(|id| !found.contains_key(id))
            .copied()
            .collect();
        for id in recovered {
            self.activity.clear_misbehaving(id);
            info!(behaviour = %id, "behaviour recovered");
            self.events
                .push(InteractionEvent::Recovered { behaviour: id });
        }
        for (id, violations) in found {
            if self.activity.is_misbehaving(id) {
                continue;
            }
            if !self.activity.mark_misbehaving(id) {
                warn!(behaviour = %id, ?violations, "invariant violation on unregistered behaviour");
                continue;
            }
            warn!(behaviour = %id, ?violations, "behaviour misbehaving");
            self.events.push(InteractionEvent::Misbehaving {
                behaviour: id,
                violations,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::BehaviourDesc;
    use crate::controller::ControllerKind;
    use crate::headless::{HeadlessPhysics, ScriptedPoseSource};
    use crate::ids::GroupId;
    use crate::ports::{BodyDesc, Chirality};
    use crate::settings::InteractionSettings;
    use reach_geom::Collider;

    type Manager = InteractionManager<ScriptedPoseSource, HeadlessPhysics>;

    fn manager_with_ball() -> (Manager, BehaviourId) {
        let mut physics = HeadlessPhysics::new();
        let collider = Collider::Sphere { radius: 0.05 };
        let body = physics.create_body(&BodyDesc {
            pose: Pose::from_position(Vec3::new(0.0, 1.0, 0.0)),
            collider,
            kinematic: false,
            gravity: true,
            trigger: false,
            mass: 1.0,
        });
        let mut m = Manager::new(
            InteractionSettings::default(),
            ScriptedPoseSource::new(),
            physics,
        )
        .unwrap();
        let id = m
            .create_behaviour(BehaviourDesc::new(body, collider), Some(GroupId::DEFAULT))
            .unwrap();
        m.register_controller(ControllerId(1), ControllerKind::VrController, Chirality::Right)
            .unwrap();
        m.init();
        (m, id)
    }

    #[test]
    fn tracked_controller_near_ball_activates_and_hovers() {
        let (mut m, id) = manager_with_ball();
        m.pose_source_mut().set(ControllerFrame::tracked(
            ControllerId(1),
            Pose::from_position(Vec3::new(0.1, 1.0, 0.0)),
        ));
        m.tick(0.01);
        let b = m.behaviour(id).unwrap();
        assert!(m.is_active(id));
        assert!(b.is_hovered());
        assert!(b.is_primary_hovered());
        let hover = b.closest_hovering_controller_distance().unwrap();
        assert!((hover - 0.05).abs() < 1e-4);
        assert!(m.validate().is_empty());
    }

    #[test]
    fn deactivation_ends_hover_before_monitor_removal() {
        let (mut m, id) = manager_with_ball();
        m.pose_source_mut().set(ControllerFrame::tracked(
            ControllerId(1),
            Pose::from_position(Vec3::new(0.1, 1.0, 0.0)),
        ));
        m.tick(0.01);
        m.pose_source_mut()
            .frame_mut(ControllerId(1))
            .unwrap()
            .pose
            .position = Vec3::new(5.0, 1.0, 0.0);
        m.tick(0.01);
        let names: Vec<_> = m.events().iter().map(InteractionEvent::name).collect();
        let end = names.iter().position(|n| *n == "hover_end").unwrap();
        let gone = names.iter().position(|n| *n == "deactivated").unwrap();
        assert!(end < gone, "{names:?}");
        assert!(!m.is_active(id));
    }
}
