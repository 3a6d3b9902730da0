// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Contact skeletons: physical proxies of a controller.
//!
//! A skeleton is a set of kinematic bone bodies driven toward the tracked
//! pose each tick. Collision callbacks against bones are counted per object;
//! an object is in contact with the controller while its count is non-zero.

use std::collections::BTreeMap;

use reach_geom::{Collider, Pose};
use tracing::{debug, trace};

use crate::ids::{BehaviourId, BodyHandle, ControllerId};
use crate::ports::{BodyDesc, ContactPhase, PhysicsPort};
use crate::settings::ContactSettings;

/// How bones interact with objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactMode {
    /// Bones are solid and push objects.
    #[default]
    Hard,
    /// Bones are triggers: contacts are reported but not resolved.
    Soft,
}

/// Most recent object a bone touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneContact {
    /// Touched behaviour.
    pub behaviour: BehaviourId,
    /// Partner mass scaled by its contact-force multiplier.
    pub effective_mass: f32,
}

/// One bone body.
#[derive(Debug, Clone)]
pub struct ContactBone {
    body: BodyHandle,
    collider: Collider,
    target: Pose,
    last_contact: Option<BoneContact>,
}

impl ContactBone {
    /// Physics body.
    pub const fn body(&self) -> BodyHandle {
        self.body
    }

    /// Bone shape.
    pub const fn collider(&self) -> Collider {
        self.collider
    }

    /// Pose the bone is driven toward.
    pub const fn target(&self) -> Pose {
        self.target
    }

    /// Last object touched, if any.
    pub const fn last_contact(&self) -> Option<BoneContact> {
        self.last_contact
    }
}

/// Physical proxy of one controller.
#[derive(Debug, Clone)]
pub struct ContactSkeleton {
    controller: ControllerId,
    bones: Vec<ContactBone>,
    counts: BTreeMap<BehaviourId, u32>,
    mode: ContactMode,
    enabled: bool,
    needs_teleport: bool,
}

impl ContactSkeleton {
    /// Creates one kinematic body per bone at its target pose.
    pub(crate) fn build(
        controller: ControllerId,
        layout: &[Collider],
        targets: &[Pose],
        physics: &mut impl PhysicsPort,
    ) -> Self {
        let bones = layout
            .iter()
            .zip(targets)
            .map(|(collider, target)| {
                let body = physics.create_body(&BodyDesc {
                    pose: *target,
                    collider: *collider,
                    kinematic: true,
                    gravity: false,
                    trigger: false,
                    mass: 0.0,
                });
                ContactBone {
                    body,
                    collider: *collider,
                    target: *target,
                    last_contact: None,
                }
            })
            .collect::<Vec<_>>();
        debug!(%controller, bones = bones.len(), "contact skeleton built");
        Self {
            controller,
            bones,
            counts: BTreeMap::new(),
            mode: ContactMode::Hard,
            enabled: true,
            needs_teleport: false,
        }
    }

    /// Owning controller.
    pub const fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Bones in layout order.
    pub fn bones(&self) -> &[ContactBone] {
        &self.bones
    }

    /// Current contact mode.
    pub const fn mode(&self) -> ContactMode {
        self.mode
    }

    /// Bones are colliding and driven.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Objects with at least one touching bone, by id.
    pub fn contacted(&self) -> impl Iterator<Item = BehaviourId> + '_ {
        self.counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(b, _)| *b)
    }

    /// Number of bones touching `behaviour`.
    pub fn contact_count(&self, behaviour: BehaviourId) -> u32 {
        self.counts.get(&behaviour).copied().unwrap_or(0)
    }

    /// Destroys every bone body.
    pub(crate) fn destroy(self, physics: &mut impl PhysicsPort) -> Vec<BodyHandle> {
        self.bones
            .into_iter()
            .map(|b| {
                physics.destroy_body(b.body);
                b.body
            })
            .collect()
    }

    /// Stops colliding and forgets all contacts (tracking lost).
    pub(crate) fn disable(&mut self, physics: &mut impl PhysicsPort) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.counts.clear();
        for bone in &mut self.bones {
            bone.last_contact = None;
            physics.set_collisions_enabled(bone.body, false);
        }
        debug!(controller = %self.controller, "contact skeleton disabled");
    }

    /// Resumes colliding; the next sync teleports every bone.
    pub(crate) fn enable(&mut self, physics: &mut impl PhysicsPort) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.needs_teleport = true;
        for bone in &self.bones {
            physics.set_collisions_enabled(bone.body, true);
        }
        debug!(controller = %self.controller, "contact skeleton enabled");
    }

    /// Drops every count for `behaviour` (it was destroyed).
    pub(crate) fn forget(&mut self, behaviour: BehaviourId) {
        self.counts.remove(&behaviour);
        for bone in &mut self.bones {
            if bone.last_contact.is_some_and(|c| c.behaviour == behaviour) {
                bone.last_contact = None;
            }
        }
    }

    /// Applies a collision between bone `bone` and `behaviour`.
    pub(crate) fn on_collision(
        &mut self,
        bone: usize,
        behaviour: BehaviourId,
        effective_mass: f32,
        phase: ContactPhase,
    ) {
        if !self.enabled {
            return;
        }
        let Some(b) = self.bones.get_mut(bone) else {
            return;
        };
        match phase {
            ContactPhase::Enter => {
                b.last_contact = Some(BoneContact {
                    behaviour,
                    effective_mass,
                });
                *self.counts.entry(behaviour).or_insert(0) += 1;
            }
            ContactPhase::Exit => {
                if let Some(n) = self.counts.get_mut(&behaviour) {
                    *n = n.saturating_sub(1);
                    if *n == 0 {
                        self.counts.remove(&behaviour);
                    }
                }
            }
        }
        trace!(controller = %self.controller, bone, %behaviour, ?phase, "bone collision");
    }

    /// Drives every bone toward `targets` and updates the contact mode.
    ///
    /// Bones teleport when the skeleton was just (re)enabled or when a bone
    /// lags further than `teleport_distance`; otherwise they sweep. Soft mode
    /// holds while `grasping` or while any bone lags beyond
    /// `soft_contact_distance`.
    pub(crate) fn sync_to_pose(
        &mut self,
        targets: &[Pose],
        grasping: bool,
        settings: &ContactSettings,
        dt: f32,
        physics: &mut impl PhysicsPort,
    ) -> ContactMode {
        if !self.enabled {
            return self.mode;
        }
        let teleport_all = std::mem::take(&mut self.needs_teleport);
        let mut max_lag = 0.0_f32;
        for (bone, target) in self.bones.iter_mut().zip(targets) {
            bone.target = *target;
            let lag = physics
                .body_pose(bone.body)
                .map_or(f32::INFINITY, |p| p.position.distance(target.position));
            if teleport_all || lag > settings.teleport_distance {
                physics.teleport(bone.body, *target);
            } else {
                max_lag = max_lag.max(lag);
                physics.drive_to(bone.body, *target, dt);
            }
        }
        let mode = if grasping || max_lag > settings.soft_contact_distance {
            ContactMode::Soft
        } else {
            ContactMode::Hard
        };
        if mode != self.mode {
            let trigger = mode == ContactMode::Soft;
            for bone in &self.bones {
                physics.set_trigger(bone.body, trigger);
            }
            debug!(controller = %self.controller, ?mode, "contact mode changed");
            self.mode = mode;
        }
        mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessPhysics;
    use reach_geom::Vec3;

    fn skeleton(physics: &mut HeadlessPhysics) -> ContactSkeleton {
        ContactSkeleton::build(
            ControllerId(7),
            &[Collider::Sphere { radius: 0.02 }],
            &[Pose::IDENTITY],
            physics,
        )
    }

    #[test]
    fn counts_track_enter_and_exit_per_object() {
        let mut physics = HeadlessPhysics::new();
        let mut s = skeleton(&mut physics);
        let b = BehaviourId(3);
        s.on_collision(0, b, 1.0, ContactPhase::Enter);
        s.on_collision(0, b, 1.0, ContactPhase::Enter);
        s.on_collision(0, b, 1.0, ContactPhase::Exit);
        assert_eq!(s.contact_count(b), 1);
        assert_eq!(s.bones()[0].last_contact().map(|c| c.behaviour), Some(b));
        s.on_collision(0, b, 1.0, ContactPhase::Exit);
        s.on_collision(0, b, 1.0, ContactPhase::Exit);
        assert_eq!(s.contacted().count(), 0);
    }

    #[test]
    fn disabled_skeleton_clears_and_ignores_contacts() {
        let mut physics = HeadlessPhysics::new();
        let mut s = skeleton(&mut physics);
        s.on_collision(0, BehaviourId(1), 1.0, ContactPhase::Enter);
        s.disable(&mut physics);
        assert_eq!(s.contacted().count(), 0);
        s.on_collision(0, BehaviourId(1), 1.0, ContactPhase::Enter);
        assert_eq!(s.contacted().count(), 0);
    }

    #[test]
    fn lagging_bone_switches_to_soft_and_far_bone_teleports() {
        let settings = ContactSettings::default();
        let mut physics = HeadlessPhysics::new();
        let mut s = skeleton(&mut physics);
        let body = s.bones()[0].body();

        physics.set_blocked(body, true);
        let near = Pose::from_position(Vec3::new(0.05, 0.0, 0.0));
        assert_eq!(
            s.sync_to_pose(&[near], false, &settings, 0.01, &mut physics),
            ContactMode::Soft
        );
        assert_eq!(physics.body_pose(body), Some(Pose::IDENTITY));
        assert_eq!(physics.is_trigger(body), Some(true));

        let far = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        s.sync_to_pose(&[far], false, &settings, 0.01, &mut physics);
        assert_eq!(physics.body_pose(body), Some(far));

        physics.set_blocked(body, false);
        assert_eq!(
            s.sync_to_pose(&[far], false, &settings, 0.01, &mut physics),
            ContactMode::Hard
        );
    }

    #[test]
    fn grasping_forces_soft_mode() {
        let mut physics = HeadlessPhysics::new();
        let mut s = skeleton(&mut physics);
        let mode = s.sync_to_pose(
            &[Pose::IDENTITY],
            true,
            &ContactSettings::default(),
            0.01,
            &mut physics,
        );
        assert_eq!(mode, ContactMode::Soft);
    }
}
