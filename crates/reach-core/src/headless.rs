// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory port implementations for tests and headless simulation.
//!
//! [`HeadlessPhysics`] is not a rigid-body solver: dynamic bodies integrate
//! velocity and gravity and rest on an optional ground plane, contacts are
//! AABB overlaps. That is enough to exercise every interaction path.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use reach_geom::{AabbTree, BroadPhase, Pose, Vec3};

use crate::ids::{BodyHandle, ControllerId};
use crate::ports::{
    BodyDesc, CollisionEvent, ContactPhase, ControllerFrame, PhysicsPort, PoseSource,
};

#[derive(Debug, Clone)]
struct Body {
    desc: BodyDesc,
    velocity: Vec3,
    collisions: bool,
    blocked: bool,
}

/// Minimal deterministic physics world.
#[derive(Debug, Clone)]
pub struct HeadlessPhysics {
    bodies: BTreeMap<BodyHandle, Body>,
    next: u64,
    gravity: Vec3,
    ground: Option<f32>,
    touching: BTreeSet<(BodyHandle, BodyHandle)>,
}

impl Default for HeadlessPhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPhysics {
    /// Empty world with standard gravity and no ground.
    pub fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
            next: 1,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            ground: None,
            touching: BTreeSet::new(),
        }
    }

    /// Adds a ground plane at height `y`.
    #[must_use]
    pub const fn with_ground(mut self, y: f32) -> Self {
        self.ground = Some(y);
        self
    }

    /// Number of live bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// No live bodies.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Handle exists.
    pub fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(&body)
    }

    /// Trigger flag.
    pub fn is_trigger(&self, body: BodyHandle) -> Option<bool> {
        self.bodies.get(&body).map(|b| b.desc.trigger)
    }

    /// Collision detection flag.
    pub fn collisions_enabled(&self, body: BodyHandle) -> Option<bool> {
        self.bodies.get(&body).map(|b| b.collisions)
    }

    /// A blocked body ignores `drive_to`, as if obstructed.
    pub fn set_blocked(&mut self, body: BodyHandle, blocked: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.blocked = blocked;
        }
    }

    /// Sets the pose without touching velocity or flags.
    pub fn set_pose(&mut self, body: BodyHandle, pose: Pose) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.desc.pose = pose;
        }
    }

    /// Advances dynamic bodies by `dt` and returns contact transitions.
    pub fn step(&mut self, dt: f32) -> Vec<CollisionEvent> {
        for body in self.bodies.values_mut() {
            if body.desc.kinematic {
                continue;
            }
            if body.desc.gravity {
                body.velocity = body.velocity + self.gravity * dt;
            }
            body.desc.pose.position = body.desc.pose.position + body.velocity * dt;
            if let Some(ground) = self.ground {
                let bottom = body
                    .desc
                    .collider
                    .world_aabb(&body.desc.pose)
                    .min()
                    .y();
                if bottom < ground {
                    body.desc.pose.position =
                        body.desc.pose.position + Vec3::new(0.0, ground - bottom, 0.0);
                    body.velocity = Vec3::new(body.velocity.x(), 0.0, body.velocity.z());
                }
            }
        }
        self.contacts()
    }

    /// Contact transitions since the last call, without integrating.
    pub fn contacts(&mut self) -> Vec<CollisionEvent> {
        let mut tree = AabbTree::new();
        for (h, b) in &self.bodies {
            if b.collisions {
                tree.upsert(h.0, b.desc.collider.world_aabb(&b.desc.pose));
            }
        }
        let now: BTreeSet<(BodyHandle, BodyHandle)> = tree
            .pairs()
            .into_iter()
            .map(|(a, b)| (BodyHandle(a), BodyHandle(b)))
            .collect();
        let mut out = Vec::new();
        for (a, b) in self.touching.difference(&now) {
            out.push(CollisionEvent {
                a: *a,
                b: *b,
                phase: ContactPhase::Exit,
            });
        }
        for (a, b) in now.difference(&self.touching) {
            out.push(CollisionEvent {
                a: *a,
                b: *b,
                phase: ContactPhase::Enter,
            });
        }
        self.touching = now;
        out
    }
}

impl PhysicsPort for HeadlessPhysics {
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next);
        self.next += 1;
        self.bodies.insert(
            handle,
            Body {
                desc: *desc,
                velocity: Vec3::ZERO,
                collisions: true,
                blocked: false,
            },
        );
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) -> bool {
        self.touching.retain(|(a, b)| *a != body && *b != body);
        self.bodies.remove(&body).is_some()
    }

    fn body_pose(&self, body: BodyHandle) -> Option<Pose> {
        self.bodies.get(&body).map(|b| b.desc.pose)
    }

    fn teleport(&mut self, body: BodyHandle, pose: Pose) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.desc.pose = pose;
            b.velocity = Vec3::ZERO;
        }
    }

    fn drive_to(&mut self, body: BodyHandle, target: Pose, dt: f32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if b.blocked {
                return;
            }
            if dt > 0.0 {
                b.velocity = (target.position - b.desc.pose.position) * (1.0 / dt);
            }
            b.desc.pose = target;
        }
    }

    fn is_kinematic(&self, body: BodyHandle) -> Option<bool> {
        self.bodies.get(&body).map(|b| b.desc.kinematic)
    }

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.desc.kinematic = kinematic;
        }
    }

    fn uses_gravity(&self, body: BodyHandle) -> Option<bool> {
        self.bodies.get(&body).map(|b| b.desc.gravity)
    }

    fn set_gravity(&mut self, body: BodyHandle, gravity: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.desc.gravity = gravity;
        }
    }

    fn set_trigger(&mut self, body: BodyHandle, trigger: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.desc.trigger = trigger;
        }
    }

    fn set_collisions_enabled(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.collisions = enabled;
        }
    }

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&body).map(|b| b.velocity)
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.velocity = velocity;
        }
    }

    fn mass(&self, body: BodyHandle) -> Option<f32> {
        self.bodies.get(&body).map(|b| b.desc.mass)
    }
}

/// Pose source driven by test code or a scenario script.
///
/// Frames persist until changed. Queued scripted ticks are applied one per
/// call on top of the persistent frames.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPoseSource {
    current: BTreeMap<ControllerId, ControllerFrame>,
    script: VecDeque<Vec<ControllerFrame>>,
}

impl ScriptedPoseSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a persistent frame.
    pub fn set(&mut self, frame: ControllerFrame) {
        self.current.insert(frame.id, frame);
    }

    /// Removes a controller from the output (reported as untracked).
    pub fn remove(&mut self, id: ControllerId) -> Option<ControllerFrame> {
        self.current.remove(&id)
    }

    /// Mutable access to a persistent frame.
    pub fn frame_mut(&mut self, id: ControllerId) -> Option<&mut ControllerFrame> {
        self.current.get_mut(&id)
    }

    /// Queues frames applied on a future call, one entry per call.
    pub fn queue(&mut self, frames: Vec<ControllerFrame>) {
        self.script.push_back(frames);
    }

    /// Scripted ticks not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl PoseSource for ScriptedPoseSource {
    fn tracked_controllers(&mut self) -> Vec<ControllerFrame> {
        if let Some(next) = self.script.pop_front() {
            for frame in next {
                self.current.insert(frame.id, frame);
            }
        }
        self.current.values().copied().collect()
    }
}
