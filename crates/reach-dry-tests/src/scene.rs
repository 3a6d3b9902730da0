// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Headless manager setup and a host-style step loop.

use reach_core::headless::{HeadlessPhysics, ScriptedPoseSource};
use reach_core::{
    BehaviourDesc, BehaviourId, BodyDesc, Chirality, ControllerFrame, ControllerId,
    ControllerKind, GroupId, InteractionBehaviour, InteractionManager, InteractionSettings,
    PhysicsPort, RegistryError, SettingsError, TickSummary,
};
use reach_geom::{Collider, Pose, Vec3};
use thiserror::Error;

/// Manager type used throughout the test suite.
pub type TestManager = InteractionManager<ScriptedPoseSource, HeadlessPhysics>;

/// Failure while assembling a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Settings rejected by the manager.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// Registration rejected by the manager.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

struct PlannedObject {
    desc: BehaviourDesc,
    group: Option<GroupId>,
}

/// Builder for a running [`TestManager`] with objects and controllers.
///
/// Objects float (no gravity) unless [`with_gravity`](Self::with_gravity) is
/// called before adding them. Every object joins [`GroupId::DEFAULT`] unless
/// added through [`with_object`](Self::with_object) with another group.
///
/// # Example
///
/// ```
/// use reach_dry_tests::{FrameBuilder, SceneBuilder};
///
/// let mut scene = SceneBuilder::new()
///     .with_sphere(0.0, 1.0, 0.0, 0.05)
///     .with_vr(1)
///     .with_frame(FrameBuilder::vr(1).at(0.1, 1.0, 0.0).build())
///     .build()
///     .unwrap();
/// scene.step(0.01);
/// assert!(scene.behaviour(0).unwrap().is_hovered());
/// ```
pub struct SceneBuilder {
    settings: InteractionSettings,
    physics: HeadlessPhysics,
    gravity: bool,
    objects: Vec<PlannedObject>,
    controllers: Vec<(ControllerId, ControllerKind, Chirality)>,
    frames: Vec<ControllerFrame>,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder {
    /// Default settings, empty world.
    pub fn new() -> Self {
        Self {
            settings: InteractionSettings::default(),
            physics: HeadlessPhysics::new(),
            gravity: false,
            objects: Vec::new(),
            controllers: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Replace the settings.
    pub fn settings(mut self, settings: InteractionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adjust the settings in place.
    pub fn configure(mut self, f: impl FnOnce(&mut InteractionSettings)) -> Self {
        f(&mut self.settings);
        self
    }

    /// Add a ground plane at height `y`.
    pub fn with_ground(mut self, y: f32) -> Self {
        self.physics = std::mem::take(&mut self.physics).with_ground(y);
        self
    }

    /// Objects added after this call use gravity.
    pub fn with_gravity(mut self) -> Self {
        self.gravity = true;
        self
    }

    fn body(&self, position: Vec3, collider: Collider) -> BodyDesc {
        BodyDesc {
            pose: Pose::from_position(position),
            collider,
            kinematic: false,
            gravity: self.gravity,
            trigger: false,
            mass: 1.0,
        }
    }

    /// Add a sphere object.
    pub fn with_sphere(self, x: f32, y: f32, z: f32, radius: f32) -> Self {
        self.with_object(
            Vec3::new(x, y, z),
            Collider::Sphere { radius },
            Some(GroupId::DEFAULT),
            |d| d,
        )
    }

    /// Add a cube object.
    pub fn with_cube(self, x: f32, y: f32, z: f32, half: f32) -> Self {
        self.with_object(
            Vec3::new(x, y, z),
            Collider::Box {
                half_extents: Vec3::splat(half),
            },
            Some(GroupId::DEFAULT),
            |d| d,
        )
    }

    /// Add an object with a customised descriptor; `group: None` leaves it
    /// detached.
    pub fn with_object(
        mut self,
        position: Vec3,
        collider: Collider,
        group: Option<GroupId>,
        configure: impl FnOnce(BehaviourDesc) -> BehaviourDesc,
    ) -> Self {
        let desc = self.body(position, collider);
        let body = self.physics.create_body(&desc);
        self.objects.push(PlannedObject {
            desc: configure(BehaviourDesc::new(body, collider)),
            group,
        });
        self
    }

    /// Register a controller.
    pub fn with_controller(mut self, id: u32, kind: ControllerKind, chirality: Chirality) -> Self {
        self.controllers.push((ControllerId(id), kind, chirality));
        self
    }

    /// Register a VR controller.
    pub fn with_vr(self, id: u32) -> Self {
        self.with_controller(id, ControllerKind::VrController, Chirality::Right)
    }

    /// Register a hand.
    pub fn with_hand(self, id: u32, chirality: Chirality) -> Self {
        self.with_controller(id, ControllerKind::Hand, chirality)
    }

    /// Initial frame served by the pose source.
    pub fn with_frame(mut self, frame: ControllerFrame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Create the manager, register everything and run `init`.
    pub fn build(self) -> Result<Scene, SceneError> {
        let mut source = ScriptedPoseSource::new();
        for frame in self.frames {
            source.set(frame);
        }
        let mut manager = InteractionManager::new(self.settings, source, self.physics)?;
        let mut objects = Vec::with_capacity(self.objects.len());
        for planned in self.objects {
            objects.push(manager.create_behaviour(planned.desc, planned.group)?);
        }
        for (id, kind, chirality) in self.controllers {
            manager.register_controller(id, kind, chirality)?;
        }
        manager.init();
        Ok(Scene { manager, objects })
    }
}

/// A running manager plus the ids of the objects it was built with.
pub struct Scene {
    /// The manager under test.
    pub manager: TestManager,
    /// Object ids in insertion order.
    pub objects: Vec<BehaviourId>,
}

impl Scene {
    /// Id of the `index`-th object.
    pub fn object(&self, index: usize) -> Option<BehaviourId> {
        self.objects.get(index).copied()
    }

    /// Behaviour of the `index`-th object.
    pub fn behaviour(&self, index: usize) -> Option<&InteractionBehaviour> {
        self.object(index).and_then(|id| self.manager.behaviour(id))
    }

    /// One host frame: tick the manager, step physics, report contacts.
    pub fn step(&mut self, dt: f32) -> TickSummary {
        let summary = self.manager.tick(dt);
        let contacts = self.manager.physics_mut().step(dt);
        self.manager.report_collisions(contacts);
        summary
    }

    /// `n` host frames; returns the last summary.
    pub fn run(&mut self, n: usize, dt: f32) -> TickSummary {
        let mut last = TickSummary::default();
        for _ in 0..n {
            last = self.step(dt);
        }
        last
    }

    /// Replace the frame for `frame.id`.
    pub fn set_frame(&mut self, frame: ControllerFrame) {
        self.manager.pose_source_mut().set(frame);
    }

    /// Move a controller, carrying its joints along.
    pub fn move_controller(&mut self, id: u32, position: Vec3) {
        if let Some(frame) = self.manager.pose_source_mut().frame_mut(ControllerId(id)) {
            let delta = position - frame.pose.position;
            frame.pose.position = position;
            if let Some(joints) = frame.joints.as_mut() {
                joints.palm.position = joints.palm.position + delta;
                for joint in joints.fingers.iter_mut().flatten() {
                    *joint = *joint + delta;
                }
            }
        }
    }

    /// Set a controller's grasp strength.
    pub fn set_grasp(&mut self, id: u32, strength: f32) {
        if let Some(frame) = self.manager.pose_source_mut().frame_mut(ControllerId(id)) {
            frame.grasp_strength = strength;
        }
    }

    /// Set a controller's tracking flag.
    pub fn set_tracked(&mut self, id: u32, tracked: bool) {
        if let Some(frame) = self.manager.pose_source_mut().frame_mut(ControllerId(id)) {
            frame.is_tracked = tracked;
        }
    }
}
