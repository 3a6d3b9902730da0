// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ports to the host: tracked poses in, rigid-body physics out.
//!
//! The engine owns no tracking hardware and no rigid-body solver. Hosts
//! implement [`PoseSource`] and [`PhysicsPort`] and hand them to
//! [`crate::InteractionManager::new`]; [`crate::headless`] ships in-memory
//! versions for tests and the simulator binary.

use reach_geom::{Collider, Pose, Vec3};
use serde::{Deserialize, Serialize};

use crate::ids::{BodyHandle, ControllerId};

/// Handedness of a controller.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chirality {
    /// Left hand or left-hand device.
    Left,
    /// Right hand or right-hand device.
    Right,
    /// Unhanded device.
    #[default]
    None,
}

/// Finger order inside [`HandJoints::fingers`].
pub const THUMB: usize = 0;
/// Index finger slot.
pub const INDEX: usize = 1;
/// Middle finger slot.
pub const MIDDLE: usize = 2;

/// Articulated hand data.
///
/// Each finger lists four joint positions from knuckle to tip, giving three
/// bones per finger. Slot order: thumb, index, middle, ring, pinky.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct HandJoints {
    /// Palm centre and orientation.
    pub palm: Pose,
    /// World-space joint positions.
    pub fingers: [[Vec3; 4]; 5],
}

impl HandJoints {
    /// Tip position of the given finger slot.
    pub fn tip(&self, finger: usize) -> Option<Vec3> {
        self.fingers.get(finger).map(|f| f[3])
    }
}

/// One controller's state for one tick.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct ControllerFrame {
    /// Stable controller id.
    pub id: ControllerId,
    /// Handedness.
    #[serde(default)]
    pub chirality: Chirality,
    /// Controller pose (palm for hands, grip for devices).
    pub pose: Pose,
    /// `false` while the tracker has lost the controller.
    pub is_tracked: bool,
    /// Grab strength (hands) or trigger value (devices), in `[0, 1]`.
    #[serde(default)]
    pub grasp_strength: f32,
    /// Joint data, when the tracker supplies it.
    #[serde(default)]
    pub joints: Option<HandJoints>,
}

impl ControllerFrame {
    /// A tracked frame at `pose` with no grasp intent and no joints.
    pub const fn tracked(id: ControllerId, pose: Pose) -> Self {
        Self {
            id,
            chirality: Chirality::None,
            pose,
            is_tracked: true,
            grasp_strength: 0.0,
            joints: None,
        }
    }
}

/// Supplies controller frames, once per tick.
pub trait PoseSource {
    /// Frames for every controller the source knows about this tick.
    ///
    /// Registered controllers missing from the result are treated as
    /// untracked.
    fn tracked_controllers(&mut self) -> Vec<ControllerFrame>;
}

/// Parameters for a body the engine asks the physics port to create.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BodyDesc {
    /// Initial pose.
    pub pose: Pose,
    /// Collision shape.
    pub collider: Collider,
    /// Driven by pose targets rather than forces.
    pub kinematic: bool,
    /// Affected by gravity.
    pub gravity: bool,
    /// Reports overlaps without resolving them.
    pub trigger: bool,
    /// Mass in kilograms.
    pub mass: f32,
}

/// Rigid-body operations the engine needs from the host's physics.
///
/// Queries on unknown handles return `None`; commands on unknown handles are
/// ignored by the implementation.
pub trait PhysicsPort {
    /// Creates a body and returns its handle.
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle;
    /// Destroys a body; `false` if the handle was unknown.
    fn destroy_body(&mut self, body: BodyHandle) -> bool;
    /// Current world pose.
    fn body_pose(&self, body: BodyHandle) -> Option<Pose>;
    /// Moves a body instantly, without sweeping, and zeroes its velocity.
    fn teleport(&mut self, body: BodyHandle, pose: Pose);
    /// Moves a body toward `target` over `dt` seconds with a swept motion.
    fn drive_to(&mut self, body: BodyHandle, target: Pose, dt: f32);
    /// Kinematic flag.
    fn is_kinematic(&self, body: BodyHandle) -> Option<bool>;
    /// Sets the kinematic flag.
    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool);
    /// Gravity flag.
    fn uses_gravity(&self, body: BodyHandle) -> Option<bool>;
    /// Sets the gravity flag.
    fn set_gravity(&mut self, body: BodyHandle, gravity: bool);
    /// Sets the trigger flag.
    fn set_trigger(&mut self, body: BodyHandle, trigger: bool);
    /// Enables or disables collision detection for a body.
    fn set_collisions_enabled(&mut self, body: BodyHandle, enabled: bool);
    /// Linear velocity.
    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3>;
    /// Sets the linear velocity.
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3);
    /// Mass.
    fn mass(&self, body: BodyHandle) -> Option<f32>;
}

/// Whether a collision started or stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPhase {
    /// Bodies began touching.
    Enter,
    /// Bodies stopped touching.
    Exit,
}

/// Collision callback reported by the host.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// First body.
    pub a: BodyHandle,
    /// Second body.
    pub b: BodyHandle,
    /// Enter or exit.
    pub phase: ContactPhase,
}
