// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! reach-core: deterministic interaction engine for tracked hands and
//! controllers.
//!
//! A [`InteractionManager`] runs one fixed-order pass per physics tick over
//! registered [`InteractionController`]s and [`InteractionBehaviour`]s:
//! tracking intake, activity broadphase, hover, primary hover, contact,
//! grasp, suspension, grasped motion and contact-skeleton sync. Every
//! relation change surfaces as an [`InteractionEvent`]; registry changes
//! requested mid-tick are queued through [`Commands`] and applied at the
//! tick boundaries.
//!
//! The engine talks to the outside world through two ports: a
//! [`PoseSource`] for controller frames and a [`PhysicsPort`] for rigid
//! bodies. [`headless`] provides reference implementations of both.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::too_many_lines,
    clippy::use_self
)]

mod activity;
mod behaviour;
mod controller;
mod error;
mod events;
/// Reference pose source and physics world for tests and simulation.
pub mod headless;
mod ids;
mod manager;
/// Grasp targets and throw estimation.
pub mod motion;
mod ports;
mod registry;
mod settings;
mod skeleton;
mod validate;

/// Activity broadphase.
pub use activity::{ActivityDelta, ActivityManager, Monitor};
/// Interactable objects.
pub use behaviour::{BehaviourDesc, ContactForceMode, InteractionBehaviour};
/// Hands and VR controllers.
pub use controller::{ControllerFlags, ControllerKind, InteractionController};
pub use error::{RegistryError, SettingsError};
/// Event stream and listeners.
pub use events::{
    AttachInfo, GraspEndReason, InteractionEvent, InteractionListener, LifecycleStage,
    SuspensionOutcome,
};
pub use ids::{BehaviourId, BodyHandle, ControllerId, GroupId};
pub use manager::{InteractionManager, TickSummary};
/// Host-facing ports.
pub use ports::{
    BodyDesc, Chirality, CollisionEvent, ContactPhase, ControllerFrame, HandJoints, PhysicsPort,
    PoseSource, INDEX, MIDDLE, THUMB,
};
pub use registry::{Commands, GroupSettings, Registry};
/// Tunables, loaded and saved under [`SETTINGS_KEY`].
pub use settings::{
    ActivitySettings, ContactSettings, EventSettings, GraspSettings, HoverSettings,
    InteractionSettings, SuspensionSettings, ThrowSettings, ValidationSettings, SETTINGS_KEY,
};
pub use skeleton::{BoneContact, ContactBone, ContactMode, ContactSkeleton};
pub use validate::{Axis, Violation, ViolationKind};

/// Geometry re-exported for hosts.
pub use reach_geom::{Aabb, Collider, Pose, Quat, Vec3};
