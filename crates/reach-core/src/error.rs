// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types surfaced by registration and configuration APIs.
//!
//! Nothing here crosses `tick`: per-tick problems are logged and contained.
//! These errors are returned to callers that issued an invalid request so
//! programming mistakes (double registration, detaching twice) are visible.

use thiserror::Error;

use crate::ids::{BehaviourId, BodyHandle, ControllerId, GroupId};

/// Rejected registry request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The rigid body already backs a behaviour (or a queued creation).
    #[error("{0} is already registered to a behaviour")]
    BodyAlreadyRegistered(BodyHandle),
    /// The behaviour does not exist, or its destruction is already queued.
    #[error("{0} is not registered")]
    UnknownBehaviour(BehaviourId),
    /// The behaviour is already attached to a group (or will be at the boundary).
    #[error("{behaviour} is already attached to {group}")]
    AlreadyAttached {
        /// Behaviour named in the request.
        behaviour: BehaviourId,
        /// Group it is (or will be) attached to.
        group: GroupId,
    },
    /// The behaviour is not attached to any group.
    #[error("{0} is not attached")]
    NotAttached(BehaviourId),
    /// The group id was never created.
    #[error("{0} does not exist")]
    UnknownGroup(GroupId),
    /// The controller id is already registered (or queued for registration).
    #[error("{0} is already registered")]
    ControllerAlreadyRegistered(ControllerId),
    /// The controller id is not registered.
    #[error("{0} is not registered")]
    UnknownController(ControllerId),
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// A value that must be strictly positive (and finite) was not.
    #[error("{field} must be finite and > 0 (got {value})")]
    NotPositive {
        /// Dotted settings path.
        field: &'static str,
        /// Offending value.
        value: f32,
    },
    /// A value that must be finite and ≥ 0 was not.
    #[error("{field} must be finite and >= 0 (got {value})")]
    Negative {
        /// Dotted settings path.
        field: &'static str,
        /// Offending value.
        value: f32,
    },
    /// Traversal depth below one.
    #[error("activity.max_depth must be >= 1 (got {0})")]
    MaxDepth(u32),
    /// Grasp hysteresis thresholds out of order or out of `[0, 1]`.
    #[error("{field}: release threshold {release} must not exceed grasp threshold {grasp}, both in [0, 1]")]
    Thresholds {
        /// Dotted settings path.
        field: &'static str,
        /// Threshold that begins a grasp.
        grasp: f32,
        /// Threshold below which a grasp ends.
        release: f32,
    },
    /// Hover radius larger than the activation radius would hover inactive objects.
    #[error("hover.hover_radius ({hover}) must not exceed activity.overlap_radius ({overlap})")]
    HoverExceedsOverlap {
        /// Hover radius.
        hover: f32,
        /// Activation radius.
        overlap: f32,
    },
}
