// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Interaction events and listeners.
//!
//! Every state transition is recorded as an [`InteractionEvent`] in the
//! manager's per-tick log. Listeners receive the log at the tick boundary
//! together with a [`Commands`] handle, so reacting to an event by creating,
//! attaching or destroying behaviours is deferred to that same boundary.

use reach_geom::Vec3;
use serde::Serialize;

use crate::ids::{BehaviourId, ControllerId, GroupId};
use crate::registry::Commands;
use crate::validate::ViolationKind;

/// Lifecycle notification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// The behaviour was registered.
    Created,
    /// The behaviour was attached to a group.
    Enabled,
    /// First processing tick after the behaviour's first attach.
    Started,
    /// The behaviour was detached from its group.
    Disabled,
    /// The behaviour was unregistered.
    Destroyed,
}

/// Attachment status carried by lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttachInfo {
    /// Attached to a group at the time of the notification.
    pub is_attached: bool,
    /// The group, when attached.
    pub group: Option<GroupId>,
}

impl AttachInfo {
    /// Status for a behaviour attached to `group`.
    pub const fn attached(group: GroupId) -> Self {
        Self {
            is_attached: true,
            group: Some(group),
        }
    }

    /// Status for a detached behaviour.
    pub const fn detached() -> Self {
        Self {
            is_attached: false,
            group: None,
        }
    }

    pub(crate) const fn from_group(group: Option<GroupId>) -> Self {
        match group {
            Some(g) => Self::attached(g),
            None => Self::detached(),
        }
    }
}

/// Why a grasp ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraspEndReason {
    /// The controller released its grasp intent.
    Released,
    /// `release_grasp` / `release_object`, grasping disabled, or shutdown.
    Forced,
    /// Tracking stayed lost longer than the suspension limit.
    TimedOut,
    /// The behaviour was detached or destroyed.
    Detached,
    /// The controller was unregistered.
    ControllerRemoved,
}

/// How a suspension ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspensionOutcome {
    /// A grasping controller regained tracking.
    Resumed,
    /// The suspension limit elapsed.
    TimedOut,
    /// The grasp was released some other way.
    Released,
}

/// A single state transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InteractionEvent {
    /// Lifecycle notification.
    Lifecycle {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Stage reached.
        stage: LifecycleStage,
        /// Attachment status at this stage.
        info: AttachInfo,
    },
    /// A monitor was created for the behaviour.
    Activated {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Activation depth.
        depth: u32,
    },
    /// The behaviour's monitor was torn down.
    Deactivated {
        /// Behaviour.
        behaviour: BehaviourId,
    },
    /// A controller began hovering the behaviour.
    HoverBegin {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// A controller keeps hovering the behaviour.
    HoverStay {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
        /// Current hover distance.
        distance: f32,
    },
    /// A controller stopped hovering the behaviour.
    HoverEnd {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// First controller began hovering.
    ObjectHoverBegin {
        /// Behaviour.
        behaviour: BehaviourId,
    },
    /// Last controller stopped hovering.
    ObjectHoverEnd {
        /// Behaviour.
        behaviour: BehaviourId,
    },
    /// The behaviour became a controller's primary hover.
    PrimaryHoverBegin {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// The behaviour stopped being a controller's primary hover.
    PrimaryHoverEnd {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// A controller's skeleton began touching the behaviour.
    ContactBegin {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// A controller's skeleton keeps touching the behaviour.
    ContactStay {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// A controller's skeleton stopped touching the behaviour.
    ContactEnd {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// First controller began touching.
    ObjectContactBegin {
        /// Behaviour.
        behaviour: BehaviourId,
    },
    /// Last controller stopped touching.
    ObjectContactEnd {
        /// Behaviour.
        behaviour: BehaviourId,
    },
    /// A controller grasped the behaviour.
    GraspBegin {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// A controller keeps grasping the behaviour.
    GraspStay {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
    },
    /// A controller's grasp ended.
    GraspEnd {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller.
        controller: ControllerId,
        /// Why it ended.
        reason: GraspEndReason,
    },
    /// First controller grasped the behaviour.
    ObjectGraspBegin {
        /// Behaviour.
        behaviour: BehaviourId,
    },
    /// Last grasp ended.
    ObjectGraspEnd {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Velocity applied on release, if any.
        release_velocity: Option<Vec3>,
    },
    /// Every grasping controller is untracked; the object is held in place.
    SuspensionBegin {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Controller whose tracking loss started the suspension.
        controller: ControllerId,
    },
    /// Suspension ended.
    SuspensionEnd {
        /// Behaviour.
        behaviour: BehaviourId,
        /// How it ended.
        outcome: SuspensionOutcome,
    },
    /// A registered controller lost tracking.
    TrackingLost {
        /// Controller.
        controller: ControllerId,
    },
    /// A registered controller regained tracking.
    TrackingRegained {
        /// Controller.
        controller: ControllerId,
    },
    /// The behaviour failed validation and is excluded from new interactions.
    Misbehaving {
        /// Behaviour.
        behaviour: BehaviourId,
        /// Violations found.
        violations: Vec<ViolationKind>,
    },
    /// A misbehaving behaviour passed validation again.
    Recovered {
        /// Behaviour.
        behaviour: BehaviourId,
    },
}

impl InteractionEvent {
    /// Short snake_case name of the event kind.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Lifecycle { .. } => "lifecycle",
            Self::Activated { .. } => "activated",
            Self::Deactivated { .. } => "deactivated",
            Self::HoverBegin { .. } => "hover_begin",
            Self::HoverStay { .. } => "hover_stay",
            Self::HoverEnd { .. } => "hover_end",
            Self::ObjectHoverBegin { .. } => "object_hover_begin",
            Self::ObjectHoverEnd { .. } => "object_hover_end",
            Self::PrimaryHoverBegin { .. } => "primary_hover_begin",
            Self::PrimaryHoverEnd { .. } => "primary_hover_end",
            Self::ContactBegin { .. } => "contact_begin",
            Self::ContactStay { .. } => "contact_stay",
            Self::ContactEnd { .. } => "contact_end",
            Self::ObjectContactBegin { .. } => "object_contact_begin",
            Self::ObjectContactEnd { .. } => "object_contact_end",
            Self::GraspBegin { .. } => "grasp_begin",
            Self::GraspStay { .. } => "grasp_stay",
            Self::GraspEnd { .. } => "grasp_end",
            Self::ObjectGraspBegin { .. } => "object_grasp_begin",
            Self::ObjectGraspEnd { .. } => "object_grasp_end",
            Self::SuspensionBegin { .. } => "suspension_begin",
            Self::SuspensionEnd { .. } => "suspension_end",
            Self::TrackingLost { .. } => "tracking_lost",
            Self::TrackingRegained { .. } => "tracking_regained",
            Self::Misbehaving { .. } => "misbehaving",
            Self::Recovered { .. } => "recovered",
        }
    }

    /// Behaviour the event concerns, if any.
    pub const fn behaviour(&self) -> Option<BehaviourId> {
        match self {
            Self::Lifecycle { behaviour, .. }
            | Self::Activated { behaviour, .. }
            | Self::Deactivated { behaviour }
            | Self::HoverBegin { behaviour, .. }
            | Self::HoverStay { behaviour, .. }
            | Self::HoverEnd { behaviour, .. }
            | Self::ObjectHoverBegin { behaviour }
            | Self::ObjectHoverEnd { behaviour }
            | Self::PrimaryHoverBegin { behaviour, .. }
            | Self::PrimaryHoverEnd { behaviour, .. }
            | Self::ContactBegin { behaviour, .. }
            | Self::ContactStay { behaviour, .. }
            | Self::ContactEnd { behaviour, .. }
            | Self::ObjectContactBegin { behaviour }
            | Self::ObjectContactEnd { behaviour }
            | Self::GraspBegin { behaviour, .. }
            | Self::GraspStay { behaviour, .. }
            | Self::GraspEnd { behaviour, .. }
            | Self::ObjectGraspBegin { behaviour }
            | Self::ObjectGraspEnd { behaviour, .. }
            | Self::SuspensionBegin { behaviour, .. }
            | Self::SuspensionEnd { behaviour, .. }
            | Self::Misbehaving { behaviour, .. }
            | Self::Recovered { behaviour } => Some(*behaviour),
            Self::TrackingLost { .. } | Self::TrackingRegained { .. } => None,
        }
    }
}

/// Receives events at the tick boundary.
///
/// Closures `FnMut(&InteractionEvent, &mut Commands<'_>)` implement this
/// trait, so most hosts never name it.
pub trait InteractionListener {
    /// Called once per event, in emission order.
    fn on_event(&mut self, event: &InteractionEvent, commands: &mut Commands<'_>);
}

impl<F> InteractionListener for F
where
    F: FnMut(&InteractionEvent, &mut Commands<'_>),
{
    fn on_event(&mut self, event: &InteractionEvent, commands: &mut Commands<'_>) {
        self(event, commands);
    }
}
