// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cross-object invariant checks.
//!
//! Behaviours check their own axes ([`crate::InteractionBehaviour::validate`]);
//! the activity manager checks its sets ([`crate::ActivityManager::validate`]).
//! [`check_relations`] adds the checks that need both sides of a relation:
//! every controller a behaviour lists must list the behaviour back, and the
//! other way around.

use serde::Serialize;

use crate::ids::{BehaviourId, ControllerId};
use crate::registry::Registry;

/// Interaction axis named by a relation violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Hover relation.
    Hover,
    /// Primary hover relation.
    PrimaryHover,
    /// Contact relation.
    Contact,
    /// Grasp relation.
    Grasp,
}

/// Classification of an invariant violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The hovered flag disagrees with the hover set.
    HoverFlagMismatch,
    /// The contacted flag disagrees with the contact set.
    ContactFlagMismatch,
    /// The grasped flag disagrees with the grasping set.
    GraspFlagMismatch,
    /// The primary hovering controller is not in the hover set.
    PrimaryNotHovering(ControllerId),
    /// A controller is marked untracked without grasping.
    UntrackedNotGrasping(ControllerId),
    /// More than one grasper on an object that forbids multi-grasp.
    MultiGraspNotAllowed(usize),
    /// Suspended while not grasped.
    SuspendedNotGrasped,
    /// Suspended while a grasping controller is tracked.
    SuspendedWithTrackedGrasper(ControllerId),
    /// Grasped only by untracked controllers but not suspended.
    UntrackedGraspNotSuspended,
    /// Physical kinematic flag drifted from the shadow cache.
    ShadowKinematicMismatch {
        /// Cached value.
        shadow: bool,
        /// Value reported by physics (`None` when the body is missing).
        physical: Option<bool>,
    },
    /// Physical gravity flag drifted from the shadow cache.
    ShadowGravityMismatch {
        /// Cached value.
        shadow: bool,
        /// Value reported by physics (`None` when the body is missing).
        physical: Option<bool>,
    },
    /// The behaviour lists a controller that does not list it back.
    ControllerDisagrees {
        /// Controller named.
        controller: ControllerId,
        /// Axis of the relation.
        axis: Axis,
    },
    /// A controller lists the behaviour but the behaviour does not list it.
    BehaviourDisagrees {
        /// Controller named.
        controller: ControllerId,
        /// Axis of the relation.
        axis: Axis,
    },
    /// A controller references a behaviour id that is not registered.
    UnknownBehaviour(ControllerId),
    /// Active or misbehaving without being registered with the activity manager.
    NotRegistered,
    /// The active list and the monitor map disagree.
    MonitorMismatch,
}

/// One violation attributed to a behaviour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Offending behaviour.
    pub behaviour: BehaviourId,
    /// What is wrong.
    pub kind: ViolationKind,
}

/// Checks every controller/behaviour relation in both directions.
pub(crate) fn check_relations(registry: &Registry) -> Vec<Violation> {
    let mut out = Vec::new();
    for (id, b) in &registry.behaviours {
        let mut push = |kind| {
            out.push(Violation {
                behaviour: *id,
                kind,
            });
        };
        for c in b.hovering_controllers() {
            if !registry
                .controllers
                .get(&c)
                .is_some_and(|ctrl| ctrl.is_hovering(*id))
            {
                push(ViolationKind::ControllerDisagrees {
                    controller: c,
                    axis: Axis::Hover,
                });
            }
        }
        if let Some(c) = b.primary_hovering_controller() {
            if registry
                .controllers
                .get(&c)
                .and_then(|ctrl| ctrl.primary_hovered())
                != Some(*id)
            {
                push(ViolationKind::ControllerDisagrees {
                    controller: c,
                    axis: Axis::PrimaryHover,
                });
            }
        }
        for c in b.contacting_controllers() {
            if !registry
                .controllers
                .get(&c)
                .is_some_and(|ctrl| ctrl.is_contacting(*id))
            {
                push(ViolationKind::ControllerDisagrees {
                    controller: c,
                    axis: Axis::Contact,
                });
            }
        }
        for c in b.grasping_controllers() {
            if registry.controllers.get(&c).and_then(|ctrl| ctrl.grasped()) != Some(*id) {
                push(ViolationKind::ControllerDisagrees {
                    controller: c,
                    axis: Axis::Grasp,
                });
            }
        }
    }

    for (cid, ctrl) in &registry.controllers {
        let mut check = |target: BehaviourId, axis: Axis, listed: &dyn Fn(&crate::InteractionBehaviour) -> bool| {
            match registry.behaviours.get(&target) {
                Some(b) if listed(b) => {}
                Some(_) => out.push(Violation {
                    behaviour: target,
                    kind: ViolationKind::BehaviourDisagrees {
                        controller: *cid,
                        axis,
                    },
                }),
                None => out.push(Violation {
                    behaviour: target,
                    kind: ViolationKind::UnknownBehaviour(*cid),
                }),
            }
        };
        for target in ctrl.hovered_behaviours() {
            check(target, Axis::Hover, &|b| b.hovering_controllers().any(|c| c == *cid));
        }
        if let Some(target) = ctrl.primary_hovered() {
            check(target, Axis::PrimaryHover, &|b| {
                b.primary_hovering_controller() == Some(*cid)
            });
        }
        for target in ctrl.contacted_behaviours() {
            check(target, Axis::Contact, &|b| b.contacting_controllers().any(|c| c == *cid));
        }
        if let Some(target) = ctrl.grasped() {
            check(target, Axis::Grasp, &|b| b.grasping_controllers().any(|c| c == *cid));
        }
    }
    out
}
