// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Registry of behaviours, controllers and groups, plus deferred commands.
//!
//! The registry is only mutated at tick boundaries. Everything else, including
//! listeners reacting to events mid-flush, goes through [`Commands`], which
//! validates each request against the projected state (committed state plus
//! queued operations) and queues it. Queued operations apply in order, so a
//! detach followed by an attach in the same tick nets to attached.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::behaviour::{BehaviourDesc, InteractionBehaviour};
use crate::controller::{ControllerKind, InteractionController};
use crate::error::RegistryError;
use crate::ids::{BehaviourId, BodyHandle, ControllerId, GroupId};
use crate::ports::Chirality;

/// Per-group processing switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSettings {
    /// Display name.
    pub name: String,
    /// Members can be hovered.
    pub hover_enabled: bool,
    /// Members can be contacted.
    pub contact_enabled: bool,
    /// Members can be grasped.
    pub grasp_enabled: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            hover_enabled: true,
            contact_enabled: true,
            grasp_enabled: true,
        }
    }
}

impl GroupSettings {
    /// All axes enabled, with `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Committed world state.
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) behaviours: BTreeMap<BehaviourId, InteractionBehaviour>,
    pub(crate) controllers: BTreeMap<ControllerId, InteractionController>,
    pub(crate) groups: BTreeMap<GroupId, GroupSettings>,
    pub(crate) bodies: FxHashMap<BodyHandle, BehaviourId>,
    pub(crate) bones: FxHashMap<BodyHandle, (ControllerId, usize)>,
}

impl Registry {
    /// Registered behaviour.
    pub fn behaviour(&self, id: BehaviourId) -> Option<&InteractionBehaviour> {
        self.behaviours.get(&id)
    }

    /// All behaviours, by id.
    pub fn behaviours(&self) -> impl Iterator<Item = &InteractionBehaviour> + '_ {
        self.behaviours.values()
    }

    /// Registered controller.
    pub fn controller(&self, id: ControllerId) -> Option<&InteractionController> {
        self.controllers.get(&id)
    }

    /// All controllers, by id.
    pub fn controllers(&self) -> impl Iterator<Item = &InteractionController> + '_ {
        self.controllers.values()
    }

    /// Group settings.
    pub fn group(&self, id: GroupId) -> Option<&GroupSettings> {
        self.groups.get(&id)
    }

    /// Behaviour backed by `body`.
    pub fn behaviour_for_body(&self, body: BodyHandle) -> Option<BehaviourId> {
        self.bodies.get(&body).copied()
    }

    /// Controllers sorted by priority, then registration order.
    pub(crate) fn controllers_by_priority(&self) -> Vec<ControllerId> {
        let mut ids: Vec<_> = self.controllers.values().map(|c| (c.priority_key(), c.id())).collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Group flags for an attached behaviour; `None` when detached.
    pub(crate) fn group_of(&self, id: BehaviourId) -> Option<&GroupSettings> {
        self.behaviours
            .get(&id)
            .and_then(InteractionBehaviour::group)
            .and_then(|g| self.groups.get(&g))
    }
}

/// A queued registry mutation.
#[derive(Debug, Clone)]
pub(crate) enum RegistryOp {
    Create {
        id: BehaviourId,
        desc: BehaviourDesc,
        group: Option<GroupId>,
    },
    Attach {
        id: BehaviourId,
        group: GroupId,
    },
    Detach {
        id: BehaviourId,
    },
    Destroy {
        id: BehaviourId,
    },
    RegisterController {
        id: ControllerId,
        kind: ControllerKind,
        chirality: Chirality,
    },
    UnregisterController {
        id: ControllerId,
    },
}

/// Projected presence of a behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projected {
    Absent,
    Present {
        body: BodyHandle,
        group: Option<GroupId>,
    },
}

/// Operations queued since the last boundary, with the projection they imply.
#[derive(Debug, Default)]
pub struct PendingOps {
    pub(crate) ops: Vec<RegistryOp>,
    behaviours: BTreeMap<BehaviourId, Projected>,
    bodies: BTreeMap<BodyHandle, bool>,
    controllers: BTreeMap<ControllerId, bool>,
    next_behaviour: u64,
    pub(crate) grasp_releases: BTreeSet<ControllerId>,
    pub(crate) object_releases: BTreeSet<BehaviourId>,
}

impl PendingOps {
    /// Takes the queued operations and resets the projection.
    pub(crate) fn drain(&mut self) -> Vec<RegistryOp> {
        self.behaviours.clear();
        self.bodies.clear();
        self.controllers.clear();
        std::mem::take(&mut self.ops)
    }

    /// Nothing queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Deferred registry access.
///
/// Every method validates immediately and returns an error for requests that
/// would be invalid when applied; accepted requests take effect at the next
/// tick boundary.
pub struct Commands<'a> {
    registry: &'a Registry,
    pending: &'a mut PendingOps,
}

impl<'a> Commands<'a> {
    pub(crate) fn new(registry: &'a Registry, pending: &'a mut PendingOps) -> Self {
        Self { registry, pending }
    }

    /// Committed state, without queued operations.
    pub const fn registry(&self) -> &Registry {
        self.registry
    }

    fn projected(&self, id: BehaviourId) -> Projected {
        if let Some(p) = self.pending.behaviours.get(&id) {
            return *p;
        }
        self.registry
            .behaviours
            .get(&id)
            .map_or(Projected::Absent, |b| Projected::Present {
                body: b.body(),
                group: b.group(),
            })
    }

    fn body_taken(&self, body: BodyHandle) -> bool {
        self.pending
            .bodies
            .get(&body)
            .copied()
            .unwrap_or_else(|| self.registry.bodies.contains_key(&body))
    }

    fn controller_registered(&self, id: ControllerId) -> bool {
        self.pending
            .controllers
            .get(&id)
            .copied()
            .unwrap_or_else(|| self.registry.controllers.contains_key(&id))
    }

    /// Behaviour exists once queued operations apply.
    pub fn will_exist(&self, id: BehaviourId) -> bool {
        self.projected(id) != Projected::Absent
    }

    /// Group the behaviour will be attached to once queued operations apply.
    pub fn will_be_attached_to(&self, id: BehaviourId) -> Option<GroupId> {
        match self.projected(id) {
            Projected::Present { group, .. } => group,
            Projected::Absent => None,
        }
    }

    /// Queues a behaviour for `desc.body`, optionally pre-attached to `group`.
    pub fn create_behaviour(
        &mut self,
        desc: BehaviourDesc,
        group: Option<GroupId>,
    ) -> Result<BehaviourId, RegistryError> {
        if self.body_taken(desc.body) {
            return Err(RegistryError::BodyAlreadyRegistered(desc.body));
        }
        if let Some(g) = group {
            if !self.registry.groups.contains_key(&g) {
                return Err(RegistryError::UnknownGroup(g));
            }
        }
        let committed_next = self
            .registry
            .behaviours
            .keys()
            .next_back()
            .map_or(1, |b| b.0 + 1);
        let raw = self.pending.next_behaviour.max(committed_next);
        self.pending.next_behaviour = raw + 1;
        let id = BehaviourId(raw);
        self.pending.bodies.insert(desc.body, true);
        self.pending.behaviours.insert(
            id,
            Projected::Present {
                body: desc.body,
                group,
            },
        );
        self.pending.ops.push(RegistryOp::Create { id, desc, group });
        Ok(id)
    }

    /// Queues attaching a detached behaviour to `group`.
    pub fn try_attach(&mut self, id: BehaviourId, group: GroupId) -> Result<(), RegistryError> {
        let Projected::Present { body, group: current } = self.projected(id) else {
            return Err(RegistryError::UnknownBehaviour(id));
        };
        if let Some(current) = current {
            return Err(RegistryError::AlreadyAttached {
                behaviour: id,
                group: current,
            });
        }
        if !self.registry.groups.contains_key(&group) {
            return Err(RegistryError::UnknownGroup(group));
        }
        self.pending.behaviours.insert(
            id,
            Projected::Present {
                body,
                group: Some(group),
            },
        );
        self.pending.ops.push(RegistryOp::Attach { id, group });
        Ok(())
    }

    /// Queues detaching an attached behaviour.
    pub fn try_detach(&mut self, id: BehaviourId) -> Result<(), RegistryError> {
        let Projected::Present { body, group } = self.projected(id) else {
            return Err(RegistryError::UnknownBehaviour(id));
        };
        if group.is_none() {
            return Err(RegistryError::NotAttached(id));
        }
        self.pending
            .behaviours
            .insert(id, Projected::Present { body, group: None });
        self.pending.ops.push(RegistryOp::Detach { id });
        Ok(())
    }

    /// Queues destroying a behaviour (detaching it first if attached).
    pub fn destroy_behaviour(&mut self, id: BehaviourId) -> Result<(), RegistryError> {
        let Projected::Present { body, .. } = self.projected(id) else {
            return Err(RegistryError::UnknownBehaviour(id));
        };
        self.pending.behaviours.insert(id, Projected::Absent);
        self.pending.bodies.insert(body, false);
        self.pending.ops.push(RegistryOp::Destroy { id });
        Ok(())
    }

    /// Queues registering a controller.
    pub fn register_controller(
        &mut self,
        id: ControllerId,
        kind: ControllerKind,
        chirality: Chirality,
    ) -> Result<(), RegistryError> {
        if self.controller_registered(id) {
            return Err(RegistryError::ControllerAlreadyRegistered(id));
        }
        self.pending.controllers.insert(id, true);
        self.pending
            .ops
            .push(RegistryOp::RegisterController { id, kind, chirality });
        Ok(())
    }

    /// Queues unregistering a controller; its relations end when applied.
    pub fn unregister_controller(&mut self, id: ControllerId) -> Result<(), RegistryError> {
        if !self.controller_registered(id) {
            return Err(RegistryError::UnknownController(id));
        }
        self.pending.controllers.insert(id, false);
        self.pending.ops.push(RegistryOp::UnregisterController { id });
        Ok(())
    }

    /// Force-releases whatever `controller` grasps at the next grasp stage.
    pub fn release_grasp(&mut self, controller: ControllerId) -> Result<(), RegistryError> {
        if !self.controller_registered(controller) {
            return Err(RegistryError::UnknownController(controller));
        }
        self.pending.grasp_releases.insert(controller);
        Ok(())
    }

    /// Force-releases every grasp on `behaviour` at the next grasp stage.
    pub fn release_object(&mut self, behaviour: BehaviourId) -> Result<(), RegistryError> {
        if !self.will_exist(behaviour) {
            return Err(RegistryError::UnknownBehaviour(behaviour));
        }
        self.pending.object_releases.insert(behaviour);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_geom::Collider;

    fn world() -> Registry {
        let mut r = Registry::default();
        r.groups.insert(GroupId(0), GroupSettings::default());
        r.groups.insert(GroupId(1), GroupSettings::named("ui"));
        r
    }

    fn desc(body: u64) -> BehaviourDesc {
        BehaviourDesc::new(BodyHandle(body), Collider::Sphere { radius: 0.1 })
    }

    #[test]
    fn duplicate_body_is_rejected_until_destroy_is_queued() {
        let r = world();
        let mut p = PendingOps::default();
        let mut c = Commands::new(&r, &mut p);
        let id = c.create_behaviour(desc(10), None).unwrap();
        assert_eq!(
            c.create_behaviour(desc(10), None),
            Err(RegistryError::BodyAlreadyRegistered(BodyHandle(10)))
        );
        c.destroy_behaviour(id).unwrap();
        assert!(c.create_behaviour(desc(10), None).is_ok());
        assert_eq!(
            c.destroy_behaviour(id),
            Err(RegistryError::UnknownBehaviour(id))
        );
    }

    #[test]
    fn attach_and_detach_validate_against_projection() {
        let r = world();
        let mut p = PendingOps::default();
        let mut c = Commands::new(&r, &mut p);
        let id = c.create_behaviour(desc(1), Some(GroupId(0))).unwrap();
        assert_eq!(
            c.try_attach(id, GroupId(1)),
            Err(RegistryError::AlreadyAttached {
                behaviour: id,
                group: GroupId(0)
            })
        );
        c.try_detach(id).unwrap();
        assert_eq!(c.try_detach(id), Err(RegistryError::NotAttached(id)));
        c.try_attach(id, GroupId(1)).unwrap();
        assert_eq!(c.will_be_attached_to(id), Some(GroupId(1)));
        assert_eq!(
            c.try_attach(BehaviourId(99), GroupId(0)),
            Err(RegistryError::UnknownBehaviour(BehaviourId(99)))
        );
        assert_eq!(p.ops.len(), 3);
    }

    #[test]
    fn unknown_group_is_rejected() {
        let r = world();
        let mut p = PendingOps::default();
        let mut c = Commands::new(&r, &mut p);
        assert_eq!(
            c.create_behaviour(desc(1), Some(GroupId(9))),
            Err(RegistryError::UnknownGroup(GroupId(9)))
        );
    }

    #[test]
    fn controller_double_registration_is_rejected() {
        let r = world();
        let mut p = PendingOps::default();
        let mut c = Commands::new(&r, &mut p);
        c.register_controller(ControllerId(1), ControllerKind::Hand, Chirality::Left)
            .unwrap();
        assert_eq!(
            c.register_controller(ControllerId(1), ControllerKind::Hand, Chirality::Left),
            Err(RegistryError::ControllerAlreadyRegistered(ControllerId(1)))
        );
        c.unregister_controller(ControllerId(1)).unwrap();
        assert_eq!(
            c.unregister_controller(ControllerId(1)),
            Err(RegistryError::UnknownController(ControllerId(1)))
        );
        assert_eq!(
            c.release_grasp(ControllerId(1)),
            Err(RegistryError::UnknownController(ControllerId(1)))
        );
    }

    #[test]
    fn ids_are_allocated_monotonically() {
        let r = world();
        let mut p = PendingOps::default();
        let mut c = Commands::new(&r, &mut p);
        let a = c.create_behaviour(desc(1), None).unwrap();
        let b = c.create_behaviour(desc(2), None).unwrap();
        assert!(b > a);
        assert_eq!(a, BehaviourId(1));
    }
}
