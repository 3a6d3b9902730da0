// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The interaction manager.
//!
//! Owns the pose source, the physics port, the registry and the activity
//! manager, and runs one fixed-order pass per physics tick:
//!
//! 0. boundary: apply queued registry operations, emit `Started`
//! 1. intake: controller frames, tracking transitions, grasp intent
//! 2. activity refresh
//! 3. hover, primary hover, contact, grasp, suspension
//! 4. grasped motion and throw history
//! 5. contact skeleton synchronisation
//! 6. validation (when enabled)
//! 7. boundary: dispatch events to listeners, apply what they queued
//!
//! Nothing in `tick` panics. Configuration problems are logged and skipped;
//! invariant violations mark the behaviour misbehaving.

mod stages;

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::activity::ActivityManager;
use crate::behaviour::{BehaviourDesc, InteractionBehaviour};
use crate::controller::{ControllerFlags, ControllerKind, InteractionController};
use crate::error::{RegistryError, SettingsError};
use crate::events::{
    AttachInfo, GraspEndReason, InteractionEvent, InteractionListener, LifecycleStage,
};
use crate::ids::{BehaviourId, ControllerId, GroupId};
use crate::ports::{Chirality, CollisionEvent, PhysicsPort, PoseSource};
use crate::registry::{Commands, GroupSettings, PendingOps, Registry, RegistryOp};
use crate::settings::InteractionSettings;
use crate::validate::{self, Violation};

/// Listener cascades longer than this are cut off with a warning.
const MAX_FLUSH_ROUNDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Created,
    Running,
    ShutDown,
}

/// Counters describing one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TickSummary {
    /// Tick number (1-based; 0 before the first tick).
    pub tick: u64,
    /// Events recorded this tick.
    pub events: usize,
    /// Active behaviours.
    pub active: usize,
    /// Grasped behaviours.
    pub grasped: usize,
    /// Suspended behaviours.
    pub suspended: usize,
    /// Misbehaving behaviours.
    pub misbehaving: usize,
}

/// Orchestrates interaction for one scene.
pub struct InteractionManager<S: PoseSource, P: PhysicsPort> {
    settings: InteractionSettings,
    source: S,
    physics: P,
    registry: Registry,
    pending: PendingOps,
    activity: ActivityManager,
    listeners: Vec<Box<dyn InteractionListener>>,
    events: Vec<InteractionEvent>,
    flushed: usize,
    collisions: Vec<CollisionEvent>,
    awaiting_start: BTreeSet<BehaviourId>,
    state: RunState,
    tick: u64,
    time: f64,
    next_group: u32,
    next_controller_order: u64,
}

impl<S: PoseSource, P: PhysicsPort> InteractionManager<S, P> {
    /// Creates a manager with a [`GroupId::DEFAULT`] group.
    ///
    /// Nothing is processed until [`Self::init`].
    pub fn new(settings: InteractionSettings, source: S, physics: P) -> Result<Self, SettingsError> {
        settings.validate()?;
        let mut registry = Registry::default();
        registry
            .groups
            .insert(GroupId::DEFAULT, GroupSettings::default());
        Ok(Self {
            activity: ActivityManager::new(&settings.activity),
            settings,
            source,
            physics,
            registry,
            pending: PendingOps::default(),
            listeners: Vec::new(),
            events: Vec::new(),
            flushed: 0,
            collisions: Vec::new(),
            awaiting_start: BTreeSet::new(),
            state: RunState::Created,
            tick: 0,
            time: 0.0,
            next_group: 1,
            next_controller_order: 0,
        })
    }

    /// Applies registrations queued before init and starts processing.
    #[instrument(skip(self))]
    pub fn init(&mut self) {
        if self.state != RunState::Created {
            warn!("init called twice; ignored");
            return;
        }
        self.events.clear();
        self.flushed = 0;
        self.state = RunState::Running;
        self.apply_pending();
        info!(
            behaviours = self.registry.behaviours.len(),
            controllers = self.registry.controllers.len(),
            "interaction manager initialised"
        );
        self.flush();
    }

    /// Releases every grasp, then tears down every behaviour and controller.
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) {
        if self.state == RunState::ShutDown {
            return;
        }
        self.events.clear();
        self.flushed = 0;
        let dropped = self.pending.drain();
        if !dropped.is_empty() {
            debug!(ops = dropped.len(), "queued registry operations dropped on shutdown");
        }
        let grasps: Vec<_> = self
            .registry
            .controllers
            .values()
            .filter_map(|c| c.grasped().map(|b| (c.id(), b)))
            .collect();
        for (cid, bid) in grasps {
            self.end_grasp_now(cid, bid, GraspEndReason::Forced);
        }
        let behaviours: Vec<_> = self.registry.behaviours.keys().copied().collect();
        for id in behaviours {
            self.destroy_now(id);
        }
        let controllers: Vec<_> = self.registry.controllers.keys().copied().collect();
        for id in controllers {
            self.remove_controller_now(id);
        }
        self.state = RunState::ShutDown;
        self.flush();
        info!(ticks = self.tick, "interaction manager shut down");
    }

    /// Runs one fixed step of `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickSummary {
        if self.state != RunState::Running {
            warn!("tick called while not running; call init first");
            return self.summary();
        }
        if !(dt.is_finite() && dt > 0.0) {
            warn!(dt, "tick skipped: dt must be finite and > 0");
            return self.summary();
        }
        self.events.clear();
        self.flushed = 0;
        self.tick += 1;
        self.time += f64::from(dt);

        self.apply_pending();
        self.emit_started();

        self.stage_intake();
        self.stage_activity();
        self.stage_hover();
        self.stage_primary_hover();
        self.stage_contact();
        self.stage_grasp();
        self.stage_suspension();
        self.stage_motion(dt);
        self.stage_skeleton(dt);
        if self.settings.validation.enabled {
            self.stage_validation();
        }

        self.flush();
        let summary = self.summary();
        debug!(?summary, "tick complete");
        summary
    }

    fn summary(&self) -> TickSummary {
        let (grasped, suspended) = self
            .registry
            .behaviours
            .values()
            .fold((0, 0), |(g, s), b| {
                (g + usize::from(b.is_grasped()), s + usize::from(b.is_suspended()))
            });
        TickSummary {
            tick: self.tick,
            events: self.events.len(),
            active: self.activity.active().len(),
            grasped,
            suspended,
            misbehaving: self.activity.misbehaving().len(),
        }
    }

    // ── configuration and access ───────────────────────────────────────────

    /// Active settings.
    pub const fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    /// Between `init` and `shutdown`.
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Ticks processed so far.
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds processed so far.
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Committed registry state.
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Activity manager.
    pub const fn activity(&self) -> &ActivityManager {
        &self.activity
    }

    /// Physics port.
    pub const fn physics(&self) -> &P {
        &self.physics
    }

    /// Physics port, mutably (hosts step their world through this).
    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    /// Pose source.
    pub const fn pose_source(&self) -> &S {
        &self.source
    }

    /// Pose source, mutably.
    pub fn pose_source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Events recorded by the last tick (or by `init` / `shutdown`).
    pub fn events(&self) -> &[InteractionEvent] {
        &self.events
    }

    /// Registered behaviour.
    pub fn behaviour(&self, id: BehaviourId) -> Option<&InteractionBehaviour> {
        self.registry.behaviours.get(&id)
    }

    /// Registered controller.
    pub fn controller(&self, id: ControllerId) -> Option<&InteractionController> {
        self.registry.controllers.get(&id)
    }

    /// `id` holds an activity monitor.
    pub fn is_active(&self, id: BehaviourId) -> bool {
        self.activity.is_active(id)
    }

    /// Sets the activation radius; invalid values are logged and rejected.
    ///
    /// The radius may not drop below `hover.hover_radius`.
    pub fn set_overlap_radius(&mut self, radius: f32) -> bool {
        let hover = self.settings.hover.hover_radius;
        if radius < hover {
            error!(
                radius,
                hover,
                "overlap radius below the hover radius; keeping {}",
                self.settings.activity.overlap_radius
            );
            return false;
        }
        let ok = self.activity.set_overlap_radius(radius);
        if ok {
            self.settings.activity.overlap_radius = radius;
        }
        ok
    }

    /// Sets the activation depth; invalid values are logged and rejected.
    pub fn set_max_depth(&mut self, depth: u32) -> bool {
        let ok = self.activity.set_max_depth(depth);
        if ok {
            self.settings.activity.max_depth = depth;
        }
        ok
    }

    /// Subscribes a listener.
    pub fn add_listener<L: InteractionListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    /// Subscribes a closure.
    pub fn on_event<F>(&mut self, f: F)
    where
        F: FnMut(&InteractionEvent, &mut Commands<'_>) + 'static,
    {
        self.listeners.push(Box::new(f));
    }

    // ── registration ───────────────────────────────────────────────────────

    /// Deferred registry access.
    pub fn commands(&mut self) -> Commands<'_> {
        Commands::new(&self.registry, &mut self.pending)
    }

    /// See [`Commands::create_behaviour`].
    pub fn create_behaviour(
        &mut self,
        desc: BehaviourDesc,
        group: Option<GroupId>,
    ) -> Result<BehaviourId, RegistryError> {
        self.commands().create_behaviour(desc, group)
    }

    /// See [`Commands::try_attach`].
    pub fn try_attach(&mut self, id: BehaviourId, group: GroupId) -> Result<(), RegistryError> {
        self.commands().try_attach(id, group)
    }

    /// See [`Commands::try_detach`].
    pub fn try_detach(&mut self, id: BehaviourId) -> Result<(), RegistryError> {
        self.commands().try_detach(id)
    }

    /// See [`Commands::destroy_behaviour`].
    pub fn destroy_behaviour(&mut self, id: BehaviourId) -> Result<(), RegistryError> {
        self.commands().destroy_behaviour(id)
    }

    /// See [`Commands::register_controller`].
    pub fn register_controller(
        &mut self,
        id: ControllerId,
        kind: ControllerKind,
        chirality: Chirality,
    ) -> Result<(), RegistryError> {
        self.commands().register_controller(id, kind, chirality)
    }

    /// See [`Commands::unregister_controller`].
    pub fn unregister_controller(&mut self, id: ControllerId) -> Result<(), RegistryError> {
        self.commands().unregister_controller(id)
    }

    /// See [`Commands::release_grasp`].
    pub fn release_grasp(&mut self, controller: ControllerId) -> Result<(), RegistryError> {
        self.commands().release_grasp(controller)
    }

    /// See [`Commands::release_object`].
    pub fn release_object(&mut self, behaviour: BehaviourId) -> Result<(), RegistryError> {
        self.commands().release_object(behaviour)
    }

    /// Creates a group immediately.
    pub fn create_group(&mut self, settings: GroupSettings) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;
        info!(group = %id, name = %settings.name, "group created");
        self.registry.groups.insert(id, settings);
        id
    }

    /// Replaces a group's switches; they apply from the next stage on.
    pub fn set_group_settings(&mut self, id: GroupId, settings: GroupSettings) -> Result<(), RegistryError> {
        let slot = self
            .registry
            .groups
            .get_mut(&id)
            .ok_or(RegistryError::UnknownGroup(id))?;
        *slot = settings;
        Ok(())
    }

    /// Replaces a controller's switches; they apply from the next stage on.
    pub fn configure_controller(
        &mut self,
        id: ControllerId,
        flags: ControllerFlags,
    ) -> Result<(), RegistryError> {
        self.registry
            .controllers
            .get_mut(&id)
            .ok_or(RegistryError::UnknownController(id))?
            .set_flags(flags);
        Ok(())
    }

    // ── shadow physics ─────────────────────────────────────────────────────

    /// Sets the kinematic flag the object returns to when released.
    pub fn set_object_kinematic(&mut self, id: BehaviourId, kinematic: bool) -> Result<(), RegistryError> {
        let b = self
            .registry
            .behaviours
            .get_mut(&id)
            .ok_or(RegistryError::UnknownBehaviour(id))?;
        b.set_shadow_kinematic(kinematic, &mut self.physics);
        Ok(())
    }

    /// Sets the gravity flag the object returns to when released.
    pub fn set_object_gravity(&mut self, id: BehaviourId, gravity: bool) -> Result<(), RegistryError> {
        let b = self
            .registry
            .behaviours
            .get_mut(&id)
            .ok_or(RegistryError::UnknownBehaviour(id))?;
        b.set_shadow_gravity(gravity, &mut self.physics);
        Ok(())
    }

    /// Re-reads the shadow flags from physics after the host changed them
    /// directly. `Ok(false)` while the object is held.
    pub fn resync_shadow(&mut self, id: BehaviourId) -> Result<bool, RegistryError> {
        let b = self
            .registry
            .behaviours
            .get_mut(&id)
            .ok_or(RegistryError::UnknownBehaviour(id))?;
        Ok(b.resync_shadow(&self.physics))
    }

    /// Buffers collision callbacks for the next contact stage.
    pub fn report_collisions(&mut self, events: impl IntoIterator<Item = CollisionEvent>) {
        self.collisions.extend(events);
    }

    // ── validation ─────────────────────────────────────────────────────────

    /// Every invariant violation currently present.
    pub fn validate(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        for b in self.registry.behaviours.values() {
            out.extend(b.validate(&self.physics).into_iter().map(|kind| Violation {
                behaviour: b.id(),
                kind,
            }));
        }
        out.extend(validate::check_relations(&self.registry));
        out.extend(self.activity.validate());
        out
    }

    // ── boundary ───────────────────────────────────────────────────────────

    fn emit_started(&mut self) {
        for id in std::mem::take(&mut self.awaiting_start) {
            let Some(b) = self.registry.behaviours.get_mut(&id) else {
                continue;
            };
            if b.is_attached() && b.mark_started() {
                self.events.push(InteractionEvent::Lifecycle {
                    behaviour: id,
                    stage: LifecycleStage::Started,
                    info: AttachInfo::from_group(b.group()),
                });
            }
        }
    }

    /// Dispatches unsent events; applies what listeners queue, repeatedly.
    fn flush(&mut self) {
        for _ in 0..MAX_FLUSH_ROUNDS {
            while self.flushed < self.events.len() {
                let event = &self.events[self.flushed];
                self.flushed += 1;
                let mut commands = Commands::new(&self.registry, &mut self.pending);
                for listener in &mut self.listeners {
                    listener.on_event(event, &mut commands);
                }
            }
            if self.pending.is_empty() {
                return;
            }
            if self.state != RunState::Running {
                let dropped = self.pending.drain();
                debug!(ops = dropped.len(), "registry operations dropped: manager not running");
                return;
            }
            self.apply_pending();
        }
        warn!(
            rounds = MAX_FLUSH_ROUNDS,
            "listener cascade did not settle; remaining operations apply next tick"
        );
    }

    fn apply_pending(&mut self) {
        for op in self.pending.drain() {
            match op {
                RegistryOp::Create { id, desc, group } => self.create_now(id, desc, group),
                RegistryOp::Attach { id, group } => self.attach_now(id, group),
                RegistryOp::Detach { id } => self.detach_now(id),
                RegistryOp::Destroy { id } => self.destroy_now(id),
                RegistryOp::RegisterController {
                    id,
                    kind,
                    chirality,
                } => self.add_controller_now(id, kind, chirality),
                RegistryOp::UnregisterController { id } => self.remove_controller_now(id),
            }
        }
    }

    fn create_now(&mut self, id: BehaviourId, desc: BehaviourDesc, group: Option<GroupId>) {
        if let Some(owner) = self.registry.bodies.get(&desc.body) {
            warn!(%id, body = %desc.body, %owner, "body already registered; creation skipped");
            return;
        }
        let body = desc.body;
        let behaviour = InteractionBehaviour::new(id, desc, &self.physics);
        self.registry.bodies.insert(body, id);
        self.registry.behaviours.insert(id, behaviour);
        info!(%id, %body, "behaviour created");
        self.events.push(InteractionEvent::Lifecycle {
            behaviour: id,
            stage: LifecycleStage::Created,
            info: AttachInfo::from_group(group),
        });
        if let Some(g) = group {
            self.attach_now(id, g);
        }
    }

    fn attach_now(&mut self, id: BehaviourId, group: GroupId) {
        if !self.registry.groups.contains_key(&group) {
            warn!(%id, %group, "attach to unknown group skipped");
            return;
        }
        let Some(b) = self.registry.behaviours.get_mut(&id) else {
            warn!(%id, "attach of unknown behaviour skipped");
            return;
        };
        if let Some(current) = b.group() {
            warn!(%id, %current, "attach of attached behaviour skipped");
            return;
        }
        if let Some(pose) = self.physics.body_pose(b.body()) {
            b.set_pose(pose);
        }
        b.set_group(Some(group));
        self.activity
            .register(id, b.desc().collider.world_aabb(&b.pose()));
        self.awaiting_start.insert(id);
        debug!(%id, %group, "behaviour attached");
        self.events.push(InteractionEvent::Lifecycle {
            behaviour: id,
            stage: LifecycleStage::Enabled,
            info: AttachInfo::attached(group),
        });
    }

    fn detach_now(&mut self, id: BehaviourId) {
        if !self
            .registry
            .behaviours
            .get(&id)
            .is_some_and(InteractionBehaviour::is_attached)
        {
            warn!(%id, "detach of detached behaviour skipped");
            return;
        }
        self.end_all_relations(id, GraspEndReason::Detached);
        if self.activity.unregister(id).is_some() {
            self.events
                .push(InteractionEvent::Deactivated { behaviour: id });
        }
        self.awaiting_start.remove(&id);
        if let Some(b) = self.registry.behaviours.get_mut(&id) {
            b.set_group(None);
        }
        debug!(%id, "behaviour detached");
        self.events.push(InteractionEvent::Lifecycle {
            behaviour: id,
            stage: LifecycleStage::Disabled,
            info: AttachInfo::detached(),
        });
    }

    fn destroy_now(&mut self, id: BehaviourId) {
        let Some(attached) = self
            .registry
            .behaviours
            .get(&id)
            .map(InteractionBehaviour::is_attached)
        else {
            warn!(%id, "destroy of unknown behaviour skipped");
            return;
        };
        if attached {
            self.detach_now(id);
        }
        for ctrl in self.registry.controllers.values_mut() {
            if let Some(s) = ctrl.skeleton.as_mut() {
                s.forget(id);
            }
        }
        if let Some(b) = self.registry.behaviours.remove(&id) {
            self.registry.bodies.remove(&b.body());
        }
        info!(%id, "behaviour destroyed");
        self.events.push(InteractionEvent::Lifecycle {
            behaviour: id,
            stage: LifecycleStage::Destroyed,
            info: AttachInfo::detached(),
        });
    }

    fn add_controller_now(&mut self, id: ControllerId, kind: ControllerKind, chirality: Chirality) {
        if self.registry.controllers.contains_key(&id) {
            warn!(%id, "controller already registered; skipped");
            return;
        }
        let order = self.next_controller_order;
        self.next_controller_order += 1;
        self.registry
            .controllers
            .insert(id, InteractionController::new(id, kind, chirality, order));
        info!(%id, ?kind, ?chirality, "controller registered");
    }

    fn remove_controller_now(&mut self, id: ControllerId) {
        let Some(ctrl) = self.registry.controllers.get(&id) else {
            warn!(%id, "unregister of unknown controller skipped");
            return;
        };
        let grasped = ctrl.grasped();
        let contacted: Vec<_> = ctrl.contacted_behaviours().collect();
        let hovered: Vec<_> = ctrl.hovered_behaviours().collect();
        if let Some(bid) = grasped {
            self.end_grasp_now(id, bid, GraspEndReason::ControllerRemoved);
        }
        for bid in contacted {
            stages::end_contact_pair(&mut self.registry, &mut self.events, id, bid);
        }
        for bid in hovered {
            stages::end_hover_pair(&mut self.registry, &mut self.events, id, bid);
        }
        if let Some(ctrl) = self.registry.controllers.remove(&id) {
            if let Some(s) = ctrl.skeleton {
                for body in s.destroy(&mut self.physics) {
                    self.registry.bones.remove(&body);
                }
            }
        }
        info!(%id, "controller unregistered");
    }

    /// Ends every controller relation with `id`; grasps end with `reason`.
    fn end_all_relations(&mut self, id: BehaviourId, reason: GraspEndReason) {
        let Some(b) = self.registry.behaviours.get(&id) else {
            return;
        };
        let graspers: Vec<_> = b.grasping_controllers().collect();
        let contacting: Vec<_> = b.contacting_controllers().collect();
        let hovering: Vec<_> = b.hovering_controllers().collect();
        for cid in graspers {
            self.end_grasp_now(cid, id, reason);
        }
        for cid in contacting {
            stages::end_contact_pair(&mut self.registry, &mut self.events, cid, id);
        }
        for cid in hovering {
            stages::end_hover_pair(&mut self.registry, &mut self.events, cid, id);
        }
    }

    /// Ends one grasp on both sides, restoring physics after the last one.
    ///
    /// The last `Released` or `Forced` grasp of an object that follows its
    /// graspers applies the throw estimate.
    fn end_grasp_now(&mut self, cid: ControllerId, bid: BehaviourId, reason: GraspEndReason) {
        let Registry {
            behaviours,
            controllers,
            ..
        } = &mut self.registry;
        let Some(b) = behaviours.get_mut(&bid) else {
            return;
        };
        let last = b.grasp_count() == 1;
        let throws = self.settings.throw.enabled
            && b.desc().move_when_grasped
            && matches!(reason, GraspEndReason::Released | GraspEndReason::Forced);
        let velocity = if last && throws {
            b.release_velocity()
        } else {
            None
        };
        if !b.end_grasp(cid, reason, velocity, &mut self.events) {
            return;
        }
        if let Some(ctrl) = controllers.get_mut(&cid) {
            ctrl.set_grasped(None);
        }
        b.apply_physics_policy(&mut self.physics);
        if !b.is_grasped() {
            if let Some(v) = velocity {
                self.physics.set_linear_velocity(b.body(), v);
            }
            b.throw_history_mut().clear();
        }
        debug!(controller = %cid, behaviour = %bid, ?reason, "grasp ended");
    }
}
