// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON scenarios: a scene description plus per-tick controller keyframes,
//! replayed against the headless adapters.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use reach_core::headless::{HeadlessPhysics, ScriptedPoseSource};
use reach_core::{
    BehaviourDesc, BehaviourId, BodyDesc, Chirality, Collider, ContactForceMode, ControllerFrame,
    ControllerId, ControllerKind, GroupId, InteractionEvent, InteractionManager,
    InteractionSettings, PhysicsPort, Pose, RegistryError, SettingsError, Vec3,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Manager driven by a scenario.
pub type SimManager = InteractionManager<ScriptedPoseSource, HeadlessPhysics>;

/// Failure while loading or replaying a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Scenario path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not a valid scenario document.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Scenario path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// `dt` must be finite and positive.
    #[error("dt must be finite and > 0 (got {0})")]
    InvalidDt(f32),
    /// Two objects share a name.
    #[error("duplicate object name {0:?}")]
    DuplicateObject(String),
    /// A keyframe targets a controller the scenario does not declare.
    #[error("keyframe at tick {tick} targets undeclared controller {controller}")]
    UnknownController {
        /// Keyframe tick.
        tick: u64,
        /// Controller id.
        controller: u32,
    },
    /// Settings rejected by the manager.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// Registration rejected by the manager.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn default_dt() -> f32 {
    1.0 / 90.0
}

fn default_mass() -> f32 {
    1.0
}

/// Scene description and input script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Display name.
    pub name: String,
    /// Fixed step in seconds.
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Ticks to run; defaults to one past the last keyframe.
    #[serde(default)]
    pub ticks: Option<u64>,
    /// Settings overriding the stored ones.
    #[serde(default)]
    pub settings: Option<InteractionSettings>,
    /// Ground plane height.
    #[serde(default)]
    pub ground: Option<f32>,
    /// Interactable objects.
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    /// Controllers, registered in order.
    #[serde(default)]
    pub controllers: Vec<ControllerSpec>,
    /// Controller input changes.
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

/// One interactable object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    /// Unique name used in reports.
    pub name: String,
    /// Initial position.
    pub position: Vec3,
    /// Shape.
    pub collider: Collider,
    /// Body mass.
    #[serde(default = "default_mass")]
    pub mass: f32,
    /// Falls under gravity when not held.
    #[serde(default)]
    pub gravity: bool,
    /// Kinematic when not held.
    #[serde(default)]
    pub kinematic: bool,
    /// Several controllers may hold it at once.
    #[serde(default)]
    pub multi_grasp: bool,
    /// Contact weighting.
    #[serde(default)]
    pub contact_mode: ContactForceMode,
    /// Created without joining the default group.
    #[serde(default)]
    pub detached: bool,
}

/// One controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerSpec {
    /// Controller id.
    pub id: u32,
    /// Hand or VR controller.
    pub kind: ControllerKind,
    /// Handedness.
    #[serde(default)]
    pub chirality: Chirality,
}

/// Input change applied before tick `tick` (0-based).
///
/// The first keyframe of a controller creates its frame, tracked at the
/// origin unless the keyframe says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keyframe {
    /// Tick index.
    pub tick: u64,
    /// Controller id.
    pub controller: u32,
    /// New position.
    #[serde(default)]
    pub position: Option<Vec3>,
    /// New grasp strength.
    #[serde(default)]
    pub grasp: Option<f32>,
    /// New tracking flag.
    #[serde(default)]
    pub tracked: Option<bool>,
}

impl Scenario {
    /// Reads and checks a scenario file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let bytes = std::fs::read(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Self =
            serde_json::from_slice(&bytes).map_err(|source| ScenarioError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Structural checks that do not need a manager.
    pub fn check(&self) -> Result<(), ScenarioError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ScenarioError::InvalidDt(self.dt));
        }
        let mut names = BTreeSet::new();
        for object in &self.objects {
            if !names.insert(object.name.as_str()) {
                return Err(ScenarioError::DuplicateObject(object.name.clone()));
            }
        }
        let declared: BTreeSet<u32> = self.controllers.iter().map(|c| c.id).collect();
        if let Some(k) = self
            .keyframes
            .iter()
            .find(|k| !declared.contains(&k.controller))
        {
            return Err(ScenarioError::UnknownController {
                tick: k.tick,
                controller: k.controller,
            });
        }
        Ok(())
    }

    /// Number of ticks the scenario runs.
    pub fn tick_count(&self) -> u64 {
        self.ticks.unwrap_or_else(|| {
            self.keyframes
                .iter()
                .map(|k| k.tick + 1)
                .max()
                .unwrap_or(1)
        })
    }

    fn chirality_of(&self, controller: u32) -> Chirality {
        self.controllers
            .iter()
            .find(|c| c.id == controller)
            .map_or(Chirality::None, |c| c.chirality)
    }
}

impl ObjectSpec {
    fn body(&self) -> BodyDesc {
        BodyDesc {
            pose: Pose::from_position(self.position),
            collider: self.collider,
            kinematic: self.kinematic,
            gravity: self.gravity,
            trigger: false,
            mass: self.mass,
        }
    }
}

/// Final state of one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectReport {
    /// Object name.
    pub name: String,
    /// Final position.
    pub position: Vec3,
    /// Holds an activity monitor.
    pub active: bool,
    /// Hovered by any controller.
    pub hovered: bool,
    /// Touched by any controller.
    pub contacted: bool,
    /// Held by any controller.
    pub grasped: bool,
    /// Held only by untracked controllers.
    pub suspended: bool,
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Scenario name.
    pub name: String,
    /// Ticks executed.
    pub ticks: u64,
    /// Simulated seconds.
    pub time: f64,
    /// Event counts by name, including those emitted by `init`.
    pub events: BTreeMap<String, usize>,
    /// Object states in scenario order.
    pub objects: Vec<ObjectReport>,
    /// Behaviours excluded for invariant violations at the end.
    pub misbehaving: usize,
}

impl Report {
    /// Count for one event name.
    pub fn count(&self, name: &str) -> usize {
        self.events.get(name).copied().unwrap_or(0)
    }
}

fn tally(counts: &mut BTreeMap<String, usize>, events: &[InteractionEvent]) {
    for event in events {
        *counts.entry(event.name().to_owned()).or_insert(0) += 1;
    }
}

fn apply_keyframe(source: &mut ScriptedPoseSource, chirality: Chirality, k: &Keyframe) {
    let id = ControllerId(k.controller);
    if source.frame_mut(id).is_none() {
        let mut frame = ControllerFrame::tracked(id, Pose::IDENTITY);
        frame.chirality = chirality;
        source.set(frame);
    }
    let Some(frame) = source.frame_mut(id) else {
        return;
    };
    if let Some(position) = k.position {
        frame.pose.position = position;
    }
    if let Some(grasp) = k.grasp {
        frame.grasp_strength = grasp;
    }
    if let Some(tracked) = k.tracked {
        frame.is_tracked = tracked;
    }
}

/// Builds the scene, replays the keyframes and reports the final state.
///
/// `base` applies unless the scenario carries its own settings.
#[instrument(skip(scenario, base), fields(scenario = %scenario.name))]
pub fn run(scenario: &Scenario, base: InteractionSettings) -> Result<Report, ScenarioError> {
    scenario.check()?;
    let settings = scenario.settings.clone().unwrap_or(base);
    let mut physics = HeadlessPhysics::new();
    if let Some(y) = scenario.ground {
        physics = physics.with_ground(y);
    }
    let mut manager: SimManager =
        InteractionManager::new(settings, ScriptedPoseSource::new(), physics)?;

    let mut objects: Vec<(String, BehaviourId)> = Vec::with_capacity(scenario.objects.len());
    for spec in &scenario.objects {
        let body = manager.physics_mut().create_body(&spec.body());
        let desc = BehaviourDesc::new(body, spec.collider)
            .multi_grasp(spec.multi_grasp)
            .contact_mode(spec.contact_mode);
        let group = (!spec.detached).then_some(GroupId::DEFAULT);
        objects.push((spec.name.clone(), manager.create_behaviour(desc, group)?));
    }
    for c in &scenario.controllers {
        manager.register_controller(ControllerId(c.id), c.kind, c.chirality)?;
    }
    manager.init();

    let mut counts = BTreeMap::new();
    tally(&mut counts, manager.events());

    let ticks = scenario.tick_count();
    let mut keyframes: Vec<&Keyframe> = scenario.keyframes.iter().collect();
    keyframes.sort_by_key(|k| k.tick);
    let late = keyframes.iter().filter(|k| k.tick >= ticks).count();
    if late > 0 {
        warn!(late, ticks, "keyframes beyond the last tick are ignored");
    }
    let mut pending = keyframes.into_iter().peekable();
    for t in 0..ticks {
        while let Some(k) = pending.next_if(|k| k.tick == t) {
            apply_keyframe(
                manager.pose_source_mut(),
                scenario.chirality_of(k.controller),
                k,
            );
        }
        let summary = manager.tick(scenario.dt);
        tally(&mut counts, manager.events());
        let contacts = manager.physics_mut().step(scenario.dt);
        manager.report_collisions(contacts);
        debug!(?summary, "scenario tick");
    }

    let report = Report {
        name: scenario.name.clone(),
        ticks,
        time: manager.time(),
        events: counts,
        objects: objects
            .iter()
            .filter_map(|(name, id)| {
                let b = manager.behaviour(*id)?;
                Some(ObjectReport {
                    name: name.clone(),
                    position: b.pose().position,
                    active: manager.is_active(*id),
                    hovered: b.is_hovered(),
                    contacted: b.is_contacted(),
                    grasped: b.is_grasped(),
                    suspended: b.is_suspended(),
                })
            })
            .collect(),
        misbehaving: manager.activity().misbehaving().len(),
    };
    manager.shutdown();
    info!(ticks, events = report.events.values().sum::<usize>(), "scenario complete");
    Ok(report)
}
