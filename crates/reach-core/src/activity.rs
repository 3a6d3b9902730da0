// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Activation broadphase.
//!
//! Only active behaviours take part in hover, contact and grasp evaluation.
//! A behaviour is active while it holds a monitor; monitors are created for
//! behaviours near a tracked controller (depth 1) and for behaviours whose
//! bounds overlap an active one (depth + 1, up to `max_depth`), so a stack of
//! touching objects wakes together.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use reach_geom::{Aabb, BroadPhase, SpatialGrid, SpatialQuery, Vec3};
use rustc_hash::FxHashMap;
use tracing::{debug, error};

use crate::ids::BehaviourId;
use crate::settings::ActivitySettings;
use crate::validate::{Violation, ViolationKind};

/// Activation record of one behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monitor {
    /// Propagation depth at the last refresh (1 = near a controller).
    pub depth: u32,
    /// Tick the monitor was created on.
    pub activated_tick: u64,
    /// Consecutive refreshes the behaviour was out of range.
    pub ticks_out_of_range: u32,
}

/// Monitors created and removed by one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityDelta {
    /// Newly active behaviours with their depth, by id.
    pub activated: Vec<(BehaviourId, u32)>,
    /// Behaviours whose monitor was removed, by id.
    pub deactivated: Vec<BehaviourId>,
}

/// Tracks which registered behaviours are active.
#[derive(Debug, Clone)]
pub struct ActivityManager {
    overlap_radius: f32,
    max_depth: u32,
    grace_ticks: u32,
    index: SpatialGrid,
    monitors: FxHashMap<BehaviourId, Monitor>,
    active: Vec<BehaviourId>,
    misbehaving: BTreeSet<BehaviourId>,
}

impl ActivityManager {
    /// Creates an empty manager. Settings are assumed validated.
    pub fn new(settings: &ActivitySettings) -> Self {
        Self {
            overlap_radius: settings.overlap_radius,
            max_depth: settings.max_depth.max(1),
            grace_ticks: settings.deactivation_grace_ticks,
            index: SpatialGrid::new(settings.grid_cell_size),
            monitors: FxHashMap::default(),
            active: Vec::new(),
            misbehaving: BTreeSet::new(),
        }
    }

    /// Activation radius around tracked controllers.
    pub const fn overlap_radius(&self) -> f32 {
        self.overlap_radius
    }

    /// Maximum propagation depth.
    pub const fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Sets the activation radius; non-positive values are rejected.
    pub fn set_overlap_radius(&mut self, radius: f32) -> bool {
        if !(radius.is_finite() && radius > 0.0) {
            error!(radius, "overlap radius must be finite and > 0; keeping {}", self.overlap_radius);
            return false;
        }
        self.overlap_radius = radius;
        true
    }

    /// Sets the maximum propagation depth; zero is rejected.
    pub fn set_max_depth(&mut self, depth: u32) -> bool {
        if depth < 1 {
            error!(depth, "max depth must be >= 1; keeping {}", self.max_depth);
            return false;
        }
        self.max_depth = depth;
        true
    }

    /// Sets how many out-of-range refreshes a monitor survives.
    pub fn set_deactivation_grace_ticks(&mut self, ticks: u32) {
        self.grace_ticks = ticks;
    }

    /// Stores or moves a behaviour's bounds.
    pub fn register(&mut self, id: BehaviourId, bounds: Aabb) {
        self.index.upsert(id.0, bounds);
    }

    /// Removes a behaviour; returns its monitor if it was active.
    pub fn unregister(&mut self, id: BehaviourId) -> Option<Monitor> {
        self.index.remove(id.0);
        self.misbehaving.remove(&id);
        let monitor = self.monitors.remove(&id);
        if monitor.is_some() {
            self.active.retain(|a| *a != id);
        }
        monitor
    }

    /// Bounds are stored for `id`.
    pub fn is_registered(&self, id: BehaviourId) -> bool {
        self.index.contains(id.0)
    }

    /// Stored bounds of `id`.
    pub fn bounds(&self, id: BehaviourId) -> Option<Aabb> {
        self.index.bounds(id.0)
    }

    /// `id` holds a monitor.
    pub fn is_active(&self, id: BehaviourId) -> bool {
        self.monitors.contains_key(&id)
    }

    /// Monitor of `id`.
    pub fn monitor(&self, id: BehaviourId) -> Option<&Monitor> {
        self.monitors.get(&id)
    }

    /// Active behaviours, ascending.
    pub fn active(&self) -> &[BehaviourId] {
        &self.active
    }

    /// Behaviours currently excluded from new interactions.
    pub const fn misbehaving(&self) -> &BTreeSet<BehaviourId> {
        &self.misbehaving
    }

    /// `id` is excluded from new interactions.
    pub fn is_misbehaving(&self, id: BehaviourId) -> bool {
        self.misbehaving.contains(&id)
    }

    /// Marks `id` misbehaving; `false` if unregistered or already marked.
    pub fn mark_misbehaving(&mut self, id: BehaviourId) -> bool {
        self.is_registered(id) && self.misbehaving.insert(id)
    }

    /// Clears the misbehaving mark.
    pub fn clear_misbehaving(&mut self, id: BehaviourId) -> bool {
        self.misbehaving.remove(&id)
    }

    /// Activates `id` directly (contact revival). `false` if unregistered or
    /// already active.
    pub fn activate(&mut self, id: BehaviourId, tick: u64) -> bool {
        if !self.is_registered(id) || self.is_active(id) {
            return false;
        }
        self.monitors.insert(
            id,
            Monitor {
                depth: 1,
                activated_tick: tick,
                ticks_out_of_range: 0,
            },
        );
        self.rebuild_active();
        debug!(%id, "activated by contact");
        true
    }

    /// Recomputes the active set from tracked controller positions.
    ///
    /// Behaviours in `keep_alive` keep an existing monitor even when out of
    /// range.
    pub fn refresh(
        &mut self,
        points: &[Vec3],
        keep_alive: &BTreeSet<BehaviourId>,
        tick: u64,
    ) -> ActivityDelta {
        let reached = self.reachable(points);
        let mut delta = ActivityDelta::default();

        for (id, depth) in &reached {
            match self.monitors.get_mut(id) {
                Some(m) => {
                    m.depth = *depth;
                    m.ticks_out_of_range = 0;
                }
                None => {
                    self.monitors.insert(
                        *id,
                        Monitor {
                            depth: *depth,
                            activated_tick: tick,
                            ticks_out_of_range: 0,
                        },
                    );
                    delta.activated.push((*id, *depth));
                }
            }
        }

        let mut candidates: Vec<BehaviourId> = self
            .monitors
            .keys()
            .filter(|id| !reached.contains_key(id) && !keep_alive.contains(id))
            .copied()
            .collect();
        candidates.sort_unstable();
        for id in candidates {
            let Some(m) = self.monitors.get_mut(&id) else {
                continue;
            };
            m.ticks_out_of_range += 1;
            if m.ticks_out_of_range > self.grace_ticks {
                self.monitors.remove(&id);
                delta.deactivated.push(id);
            }
        }
        for id in keep_alive {
            if let Some(m) = self.monitors.get_mut(id) {
                m.ticks_out_of_range = 0;
            }
        }

        if !delta.activated.is_empty() || !delta.deactivated.is_empty() {
            self.rebuild_active();
            debug!(
                activated = delta.activated.len(),
                deactivated = delta.deactivated.len(),
                active = self.active.len(),
                "activity refreshed"
            );
        }
        delta
    }

    /// Breadth-first reach from `points` over bound overlaps.
    fn reachable(&self, points: &[Vec3]) -> BTreeMap<BehaviourId, u32> {
        let mut depth: BTreeMap<BehaviourId, u32> = BTreeMap::new();
        let mut queue = VecDeque::new();
        for p in points {
            for raw in self.index.query_sphere(*p, self.overlap_radius) {
                let id = BehaviourId(raw);
                if let std::collections::btree_map::Entry::Vacant(e) = depth.entry(id) {
                    e.insert(1);
                    queue.push_back(id);
                }
            }
        }
        while let Some(id) = queue.pop_front() {
            let d = depth.get(&id).copied().unwrap_or(1);
            if d >= self.max_depth {
                continue;
            }
            let Some(bounds) = self.index.bounds(id.0) else {
                continue;
            };
            for raw in self.index.query_aabb(&bounds) {
                let n = BehaviourId(raw);
                if let std::collections::btree_map::Entry::Vacant(e) = depth.entry(n) {
                    e.insert(d + 1);
                    queue.push_back(n);
                }
            }
        }
        depth
    }

    fn rebuild_active(&mut self) {
        self.active = self.monitors.keys().copied().collect();
        self.active.sort_unstable();
    }

    /// Checks active ⊆ registered, misbehaving ⊆ registered, and that the
    /// active list mirrors the monitor map.
    pub fn validate(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        let mut ids: Vec<_> = self.monitors.keys().copied().collect();
        ids.sort_unstable();
        for id in &ids {
            if !self.is_registered(*id) {
                out.push(Violation {
                    behaviour: *id,
                    kind: ViolationKind::NotRegistered,
                });
            }
        }
        for id in &self.misbehaving {
            if !self.is_registered(*id) {
                out.push(Violation {
                    behaviour: *id,
                    kind: ViolationKind::NotRegistered,
                });
            }
        }
        if ids != self.active {
            let listed: BTreeSet<_> = self.active.iter().copied().collect();
            let held: BTreeSet<_> = ids.iter().copied().collect();
            for id in listed.symmetric_difference(&held) {
                out.push(Violation {
                    behaviour: *id,
                    kind: ViolationKind::MonitorMismatch,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Within the default radius of the first cube only.
    const NEAR_FIRST: Vec3 = Vec3::new(-0.25, 0.0, 0.0);

    fn cube(x: f32) -> Aabb {
        Aabb::from_center_half_extents(Vec3::new(x, 0.0, 0.0), Vec3::splat(0.05))
    }

    fn stacked(depth: u32) -> ActivityManager {
        let mut a = ActivityManager::new(&ActivitySettings {
            max_depth: depth,
            ..ActivitySettings::default()
        });
        // Touching chain along +X: 0.0, 0.1, 0.2, 0.3.
        for i in 0..4u8 {
            a.register(BehaviourId(u64::from(i) + 1), cube(f32::from(i) * 0.1));
        }
        a
    }

    #[test]
    fn propagation_stops_at_max_depth() {
        let mut a = stacked(2);
        let delta = a.refresh(&[NEAR_FIRST], &BTreeSet::new(), 1);
        assert_eq!(delta.activated, vec![(BehaviourId(1), 1), (BehaviourId(2), 2)]);
        assert_eq!(a.active(), &[BehaviourId(1), BehaviourId(2)]);
        assert!(!a.is_active(BehaviourId(3)));
        assert!(a.validate().is_empty());
    }

    #[test]
    fn out_of_range_deactivates_unless_kept_alive() {
        let mut a = stacked(1);
        a.refresh(&[NEAR_FIRST], &BTreeSet::new(), 1);
        assert!(a.is_active(BehaviourId(1)));
        let keep: BTreeSet<_> = [BehaviourId(1)].into_iter().collect();
        let delta = a.refresh(&[], &keep, 2);
        assert!(delta.deactivated.is_empty());
        let delta = a.refresh(&[], &BTreeSet::new(), 3);
        assert_eq!(delta.deactivated, vec![BehaviourId(1)]);
        assert!(a.active().is_empty());
    }

    #[test]
    fn grace_ticks_delay_deactivation() {
        let mut a = stacked(1);
        a.set_deactivation_grace_ticks(2);
        a.refresh(&[NEAR_FIRST], &BTreeSet::new(), 1);
        assert!(a.refresh(&[], &BTreeSet::new(), 2).deactivated.is_empty());
        assert!(a.refresh(&[], &BTreeSet::new(), 3).deactivated.is_empty());
        assert!(!a.refresh(&[], &BTreeSet::new(), 4).deactivated.is_empty());
    }

    #[test]
    fn invalid_radius_and_depth_are_rejected() {
        let mut a = stacked(3);
        assert!(!a.set_overlap_radius(0.0));
        assert!(!a.set_overlap_radius(f32::NAN));
        assert!(!a.set_max_depth(0));
        assert_eq!(a.max_depth(), 3);
        assert!(a.set_overlap_radius(1.0));
    }

    #[test]
    fn unregister_drops_monitor_and_mark() {
        let mut a = stacked(1);
        a.activate(BehaviourId(4), 0);
        assert!(a.mark_misbehaving(BehaviourId(4)));
        assert!(a.unregister(BehaviourId(4)).is_some());
        assert!(!a.is_misbehaving(BehaviourId(4)));
        assert!(!a.mark_misbehaving(BehaviourId(4)));
        assert!(a.validate().is_empty());
    }
}
