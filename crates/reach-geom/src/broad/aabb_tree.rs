// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use std::collections::BTreeMap;

use crate::broad::grid::SpatialQuery;
use crate::math::Vec3;
use crate::types::aabb::Aabb;

/// Broad-phase interface for inserting proxies and querying overlapping pairs.
///
/// Implementations must return pairs deterministically: the pair `(a, b)` is
/// canonicalized such that `a < b`, and the full list is sorted ascending by
/// `(a, b)`.
pub trait BroadPhase {
    /// Inserts or updates the proxy with the given `id` and `aabb`.
    fn upsert(&mut self, id: u64, aabb: Aabb);
    /// Removes a proxy if present; returns whether it existed.
    fn remove(&mut self, id: u64) -> bool;
    /// Returns a canonical, deterministically-ordered list of overlapping pairs.
    fn pairs(&self) -> Vec<(u64, u64)>;
}

/// A minimal AABB broad-phase using an `O(n^2)` all-pairs sweep.
///
/// Serves as the correctness baseline for [`crate::SpatialGrid`] and as the
/// pair generator of the headless physics adapter, where body counts are small.
#[derive(Debug, Default, Clone)]
pub struct AabbTree {
    items: BTreeMap<u64, Aabb>,
}

impl AabbTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of proxies.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when no proxies are stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl BroadPhase for AabbTree {
    fn upsert(&mut self, id: u64, aabb: Aabb) {
        self.items.insert(id, aabb);
    }

    fn remove(&mut self, id: u64) -> bool {
        self.items.remove(&id).is_some()
    }

    fn pairs(&self) -> Vec<(u64, u64)> {
        // BTreeMap iteration is sorted by key, so (a, b) comes out canonical
        // and already in lexicographic order.
        let items: Vec<(u64, Aabb)> = self.items.iter().map(|(id, bb)| (*id, *bb)).collect();
        let mut out = Vec::new();
        for (i, (a_id, a_bb)) in items.iter().enumerate() {
            for (b_id, b_bb) in items.iter().skip(i + 1) {
                if a_bb.overlaps(b_bb) {
                    out.push((*a_id, *b_id));
                }
            }
        }
        out
    }
}

impl SpatialQuery for AabbTree {
    fn bounds(&self, id: u64) -> Option<Aabb> {
        self.items.get(&id).copied()
    }

    fn query_aabb(&self, region: &Aabb) -> Vec<u64> {
        self.items
            .iter()
            .filter(|(_, bb)| bb.overlaps(region))
            .map(|(id, _)| *id)
            .collect()
    }

    fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<u64> {
        self.items
            .iter()
            .filter(|(_, bb)| bb.intersects_sphere(center, radius))
            .map(|(id, _)| *id)
            .collect()
    }
}
