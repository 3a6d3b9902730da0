// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use std::collections::{BTreeMap, BTreeSet};

use crate::broad::aabb_tree::BroadPhase;
use crate::math::Vec3;
use crate::types::aabb::Aabb;

/// Region queries over stored proxies.
///
/// Results are sorted ascending by id and exact: a proxy is returned iff its
/// AABB overlaps the region (inclusive on faces).
pub trait SpatialQuery {
    /// Stored bounds for `id`.
    fn bounds(&self, id: u64) -> Option<Aabb>;
    /// Ids whose bounds overlap `region`.
    fn query_aabb(&self, region: &Aabb) -> Vec<u64>;
    /// Ids whose bounds touch the sphere.
    fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<u64>;
}

/// Proxies spanning more cells than this along any axis skip the grid and are
/// tested on every query.
const MAX_CELLS_PER_AXIS: i64 = 16;

type CellKey = [i32; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    min: CellKey,
    max: CellKey,
}

#[derive(Debug, Clone)]
struct Entry {
    aabb: Aabb,
    cells: Option<CellRange>,
}

/// Hashed uniform grid over AABB proxies.
///
/// Each proxy is binned into every cell its AABB touches. Queries visit only
/// the cells touched by the query region, then filter candidates exactly.
/// Proxies that would span too many cells are kept in an oversized list that
/// every query scans.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    entries: BTreeMap<u64, Entry>,
    cells: BTreeMap<CellKey, BTreeSet<u64>>,
    oversized: BTreeSet<u64>,
}

impl SpatialGrid {
    /// Creates an empty grid. Non-positive or non-finite sizes fall back to 1 m.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            entries: BTreeMap::new(),
            cells: BTreeMap::new(),
            oversized: BTreeSet::new(),
        }
    }

    /// Edge length of one grid cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of stored proxies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no proxies are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` if `id` is stored.
    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Stored ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn cell_coord(&self, v: f32) -> i32 {
        let c = (v / self.cell_size).floor();
        c.clamp(i32::MIN as f32, i32::MAX as f32) as i32
    }

    fn range_for(&self, aabb: &Aabb) -> Option<CellRange> {
        let lo = aabb.min().to_array();
        let hi = aabb.max().to_array();
        let min = [
            self.cell_coord(lo[0]),
            self.cell_coord(lo[1]),
            self.cell_coord(lo[2]),
        ];
        let max = [
            self.cell_coord(hi[0]),
            self.cell_coord(hi[1]),
            self.cell_coord(hi[2]),
        ];
        let too_wide =
            (0..3).any(|i| i64::from(max[i]) - i64::from(min[i]) + 1 > MAX_CELLS_PER_AXIS);
        if too_wide {
            None
        } else {
            Some(CellRange { min, max })
        }
    }

    fn for_each_cell(range: CellRange, mut f: impl FnMut(CellKey)) {
        for x in range.min[0]..=range.max[0] {
            for y in range.min[1]..=range.max[1] {
                for z in range.min[2]..=range.max[2] {
                    f([x, y, z]);
                }
            }
        }
    }

    fn unbin(&mut self, id: u64, cells: Option<CellRange>) {
        match cells {
            Some(range) => {
                let grid = &mut self.cells;
                Self::for_each_cell(range, |key| {
                    if let Some(bucket) = grid.get_mut(&key) {
                        bucket.remove(&id);
                        if bucket.is_empty() {
                            grid.remove(&key);
                        }
                    }
                });
            }
            None => {
                self.oversized.remove(&id);
            }
        }
    }

    fn candidates(&self, region: &Aabb) -> BTreeSet<u64> {
        let mut out: BTreeSet<u64> = self.oversized.clone();
        match self.range_for(region) {
            Some(range) => Self::for_each_cell(range, |key| {
                if let Some(bucket) = self.cells.get(&key) {
                    out.extend(bucket.iter().copied());
                }
            }),
            // Region itself is huge: a linear scan is cheaper than walking cells.
            None => out.extend(self.entries.keys().copied()),
        }
        out
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl BroadPhase for SpatialGrid {
    fn upsert(&mut self, id: u64, aabb: Aabb) {
        let cells = self.range_for(&aabb);
        if let Some(prev) = self.entries.get(&id) {
            if prev.cells == cells && cells.is_some() {
                self.entries.insert(id, Entry { aabb, cells });
                return;
            }
            let prev_cells = prev.cells;
            self.unbin(id, prev_cells);
        }
        match cells {
            Some(range) => {
                let grid = &mut self.cells;
                Self::for_each_cell(range, |key| {
                    grid.entry(key).or_default().insert(id);
                });
            }
            None => {
                self.oversized.insert(id);
            }
        }
        self.entries.insert(id, Entry { aabb, cells });
    }

    fn remove(&mut self, id: u64) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                self.unbin(id, entry.cells);
                true
            }
            None => false,
        }
    }

    fn pairs(&self) -> Vec<(u64, u64)> {
        let mut out = BTreeSet::new();
        for (id, entry) in &self.entries {
            for other in self.query_aabb(&entry.aabb) {
                if other > *id {
                    out.insert((*id, other));
                }
            }
        }
        out.into_iter().collect()
    }
}

impl SpatialQuery for SpatialGrid {
    fn bounds(&self, id: u64) -> Option<Aabb> {
        self.entries.get(&id).map(|e| e.aabb)
    }

    fn query_aabb(&self, region: &Aabb) -> Vec<u64> {
        self.candidates(region)
            .into_iter()
            .filter(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|e| e.aabb.overlaps(region))
            })
            .collect()
    }

    fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<u64> {
        let region = Aabb::from_sphere(center, radius.max(0.0));
        self.candidates(&region)
            .into_iter()
            .filter(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|e| e.aabb.intersects_sphere(center, radius))
            })
            .collect()
    }
}
