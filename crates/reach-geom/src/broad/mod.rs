// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Broad-phase interfaces and implementations.
//!
//! Determinism contract (applies to every implementation here):
//! - Pair identity is canonicalized as `(min_id, max_id)`.
//! - Emitted pair lists and query results are sorted ascending by id.
//! - Overlap is inclusive on faces (touching AABBs overlap).
//!
//! `AabbTree` is the `O(n^2)` all-pairs baseline; `SpatialGrid` is the hashed
//! uniform grid used for activation queries. Both honour the same contract so
//! the baseline can cross-check the grid in tests.

#[doc = "Reference all-pairs broad-phase and the shared trait definitions."]
pub mod aabb_tree;
#[doc = "Hashed uniform grid answering sphere and box queries."]
pub mod grid;
