// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![forbid(unsafe_code)]
#![doc = r"Geometry primitives for Reach.

This crate provides:
- Float32 math (`Vec3`, `Quat`) with deterministic rounding.
- Rigid poses (`Pose`) for tracked controllers, bones and objects.
- Axis-aligned bounding boxes (`Aabb`) and primitive colliders (`Collider`)
  with closest-point queries used for hover distances.
- Broad-phase structures: an all-pairs `AabbTree` baseline and a hashed
  `SpatialGrid` answering sphere/box queries for activation.

Design notes:
- Deterministic: no ambient RNG; query results are sorted by id.
- Float32 throughout; operations favor clarity and reproducibility.
- Public items are documented; rustdoc is part of the contract.
"]

/// Broad-phase indices and pairing structures.
pub mod broad;
/// Float32 vector and quaternion math.
pub mod math;
/// Foundational geometric types.
pub mod types;

pub use broad::aabb_tree::{AabbTree, BroadPhase};
pub use broad::grid::{SpatialGrid, SpatialQuery};
pub use math::{Quat, Vec3};
pub use types::aabb::Aabb;
pub use types::collider::Collider;
pub use types::pose::Pose;
