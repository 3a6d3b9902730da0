// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Integration tests for reach-geom broad-phase structures.

use proptest::prelude::*;
use reach_geom::{Aabb, AabbTree, BroadPhase, SpatialGrid, SpatialQuery, Vec3};

#[test]
fn broad_phase_pair_order_is_deterministic() {
    let mut bp = AabbTree::new();
    let a = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 0.0), Vec3::splat(1.0));
    let b = Aabb::from_center_half_extents(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(1.0));
    let c = Aabb::from_center_half_extents(Vec3::new(100.0, 0.0, 0.0), Vec3::splat(1.0));

    // Insert out of order to test determinism
    bp.upsert(2, c);
    bp.upsert(1, b);
    bp.upsert(0, a);
    assert_eq!(bp.pairs(), vec![(0, 1)]);

    let d = Aabb::from_center_half_extents(Vec3::new(0.5, 0.0, 0.0), Vec3::splat(1.0));
    bp.upsert(3, d);
    assert_eq!(bp.pairs(), vec![(0, 1), (0, 3), (1, 3)]);
}

#[test]
fn touching_faces_count_as_overlap() {
    let a = Aabb::new(Vec3::ZERO, Vec3::splat(1.0));
    let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
    assert!(a.overlaps(&b));
    let mut grid = SpatialGrid::new(0.25);
    grid.upsert(10, a);
    grid.upsert(11, b);
    assert_eq!(grid.pairs(), vec![(10, 11)]);
}

#[test]
fn sphere_query_is_exact_not_cell_granular() {
    let mut grid = SpatialGrid::new(1.0);
    // Same cell as the query centre, but outside the sphere.
    grid.upsert(1, Aabb::from_sphere(Vec3::new(0.9, 0.9, 0.9), 0.05));
    grid.upsert(2, Aabb::from_sphere(Vec3::new(0.2, 0.1, 0.1), 0.05));
    assert_eq!(grid.query_sphere(Vec3::new(0.1, 0.1, 0.1), 0.3), vec![2]);
}

fn arb_box() -> impl Strategy<Value = Aabb> {
    let coord = -20.0f32..20.0;
    let half = 0.01f32..3.0;
    (
        prop::array::uniform3(coord),
        prop::array::uniform3(half),
    )
        .prop_map(|(c, h)| Aabb::from_center_half_extents(Vec3::from(c), Vec3::from(h)))
}

proptest! {
    #[test]
    fn grid_matches_all_pairs_baseline(
        boxes in prop::collection::vec(arb_box(), 1..40),
        probe in prop::array::uniform3(-20.0f32..20.0),
        radius in 0.0f32..6.0,
        cell in 0.2f32..4.0,
    ) {
        let mut grid = SpatialGrid::new(cell);
        let mut baseline = AabbTree::new();
        for (i, bb) in boxes.iter().enumerate() {
            grid.upsert(i as u64, *bb);
            baseline.upsert(i as u64, *bb);
        }
        prop_assert_eq!(grid.pairs(), baseline.pairs());
        let center = Vec3::from(probe);
        prop_assert_eq!(
            grid.query_sphere(center, radius),
            baseline.query_sphere(center, radius)
        );
        // Removing every other proxy keeps both structures in agreement.
        for i in (0..boxes.len()).step_by(2) {
            prop_assert!(grid.remove(i as u64));
            baseline.remove(i as u64);
        }
        prop_assert_eq!(grid.pairs(), baseline.pairs());
    }
}
