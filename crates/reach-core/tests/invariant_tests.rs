// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Randomised host input against the relation invariants.

mod common;

use common::DT;
use proptest::prelude::*;
use reach_core::{Chirality, Collider, GroupId, Vec3};
use reach_dry_tests::{FrameBuilder, Scene, SceneBuilder};

#[derive(Debug, Clone)]
enum Op {
    Move(u32, [f32; 3]),
    Grasp(u32, f32),
    Track(u32, bool),
    Release(usize),
    Wait,
}

fn arb_op() -> impl Strategy<Value = Op> {
    let controller = 1u32..=2;
    prop_oneof![
        4 => (controller.clone(), prop::array::uniform3(-0.2f32..0.2))
            .prop_map(|(c, p)| Op::Move(c, p)),
        3 => (controller.clone(), 0.0f32..1.0).prop_map(|(c, g)| Op::Grasp(c, g)),
        2 => (controller, any::<bool>()).prop_map(|(c, t)| Op::Track(c, t)),
        1 => (0usize..3).prop_map(Op::Release),
        1 => Just(Op::Wait),
    ]
}

fn scene() -> Scene {
    SceneBuilder::new()
        .configure(|s| {
            s.validation.enabled = true;
            s.suspension.max_suspension_time = 0.05;
        })
        .with_sphere(0.0, 1.0, 0.0, 0.05)
        .with_cube(0.08, 1.0, 0.0, 0.04)
        .with_object(
            Vec3::new(-0.08, 1.0, 0.0),
            Collider::Sphere { radius: 0.05 },
            Some(GroupId::DEFAULT),
            |d| d.multi_grasp(true),
        )
        .with_vr(1)
        .with_hand(2, Chirality::Left)
        .with_frame(FrameBuilder::vr(1).at(0.1, 1.0, 0.0).build())
        .with_frame(FrameBuilder::hand(2).at(-0.1, 1.0, 0.0).build())
        .build()
        .unwrap()
}

fn apply(scene: &mut Scene, op: &Op) {
    match op {
        Op::Move(c, [x, y, z]) => scene.move_controller(*c, Vec3::new(*x, 1.0 + *y, *z)),
        Op::Grasp(c, g) => scene.set_grasp(*c, *g),
        Op::Track(c, t) => scene.set_tracked(*c, *t),
        Op::Release(i) => {
            if let Some(id) = scene.object(*i) {
                scene.manager.release_object(id).unwrap();
            }
        }
        Op::Wait => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn relations_stay_consistent_under_random_input(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut scene = scene();
        for op in &ops {
            apply(&mut scene, op);
            let summary = scene.step(DT);
            let violations = scene.manager.validate();
            prop_assert!(violations.is_empty(), "{op:?}: {violations:?}");
            prop_assert_eq!(summary.misbehaving, 0);
        }
        scene.manager.shutdown();
        prop_assert_eq!(scene.manager.registry().behaviours().count(), 0);
    }
}
