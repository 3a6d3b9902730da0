// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

mod common;

use common::{ball_and_vr, BALL, BALL_RADIUS, DT};
use reach_core::{ControllerId, InteractionEvent, Vec3};
use reach_dry_tests::{FrameBuilder, Scene, SceneBuilder};

/// Four overlapping cubes along +x, with VR controller 1 in range of the
/// first only.
fn cube_chain(builder: SceneBuilder) -> Scene {
    builder
        .with_cube(0.0, 0.0, 0.0, 0.06)
        .with_cube(0.1, 0.0, 0.0, 0.06)
        .with_cube(0.2, 0.0, 0.0, 0.06)
        .with_cube(0.3, 0.0, 0.0, 0.06)
        .with_vr(1)
        .with_frame(FrameBuilder::vr(1).at(-0.25, 0.0, 0.0).build())
        .build()
        .unwrap()
}

fn depths(scene: &Scene) -> Vec<Option<u32>> {
    scene
        .objects
        .iter()
        .map(|id| scene.manager.activity().monitor(*id).map(|m| m.depth))
        .collect()
}

#[test]
fn activation_spreads_through_touching_objects() {
    let mut scene = cube_chain(SceneBuilder::new());
    scene.step(DT);
    assert_eq!(depths(&scene), vec![Some(1), Some(2), Some(3), None]);
    // in range for activity, out of range for hover
    assert!(scene.behaviour(0).unwrap().hovering_controllers().next().is_none());

    let activated: Vec<_> = scene
        .manager
        .events()
        .iter()
        .filter_map(|e| match e {
            InteractionEvent::Activated { behaviour, depth } => Some((*behaviour, *depth)),
            _ => None,
        })
        .collect();
    assert_eq!(
        activated,
        vec![
            (scene.objects[0], 1),
            (scene.objects[1], 2),
            (scene.objects[2], 3)
        ]
    );

    assert!(scene.manager.set_max_depth(4));
    scene.step(DT);
    assert_eq!(depths(&scene), vec![Some(1), Some(2), Some(3), Some(4)]);
    assert_eq!(scene.manager.settings().activity.max_depth, 4);
}

#[test]
fn invalid_activity_settings_are_rejected_at_runtime() {
    let mut scene = cube_chain(SceneBuilder::new().configure(|s| s.hover.hover_radius = 0.05));
    assert!(!scene.manager.set_max_depth(0));
    assert!(!scene.manager.set_overlap_radius(-1.0));
    assert!(!scene.manager.set_overlap_radius(f32::NAN));
    assert_eq!(scene.manager.settings().activity.max_depth, 3);

    assert!(scene.manager.set_overlap_radius(0.1));
    scene.step(DT);
    assert!(scene.manager.activity().active().is_empty());
}

#[test]
fn overlap_radius_cannot_shrink_below_the_hover_radius() {
    let at = (BALL.0 + BALL_RADIUS + 0.1, BALL.1, BALL.2);
    let mut scene = ball_and_vr(SceneBuilder::new(), at, 0.0);
    scene.step(DT);
    assert!(scene.behaviour(0).unwrap().is_hovered());

    assert!(!scene.manager.set_overlap_radius(0.05));
    assert!(scene.manager.settings().validate().is_ok());
    assert!((scene.manager.settings().activity.overlap_radius - 0.25).abs() < 1e-6);
    scene.step(DT);
    assert!(scene.manager.is_active(scene.objects[0]));
    assert!(scene.behaviour(0).unwrap().is_hovered());

    // equal to the hover radius is still consistent
    assert!(scene.manager.set_overlap_radius(0.15));
    assert!(scene.manager.settings().validate().is_ok());
}

#[test]
fn leaving_range_deactivates_the_chain() {
    let mut scene = cube_chain(SceneBuilder::new());
    scene.step(DT);
    assert_eq!(scene.manager.activity().active().len(), 3);

    scene.move_controller(1, Vec3::new(-3.0, 0.0, 0.0));
    scene.step(DT);
    assert!(scene.manager.activity().active().is_empty());
    let deactivated = scene
        .manager
        .events()
        .iter()
        .filter(|e| matches!(e, InteractionEvent::Deactivated { .. }))
        .count();
    assert_eq!(deactivated, 3);
}

#[test]
fn grace_ticks_delay_deactivation() {
    let mut scene =
        cube_chain(SceneBuilder::new().configure(|s| s.activity.deactivation_grace_ticks = 2));
    scene.step(DT);
    scene.move_controller(1, Vec3::new(-3.0, 0.0, 0.0));
    scene.run(2, DT);
    assert_eq!(scene.manager.activity().active().len(), 3);
    scene.step(DT);
    assert!(scene.manager.activity().active().is_empty());
}

#[test]
fn untracked_controllers_do_not_activate() {
    let mut scene = SceneBuilder::new()
        .with_sphere(0.0, 1.0, 0.0, 0.05)
        .with_vr(1)
        .with_frame(FrameBuilder::vr(1).at(0.0, 1.0, 0.0).untracked().build())
        .build()
        .unwrap();
    scene.run(2, DT);
    assert!(!scene.manager.is_active(scene.objects[0]));
    assert!(!scene.manager.controller(ControllerId(1)).unwrap().is_tracked());
}

#[test]
fn detached_objects_leave_the_broadphase() {
    let mut scene = SceneBuilder::new()
        .with_sphere(0.0, 1.0, 0.0, 0.05)
        .with_vr(1)
        .with_frame(FrameBuilder::vr(1).at(0.1, 1.0, 0.0).build())
        .build()
        .unwrap();
    let id = scene.objects[0];
    scene.step(DT);
    assert!(scene.manager.is_active(id));
    assert!(scene.behaviour(0).unwrap().is_hovered());

    scene.manager.try_detach(id).unwrap();
    scene.step(DT);
    assert!(!scene.manager.activity().is_registered(id));
    assert!(!scene.manager.is_active(id));
    assert!(!scene.behaviour(0).unwrap().is_hovered());
    assert!(scene.manager.validate().is_empty());
}
